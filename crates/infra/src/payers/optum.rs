//! Optum enhanced-eligibility gateway
//!
//! JSON transport against the Optum API gateway: eligibility checks,
//! asynchronous coverage discovery, and the health probe. Every call
//! carries a bearer token from the credential manager plus the
//! `x-optum-correlation-id` tracking header (and tenant header when
//! configured). Transport only; payload semantics live in core.

use std::sync::Arc;

use async_trait::async_trait;
use meridian_core::{AccessTokenProvider, PayerGateway};
use meridian_domain::constants::DEFAULT_HEALTH_TIMEOUT_SECS;
use meridian_domain::{EngineError, PayerProfile, Result, WirePayload};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::OptumConfig;
use crate::http::HttpClient;
use crate::payers::profiles::optum_profile;

/// Transport client for the Optum eligibility APIs
pub struct OptumGateway {
    profile: PayerProfile,
    http: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
    correlation_prefix: String,
    tenant_id: Option<String>,
}

impl OptumGateway {
    pub fn new(config: &OptumConfig, tokens: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        Ok(Self {
            profile: optum_profile(config),
            http: HttpClient::new()?,
            tokens,
            correlation_prefix: config.correlation_prefix.clone(),
            tenant_id: config.tenant_id.clone(),
        })
    }

    fn correlation_id(&self) -> String {
        format!("{}-{}", self.correlation_prefix, Uuid::new_v4().simple())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.profile.endpoints.base_url, path)
    }

    async fn authed_request(
        &self,
        method: Method,
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<reqwest::RequestBuilder> {
        let token = self.tokens.access_token(&self.profile.payer_id).await?;
        let mut builder = self
            .http
            .request(method, url)
            .timeout(timeout)
            .header("Authorization", format!("Bearer {}", token.secret()))
            .header("x-optum-correlation-id", self.correlation_id());
        if let Some(tenant_id) = &self.tenant_id {
            builder = builder.header("x-optum-tenant-id", tenant_id);
        }
        Ok(builder)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: std::time::Duration,
    ) -> Result<Value> {
        let builder = self.authed_request(Method::POST, url, timeout).await?.json(body);
        let response = self.http.send(builder).await?;
        HttpClient::expect_json(response).await
    }
}

#[async_trait]
impl PayerGateway for OptumGateway {
    fn profile(&self) -> &PayerProfile {
        &self.profile
    }

    async fn check_eligibility(&self, payload: &WirePayload) -> Result<Value> {
        let WirePayload::Json(body) = payload else {
            return Err(EngineError::Internal(
                "the Optum gateway only transmits JSON payloads".into(),
            ));
        };

        let url = self.url(&self.profile.endpoints.eligibility_path);
        debug!(url = %url, "submitting Optum eligibility check");
        self.post_json(&url, body, self.profile.check_timeout).await
    }

    async fn start_coverage_discovery(&self, payload: &Value) -> Result<Value> {
        let Some(path) = self.profile.endpoints.coverage_discovery_path.clone() else {
            return Err(EngineError::Config(
                "Optum coverage-discovery endpoint is not configured".into(),
            ));
        };

        let url = self.url(&path);
        debug!(url = %url, "starting Optum coverage discovery");
        self.post_json(&url, payload, self.profile.submit_timeout).await
    }

    async fn check_health(&self) -> Result<bool> {
        let Some(path) = self.profile.endpoints.health_path.clone() else {
            return Ok(false);
        };

        let url = self.url(&path);
        let builder = self
            .authed_request(
                Method::GET,
                &url,
                std::time::Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
            )
            .await?;

        match self.http.send(builder).await {
            Ok(response) => Ok(response.status().is_success()),
            Err(EngineError::Upstream { status: None, .. }) => {
                warn!("Optum health check failed: network error");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

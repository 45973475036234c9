//! Availity gateway
//!
//! Transport for the Availity coverages and service-reviews APIs. The
//! coverages call is form-encoded (the payer rejects empty strings for
//! optional fields, which the wire renderer already dropped); service
//! reviews are JSON against the v2 base URL. The supported-payer list is
//! fetched from the payers endpoint and cached for an hour, falling back to
//! a static list when the endpoint is unavailable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meridian_core::{AccessTokenProvider, PayerGateway};
use meridian_domain::{EngineError, PayerProfile, Result, WirePayload};
use moka::sync::Cache;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AvailityConfig;
use crate::http::HttpClient;
use crate::payers::profiles::availity_profile;

/// Supported-payer list cache TTL (1 hour)
const PAYER_LIST_TTL_SECS: u64 = 3600;
const PAYER_LIST_CACHE_KEY: &str = "payers";

/// Payers served when the payers endpoint cannot be reached
const FALLBACK_PAYERS: &[&str] = &["aetna", "anthem", "cigna", "humana", "unitedhealthcare"];

/// Transport client for the Availity APIs
pub struct AvailityGateway {
    profile: PayerProfile,
    service_reviews_base_url: String,
    http: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
    payer_list: Cache<&'static str, Arc<Vec<String>>>,
}

impl AvailityGateway {
    pub fn new(config: &AvailityConfig, tokens: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        Ok(Self {
            profile: availity_profile(config),
            service_reviews_base_url: config.service_reviews_base_url.clone(),
            http: HttpClient::new()?,
            tokens,
            payer_list: Cache::builder()
                .time_to_live(Duration::from_secs(PAYER_LIST_TTL_SECS))
                .max_capacity(1)
                .build(),
        })
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.tokens.access_token(&self.profile.payer_id).await?;
        Ok(format!("Bearer {}", token.secret()))
    }

    fn coverages_url(&self, suffix: &str) -> String {
        format!(
            "{}{}{}",
            self.profile.endpoints.base_url, self.profile.endpoints.eligibility_path, suffix
        )
    }

    fn service_reviews_url(&self, suffix: &str) -> String {
        format!("{}/service-reviews{suffix}", self.service_reviews_base_url)
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value> {
        let builder = self
            .http
            .request(Method::GET, url)
            .timeout(timeout)
            .header("Authorization", self.bearer().await?);
        let response = self.http.send(builder).await?;
        HttpClient::expect_json(response).await
    }

    /// Payer organizations this gateway can serve, cached for an hour.
    ///
    /// Falls back to the static list when the payers endpoint errors; the
    /// fallback is not cached so a recovered endpoint is picked up on the
    /// next call.
    pub async fn supported_payers(&self) -> Vec<String> {
        if let Some(cached) = self.payer_list.get(PAYER_LIST_CACHE_KEY) {
            return cached.as_ref().clone();
        }

        let url = format!("{}/payers", self.profile.endpoints.base_url);
        match self.fetch_payers(&url).await {
            Ok(payers) => {
                self.payer_list.insert(PAYER_LIST_CACHE_KEY, Arc::new(payers.clone()));
                payers
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch Availity payer list, using fallback");
                FALLBACK_PAYERS.iter().map(|p| (*p).to_string()).collect()
            }
        }
    }

    async fn fetch_payers(&self, url: &str) -> Result<Vec<String>> {
        let raw = self.get_json(url, self.profile.check_timeout).await?;
        let payers = raw
            .get("payers")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match entry {
                        Value::String(id) => Some(id.to_lowercase()),
                        Value::Object(map) => {
                            map.get("id").and_then(Value::as_str).map(str::to_lowercase)
                        }
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(payers)
    }
}

#[async_trait]
impl PayerGateway for AvailityGateway {
    fn profile(&self) -> &PayerProfile {
        &self.profile
    }

    async fn check_eligibility(&self, payload: &WirePayload) -> Result<Value> {
        let WirePayload::Form(pairs) = payload else {
            return Err(EngineError::Internal(
                "the Availity coverages API only accepts form-encoded payloads".into(),
            ));
        };

        let url = self.coverages_url("");
        debug!(url = %url, "submitting Availity coverage request");
        let builder = self
            .http
            .request(Method::POST, &url)
            .timeout(self.profile.check_timeout)
            .header("Authorization", self.bearer().await?)
            .form(pairs);
        let response = self.http.send(builder).await?;
        HttpClient::expect_json(response).await
    }

    async fn submit_service_review(&self, payload: &Value) -> Result<Value> {
        let url = self.service_reviews_url("");
        debug!(url = %url, "submitting Availity service review");
        let builder = self
            .http
            .request(Method::POST, &url)
            .timeout(self.profile.submit_timeout)
            .header("Authorization", self.bearer().await?)
            .header("Content-Type", "application/json")
            .json(payload);
        let response = self.http.send(builder).await?;
        HttpClient::expect_json(response).await
    }

    async fn poll_service_review(&self, reference_id: &str) -> Result<Value> {
        let url = self.service_reviews_url(&format!("/{reference_id}"));
        self.get_json(&url, self.profile.check_timeout).await
    }

    async fn void_service_review(&self, reference_id: &str) -> Result<bool> {
        let url = self.service_reviews_url(&format!("/{reference_id}"));
        let builder = self
            .http
            .request(Method::DELETE, &url)
            .timeout(self.profile.check_timeout)
            .header("Authorization", self.bearer().await?);

        match self.http.send(builder).await {
            Ok(response) => Ok(response.status().is_success()),
            Err(EngineError::Upstream { status: None, .. }) => {
                warn!(reference_id, "service review void failed: network error");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn get_coverage(&self, coverage_id: &str) -> Result<Value> {
        let url = self.coverages_url(&format!("/{coverage_id}"));
        self.get_json(&url, self.profile.check_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use meridian_domain::AccessToken;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct StaticTokens;

    #[async_trait]
    impl AccessTokenProvider for StaticTokens {
        async fn access_token(&self, _payer_id: &str) -> Result<AccessToken> {
            Ok(AccessToken::new("test-token", Utc::now() + chrono::Duration::hours(1)))
        }
    }

    fn gateway(server: &MockServer) -> AvailityGateway {
        let config = AvailityConfig {
            base_url: server.uri(),
            service_reviews_base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            client_id: "cid".into(),
            client_secret: "secret".into(),
        };
        AvailityGateway::new(&config, Arc::new(StaticTokens)).unwrap()
    }

    #[tokio::test]
    async fn coverage_request_is_form_encoded_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/coverages"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("providerNpi=1999999984"))
            .and(body_string_contains("memberId=MBR12345"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "Active" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let payload = WirePayload::Form(vec![
            ("providerNpi".into(), "1999999984".into()),
            ("memberId".into(), "MBR12345".into()),
        ]);
        let raw = gateway(&server).check_eligibility(&payload).await.unwrap();
        assert_eq!(raw["status"], "Active");
    }

    #[tokio::test]
    async fn json_payload_is_rejected_before_transmission() {
        let server = MockServer::start().await;
        let payload = WirePayload::Json(json!({}));
        let err = gateway(&server).check_eligibility(&payload).await.unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[tokio::test]
    async fn service_review_lifecycle_submit_poll_void() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/service-reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "SR-5", "status": "submitted"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/service-reviews/SR-5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "SR-5", "status": "approved"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/service-reviews/SR-5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let submitted =
            gateway.submit_service_review(&json!({ "requestTypeCode": "AR" })).await.unwrap();
        assert_eq!(submitted["id"], "SR-5");

        let polled = gateway.poll_service_review("SR-5").await.unwrap();
        assert_eq!(polled["status"], "approved");

        assert!(gateway.void_service_review("SR-5").await.unwrap());
    }

    #[tokio::test]
    async fn coverage_detail_fetch_hits_the_coverage_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coverages/cov-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cov-9", "status": "Active"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let raw = gateway(&server).get_coverage("cov-9").await.unwrap();
        assert_eq!(raw["id"], "cov-9");
    }

    #[tokio::test]
    async fn payer_list_is_cached_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payers": [ { "id": "AETNA" }, { "id": "HUMANA" } ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let first = gateway.supported_payers().await;
        let second = gateway.supported_payers().await;
        assert_eq!(first, vec!["aetna".to_string(), "humana".to_string()]);
        assert_eq!(first, second);
        // wiremock asserts the endpoint was hit exactly once
    }

    #[tokio::test]
    async fn payer_list_falls_back_when_endpoint_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payers"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let payers = gateway(&server).supported_payers().await;
        assert!(payers.contains(&"aetna".to_string()));
        assert!(payers.contains(&"unitedhealthcare".to_string()));
    }
}

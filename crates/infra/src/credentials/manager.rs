//! OAuth2 credential manager
//!
//! One cached bearer token per payer, refreshed via the client-credentials
//! grant when the cached token comes within the safety margin of its
//! upstream expiry. Concurrent callers for the same payer coalesce into a
//! single grant request; a failed grant is surfaced as an auth error and is
//! never cached.
//!
//! There is no refresh-token flow: the payer token endpoints only support
//! client credentials, so expiry means re-authenticating from scratch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meridian_common::{Clock, KeyedMutex, SystemClock};
use meridian_core::AccessTokenProvider;
use meridian_domain::constants::{DEFAULT_TOKEN_LIFETIME_SECS, TOKEN_EXPIRY_SAFETY_MARGIN_SECS};
use meridian_domain::{AccessToken, EngineError, Result};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

/// Token endpoint registration for one payer
#[derive(Clone)]
pub struct TokenEndpoint {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEndpoint")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Acquires and caches OAuth2 tokens per payer
pub struct CredentialManager<C: Clock = SystemClock> {
    http: HttpClient,
    endpoints: HashMap<String, TokenEndpoint>,
    cache: RwLock<HashMap<String, AccessToken>>,
    flights: KeyedMutex<String>,
    clock: Arc<C>,
    safety_margin: Duration,
}

impl CredentialManager<SystemClock> {
    pub fn new(http: HttpClient) -> Self {
        Self::with_clock(http, Arc::new(SystemClock))
    }
}

impl<C: Clock> CredentialManager<C> {
    /// Create a manager with an injected clock (deterministic TTL tests).
    pub fn with_clock(http: HttpClient, clock: Arc<C>) -> Self {
        Self {
            http,
            endpoints: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
            flights: KeyedMutex::new(),
            clock,
            safety_margin: Duration::from_secs(TOKEN_EXPIRY_SAFETY_MARGIN_SECS),
        }
    }

    /// Override the staleness safety margin (defaults to 60 s).
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Register a payer's token endpoint.
    pub fn register(mut self, payer_id: impl Into<String>, endpoint: TokenEndpoint) -> Self {
        self.endpoints.insert(payer_id.into(), endpoint);
        self
    }

    /// A valid token for the payer, from cache or a fresh grant.
    pub async fn token(&self, payer_id: &str) -> Result<AccessToken> {
        let now = self.clock.utc_now();

        if let Some(token) = self.cache.read().await.get(payer_id) {
            if !token.is_stale(now, self.safety_margin) {
                return Ok(token.clone());
            }
        }

        // single flight per payer: first caller grants, the rest re-read
        let flight = self.flights.lock_for(&payer_id.to_string());
        let _guard = flight.lock().await;

        let now = self.clock.utc_now();
        if let Some(token) = self.cache.read().await.get(payer_id) {
            if !token.is_stale(now, self.safety_margin) {
                debug!(payer_id, "token refreshed by a concurrent caller");
                return Ok(token.clone());
            }
        }

        let token = self.grant(payer_id).await?;
        self.cache.write().await.insert(payer_id.to_string(), token.clone());
        info!(payer_id, expires_at = %token.expires_at(), "payer token acquired");
        Ok(token)
    }

    /// Drop the cached token for a payer (e.g. after a 401 from the API).
    pub async fn invalidate(&self, payer_id: &str) {
        self.cache.write().await.remove(payer_id);
        debug!(payer_id, "cached token invalidated");
    }

    async fn grant(&self, payer_id: &str) -> Result<AccessToken> {
        let endpoint = self.endpoints.get(payer_id).ok_or_else(|| {
            EngineError::Config(format!("no token endpoint registered for payer {payer_id}"))
        })?;

        if endpoint.client_id.is_empty() || endpoint.client_secret.is_empty() {
            return Err(EngineError::Auth(format!(
                "credentials for payer {payer_id} are not configured"
            )));
        }

        let form = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", endpoint.client_id.clone()),
            ("client_secret", endpoint.client_secret.clone()),
            ("scope", endpoint.scopes.join(" ")),
        ];

        let builder = self.http.request(Method::POST, &endpoint.url).form(&form);
        let response = self.http.send(builder).await.map_err(|err| {
            warn!(payer_id, error = %err, "token grant transport failure");
            EngineError::Auth(format!("token grant failed for payer {payer_id}: {err}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(payer_id, status = status.as_u16(), "token grant rejected");
            return Err(EngineError::Auth(format!(
                "token grant for payer {payer_id} rejected with HTTP {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(|err| {
            EngineError::Auth(format!("malformed token response for payer {payer_id}: {err}"))
        })?;

        let lifetime = token_response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = self.clock.utc_now()
            + chrono::Duration::from_std(Duration::from_secs(lifetime))
                .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS as i64));

        Ok(AccessToken::new(token_response.access_token, expires_at))
    }
}

#[async_trait]
impl<C: Clock> AccessTokenProvider for CredentialManager<C> {
    async fn access_token(&self, payer_id: &str) -> Result<AccessToken> {
        self.token(payer_id).await
    }
}

#[cfg(test)]
mod tests {
    use meridian_common::MockClock;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn endpoint(server: &MockServer) -> TokenEndpoint {
        TokenEndpoint {
            url: format!("{}/oauth2/token", server.uri()),
            client_id: "cid".into(),
            client_secret: "secret".into(),
            scopes: vec!["hipaa".into()],
        }
    }

    fn token_body() -> serde_json::Value {
        json!({ "access_token": "tok-1", "token_type": "bearer", "expires_in": 300 })
    }

    #[tokio::test]
    async fn grant_sends_client_credentials_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=hipaa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let manager = CredentialManager::new(HttpClient::new().unwrap())
            .register("availity", endpoint(&server));

        let token = manager.token("availity").await.unwrap();
        assert_eq!(token.secret(), "tok-1");
    }

    #[tokio::test]
    async fn cached_token_is_reused_within_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let manager = CredentialManager::new(HttpClient::new().unwrap())
            .register("availity", endpoint(&server));

        manager.token("availity").await.unwrap();
        manager.token("availity").await.unwrap();
        // wiremock asserts a single upstream grant on drop
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body())
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let manager = Arc::new(
            CredentialManager::new(HttpClient::new().unwrap())
                .register("availity", endpoint(&server)),
        );

        let a = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.token("availity").await })
        };
        let b = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.token("availity").await })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a.secret(), "tok-1");
        assert_eq!(b.secret(), "tok-1");
        // wiremock asserts exactly one upstream grant happened
    }

    #[tokio::test]
    async fn stale_token_triggers_a_new_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(MockClock::new());
        let manager = CredentialManager::with_clock(HttpClient::new().unwrap(), clock.clone())
            .register("availity", endpoint(&server));

        manager.token("availity").await.unwrap();
        // token lives 300 s with a 60 s margin: crossing 240 s makes it stale
        clock.advance(Duration::from_secs(250));
        manager.token("availity").await.unwrap();
    }

    #[tokio::test]
    async fn failed_grant_is_auth_error_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad client"))
            .expect(2)
            .mount(&server)
            .await;

        let manager = CredentialManager::new(HttpClient::new().unwrap())
            .register("availity", endpoint(&server));

        let first = manager.token("availity").await.unwrap_err();
        assert!(matches!(first, EngineError::Auth(_)));

        // a second call hits the endpoint again: no negative caching
        let second = manager.token("availity").await.unwrap_err();
        assert!(matches!(second, EngineError::Auth(_)));
    }

    #[tokio::test]
    async fn unregistered_payer_is_a_config_error() {
        let manager = CredentialManager::new(HttpClient::new().unwrap());
        let err = manager.token("ghost").await.unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(2)
            .mount(&server)
            .await;

        let manager = CredentialManager::new(HttpClient::new().unwrap())
            .register("availity", endpoint(&server));

        manager.token("availity").await.unwrap();
        manager.invalidate("availity").await;
        manager.token("availity").await.unwrap();
    }
}

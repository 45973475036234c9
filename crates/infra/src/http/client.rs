//! Thin HTTP client for payer gateway calls
//!
//! Transport concerns only: a bounded default timeout, transport-error
//! classification, and a success-check helper that turns any non-2xx
//! response into [`EngineError::Upstream`] carrying status and body.
//!
//! Deliberately no internal retries: whether an upstream failure is retried
//! (and with what payload identity) is caller policy, decided in the
//! workflow layer where the control number is stable.

use std::time::Duration;

use meridian_domain::{EngineError, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

/// HTTP client wrapper used by every payer gateway
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    ///
    /// Per-call timeouts (30 s checks, 60 s submissions) are set by the
    /// caller via `RequestBuilder::timeout`.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request, classifying transport failures.
    ///
    /// Timeouts and connection failures surface as `Upstream` with no status
    /// code; the response itself is returned regardless of its status so the
    /// caller decides how to treat non-2xx.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder
            .build()
            .map_err(|err| EngineError::Internal(format!("failed to build request: {err}")))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = response.status().as_u16(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(EngineError::Upstream { status: None, body: err.to_string() })
            }
        }
    }

    /// Require a 2xx response and parse its JSON body.
    ///
    /// Non-2xx becomes `Upstream` carrying the status code and raw body for
    /// audit; an unparsable success body is an internal error.
    pub async fn expect_json(response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EngineError::Upstream { status: Some(status.as_u16()), body });
        }

        response
            .json()
            .await
            .map_err(|err| EngineError::Internal(format!("failed to parse response body: {err}")))
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None }
    }
}

impl HttpClientBuilder {
    /// Default timeout applied when a request carries no per-call override.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| EngineError::Internal(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn returns_response_for_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = HttpClient::expect_json(response).await.unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn non_2xx_is_classified_with_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(422).set_body_string("subscriber not found"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();
        let err = HttpClient::expect_json(response).await.unwrap_err();

        match err {
            EngineError::Upstream { status, body } => {
                assert_eq!(status, Some(422));
                assert!(body.contains("subscriber not found"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_upstream_without_status() {
        // bind and immediately drop a listener so the port refuses connections
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new().unwrap();
        let err = client
            .send(client.request(Method::GET, format!("http://{addr}")))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Upstream { status: None, .. }));
    }

    #[tokio::test]
    async fn per_request_timeout_overrides_the_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let builder = client
            .request(Method::GET, server.uri())
            .timeout(std::time::Duration::from_millis(20));
        let err = client.send(builder).await.unwrap_err();

        assert!(matches!(err, EngineError::Upstream { status: None, .. }));
    }
}

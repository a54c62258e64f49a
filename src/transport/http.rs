use crate::config::ClientConfig;
use crate::Result;
use reqwest::{Proxy, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest response-body excerpt kept in a gated failure.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Request executor: one authenticated GET or POST per call, no retries.
///
/// Every response passes through [`HttpTransport::gate`]; callers only ever
/// see a 2xx response or a [`TransportError`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let api_key = config.validate()?.to_string();

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(config.pool_idle_timeout_secs)));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                crate::Error::configuration(format!("Invalid proxy URL {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            // Correlation id; the service may ignore it.
            .header("x-request-id", uuid::Uuid::new_v4().to_string())
    }

    /// Serialize `body` as JSON and POST it to `path`.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.url(path);
        debug!(method = "POST", %url, "sending request");
        let req = self.authorized(self.client.post(&url)).json(body);
        let response = req
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        Self::gate(response).await
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.url(path);
        debug!(method = "GET", %url, "sending request");
        let req = self.authorized(self.client.get(&url));
        let response = req
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        Self::gate(response).await
    }

    /// The only place where non-2xx responses become errors.
    async fn gate(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "request succeeded");
            return Ok(response);
        }

        let url = response.url().to_string();
        // Body is diagnostic only; an unreadable body still yields the status.
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("HTTP error")
                .to_string()
        } else {
            truncate(body.trim(), MAX_ERROR_BODY_CHARS)
        };
        warn!(status = status.as_u16(), %url, %message, "request rejected");
        Err(crate::Error::Transport(TransportError::Status {
            status: status.as_u16(),
            message,
        }))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            TransportError::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ClientConfig {
        ClientConfig {
            api_key: Some("test-key".into()),
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn url_joins_with_single_slash() {
        let t = HttpTransport::new(&config("https://api.example.com/")).unwrap();
        assert_eq!(t.url("/speech"), "https://api.example.com/speech");
        assert_eq!(t.url("stream"), "https://api.example.com/stream");
    }

    #[test]
    fn new_requires_api_key() {
        let cfg = ClientConfig::default();
        assert!(HttpTransport::new(&cfg).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[tokio::test]
    async fn gate_converts_non_success_to_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/synthesisTasks/abc")
            .with_status(404)
            .with_body("{\"message\":\"not found\"}")
            .create_async()
            .await;

        let t = HttpTransport::new(&config(&server.url())).unwrap();
        let err = t.get("/synthesisTasks/abc").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn every_request_carries_auth_and_content_type() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/speech")
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_header("x-request-id", mockito::Matcher::Any)
            .match_body(mockito::Matcher::Json(serde_json::json!({"Text": "hi"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let t = HttpTransport::new(&config(&server.url())).unwrap();
        let resp = t
            .post("/speech", &serde_json::json!({"Text": "hi"}))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        m.assert_async().await;
    }
}

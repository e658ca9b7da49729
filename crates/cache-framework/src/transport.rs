//! # Transport
//!
//! The network boundary of the cache. The loader issues `GET`s for resource
//! retrieval and the mutation layer issues `POST`s and `DELETE`s with JSON
//! bodies, all through the [`Transport`] trait, so tests can swap in
//! [`MockTransport`](crate::mock::MockTransport).
//!
//! [`HttpTransport`] is the production implementation on top of `reqwest`.

use crate::error::CacheError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Reports this failure as a [`CacheError::Fetch`] for `endpoint`.
    pub fn into_cache_error(self, endpoint: &str) -> CacheError {
        let message = match self.status {
            Some(status) => format!("{} (HTTP {status})", self.message),
            None => self.message,
        };
        CacheError::Fetch {
            endpoint: endpoint.to_string(),
            message,
        }
    }
}

/// Request/response boundary used by the loader and the mutation layer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Retrieves a structured response from `target`.
    async fn get(&self, target: &str) -> Result<Value, TransportError>;

    /// Submits `body` to `target` and returns the (possibly non-JSON) response.
    async fn post(&self, target: &str, body: Value) -> Result<Value, TransportError>;

    /// Asks `target` to remove something described by `body`.
    async fn delete(&self, target: &str, body: Value) -> Result<Value, TransportError>;
}

/// `reqwest`-backed transport joining request targets to a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cache-framework/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::new(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a request target (`/path`) to the base URL.
    pub fn url_for(&self, target: &str) -> String {
        format!("{}/{}", self.base_url, target.trim_start_matches('/'))
    }

    async fn read(target: &str, response: Response) -> Result<Value, TransportError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::with_status(status.as_u16(), e.to_string()))?;
        if !status.is_success() {
            let message = server_message(&text).unwrap_or_else(|| format!("server answered {status}"));
            warn!(endpoint = target, status = status.as_u16(), %message, "Request rejected");
            return Err(TransportError::with_status(status.as_u16(), message));
        }
        Ok(parse_body(&text))
    }
}

/// Extracts the `message` field of an error body, if it has one.
fn server_message(text: &str) -> Option<String> {
    serde_json::from_str::<Value>(text)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// JSON when possible, the raw text (e.g. `ok`) otherwise.
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.trim().to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, target: &str) -> Result<Value, TransportError> {
        let url = self.url_for(target);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let body = Self::read(target, response).await?;
        if let Value::String(text) = &body {
            return Err(TransportError::new(format!("expected JSON, got `{text}`")));
        }
        Ok(body)
    }

    async fn post(&self, target: &str, body: Value) -> Result<Value, TransportError> {
        let url = self.url_for(target);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        Self::read(target, response).await
    }

    async fn delete(&self, target: &str, body: Value) -> Result<Value, TransportError> {
        let url = self.url_for(target);
        debug!(%url, "DELETE");
        let response = self
            .client
            .delete(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        Self::read(target, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:5000");
        assert_eq!(
            transport.url_for("/get_statistics/id/Acme"),
            "http://localhost:5000/get_statistics/id/Acme"
        );
        assert_eq!(
            transport.url_for("info_about_businesses"),
            "http://localhost:5000/info_about_businesses"
        );
    }

    #[test]
    fn test_body_parsing() {
        assert_eq!(parse_body("ok"), json!("ok"));
        assert_eq!(parse_body("done\n"), json!("done"));
        assert_eq!(parse_body(r#"[{"name":"Acme"}]"#), json!([{ "name": "Acme" }]));
    }

    #[test]
    fn test_status_is_kept_in_fetch_error() {
        assert_eq!(
            TransportError::with_status(404, "not found").into_cache_error("/get_orders/Acme"),
            CacheError::Fetch {
                endpoint: "/get_orders/Acme".into(),
                message: "not found (HTTP 404)".into(),
            }
        );
        assert_eq!(
            TransportError::new("timed out").into_cache_error("/x"),
            CacheError::Fetch {
                endpoint: "/x".into(),
                message: "timed out".into(),
            }
        );
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(
            server_message(r#"{"message":"Provided key already exists in database"}"#).as_deref(),
            Some("Provided key already exists in database")
        );
        assert_eq!(server_message("<html>oops</html>"), None);
        assert_eq!(server_message(r#"{"detail":"x"}"#), None);
    }
}

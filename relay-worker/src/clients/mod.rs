//! HTTP clients for the remote systems the relay talks to.
//!
//! All clients share one `reqwest::Client` (connection pool) and apply their
//! own per-request timeout, the same way the simulator fetches pixels.

pub mod backend;
pub mod hubspot;
pub mod sandbox;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

pub use backend::BackendClient;
pub use hubspot::HubSpotClient;
pub use sandbox::SandboxClient;

/// Default per-request timeout for remote calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} não configurado")]
    NotConfigured(&'static str),

    #[error("URL inválida: {0}")]
    InvalidUrl(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("Request failed with status code {status}")]
    Status { status: u16, body: Value },

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// What a failed dispatch outcome reports: the remote body when there
    /// is one, otherwise the error message.
    pub fn failure_payload(&self) -> Value {
        match self {
            ClientError::Status { body, .. } if !body.is_null() => body.clone(),
            other => Value::String(other.to_string()),
        }
    }

    /// HTTP status returned by the remote, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_connect() {
            ClientError::Connect(e.to_string())
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Request(e.to_string())
        }
    }
}

/// Build the shared HTTP client.
pub fn build_http_client() -> Result<Client, ClientError> {
    Client::builder()
        .user_agent(concat!("hubrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ClientError::from)
}

/// Parse a configured base URL.
pub(crate) fn parse_base(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to `base` (each segment is percent-encoded).
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Split a `/a/b` style endpoint into segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Send a request and decode the JSON body.
///
/// Non-2xx responses become `ClientError::Status` carrying the remote body
/// (JSON when it parses, text otherwise). An empty 2xx body decodes to null.
pub(crate) async fn execute(service: &'static str, request: RequestBuilder) -> Result<Value, ClientError> {
    let response = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!(service = service, error = %e, "remote_request_failed");
            return Err(e.into());
        }
    };

    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    debug!(
        service = service,
        url = %url,
        status_code = status.as_u16(),
        body_length = text.len(),
        "remote_response_received"
    );

    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => json,
            Err(_) => Value::String(text),
        }
    };

    if status.is_success() {
        Ok(body)
    } else {
        error!(
            service = service,
            url = %url,
            status_code = status.as_u16(),
            "remote_error_status"
        );
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = parse_base("https://backend.example.com/api").unwrap();
        let url = endpoint(&base, &["contacts"]).unwrap();
        assert_eq!(url.as_str(), "https://backend.example.com/api/contacts");
    }

    #[test]
    fn test_endpoint_trailing_slash_base() {
        let base = parse_base("https://backend.example.com/api/").unwrap();
        let url = endpoint(&base, &["products"]).unwrap();
        assert_eq!(url.as_str(), "https://backend.example.com/api/products");
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let base = parse_base("https://api.hubapi.com").unwrap();
        let url = endpoint(&base, &["crm", "v3", "objects", "contacts", "1/../2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.hubapi.com/crm/v3/objects/contacts/1%2F..%2F2"
        );
    }

    #[test]
    fn test_parse_base_rejects_garbage() {
        assert!(matches!(parse_base("not a url"), Err(ClientError::InvalidUrl(_))));
        assert!(matches!(parse_base("mailto:a@x.com"), Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/notifications"), vec!["notifications"]);
        assert_eq!(split_path("orders/42/"), vec!["orders", "42"]);
    }

    #[test]
    fn test_failure_payload_prefers_body() {
        let err = ClientError::Status {
            status: 400,
            body: json!({"error": "email inválido"}),
        };
        assert_eq!(err.failure_payload(), json!({"error": "email inválido"}));

        let bare = ClientError::Status {
            status: 502,
            body: Value::Null,
        };
        assert_eq!(
            bare.failure_payload(),
            json!("Request failed with status code 502")
        );

        let timeout = ClientError::Timeout("30s".into());
        assert_eq!(timeout.failure_payload(), json!("timeout: 30s"));
    }
}

//! Internal backend client: sync, health probe, raw sends and notifications.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use url::Url;

use super::{endpoint, execute, parse_base, split_path, ClientError};

const SERVICE: &str = "backend";

/// Timeout for the health probe, independent of the request timeout.
pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Body posted to `/sync`.
#[derive(Debug, Serialize)]
struct SyncEnvelope<'a> {
    entity: &'a str,
    action: &'a str,
    data: &'a Value,
    timestamp: String,
    source: &'static str,
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base: Option<Url>,
    api_key: Option<String>,
    timeout: Duration,
}

impl BackendClient {
    /// A `None` base URL builds a client whose calls fail with `NotConfigured`.
    pub fn new(
        http: Client,
        base_url: Option<&str>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base: base_url.map(parse_base).transpose()?,
            api_key,
            timeout,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let base = self.base.as_ref().ok_or(ClientError::NotConfigured("BACKEND_API_URL"))?;
        let url = endpoint(base, &split_path(path))?;

        let mut request = self.http.request(method, url).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        Ok(request)
    }

    /// Push an entity change to the backend.
    pub async fn sync_data(&self, entity: &str, action: &str, data: &Value) -> Result<Value, ClientError> {
        info!(entity = entity, action = action, "backend_sync_start");

        let envelope = SyncEnvelope {
            entity,
            action,
            data,
            timestamp: Utc::now().to_rfc3339(),
            source: "hubspot",
        };
        let request = self.request(Method::POST, "/sync")?.json(&envelope);

        match execute(SERVICE, request).await {
            Ok(response) => {
                info!(entity = entity, action = action, "backend_sync_complete");
                Ok(response)
            }
            Err(e) => {
                error!(
                    entity = entity,
                    action = action,
                    error = %e,
                    response = %e.failure_payload(),
                    "backend_sync_failed"
                );
                Err(e)
            }
        }
    }

    /// Probe `GET /health`. Never fails: any error reads as down.
    pub async fn check_status(&self) -> bool {
        let request = match self.request(Method::GET, "/health") {
            Ok(r) => r.timeout(STATUS_PROBE_TIMEOUT),
            Err(e) => {
                warn!(error = %e, "backend_status_unavailable");
                return false;
            }
        };

        match request.send().await {
            Ok(resp) => {
                let up = resp.status() == reqwest::StatusCode::OK;
                info!(status_code = resp.status().as_u16(), up = up, "backend_status_checked");
                up
            }
            Err(e) => {
                error!(
                    error = %e,
                    timeout = e.is_timeout(),
                    "backend_status_unreachable"
                );
                false
            }
        }
    }

    /// POST arbitrary data to a backend endpoint.
    pub async fn send_data(&self, path: &str, data: &Value) -> Result<Value, ClientError> {
        info!(endpoint = path, "backend_send_start");
        let request = self.request(Method::POST, path)?.json(data);
        let response = execute(SERVICE, request).await.inspect_err(|e| {
            error!(endpoint = path, error = %e, "backend_send_failed");
        })?;
        info!(endpoint = path, "backend_send_complete");
        Ok(response)
    }

    /// GET a backend endpoint with query parameters.
    pub async fn fetch_data(&self, path: &str, params: &[(String, String)]) -> Result<Value, ClientError> {
        info!(endpoint = path, params = params.len(), "backend_fetch_start");
        let request = self.request(Method::GET, path)?.query(params);
        execute(SERVICE, request).await.inspect_err(|e| {
            error!(endpoint = path, error = %e, "backend_fetch_failed");
        })
    }

    /// Post a notification; failures are logged and swallowed.
    pub async fn send_notification(&self, kind: &str, message: &str, data: Value) -> Option<Value> {
        info!(kind = kind, message = message, "backend_notification_start");

        let body = json!({
            "type": kind,
            "message": message,
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let result = match self.request(Method::POST, "/notifications") {
            Ok(request) => execute(SERVICE, request.json(&body)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(kind = kind, error = %e, "backend_notification_failed");
                None
            }
        }
    }
}

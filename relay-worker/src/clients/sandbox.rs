//! Sandbox backend client (contacts in, products out).

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;

use super::{endpoint, execute, parse_base, ClientError};
use crate::dispatch::RecordSink;
use crate::format::{format_contact, record_email, Record};

const SERVICE: &str = "sandbox";

pub const PAGE_PARAM: &str = "pagination[page]";
pub const PAGE_SIZE_PARAM: &str = "pagination[pageSize]";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct SandboxClient {
    http: Client,
    base: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl SandboxClient {
    pub fn new(
        http: Client,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base: parse_base(base_url)?,
            api_key,
            timeout,
        })
    }

    fn request(&self, method: Method, segment: &str) -> Result<RequestBuilder, ClientError> {
        let url = endpoint(&self.base, &[segment])?;
        let mut request = self.http.request(method, url).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        Ok(request)
    }

    /// Normalize and POST one contact to `/contacts`.
    pub async fn send_contact(&self, record: &Record) -> Result<Value, ClientError> {
        let email = record_email(record);
        let body = json!({ "data": format_contact(record) });

        info!(contact = ?email, "sandbox_contact_sending");

        let request = self.request(Method::POST, "contacts")?.json(&body);
        match execute(SERVICE, request).await {
            Ok(response) => {
                info!(contact = ?email, "sandbox_contact_sent");
                Ok(response)
            }
            Err(e) => {
                error!(
                    contact = ?email,
                    error = %e,
                    response = %e.failure_payload(),
                    "sandbox_contact_failed"
                );
                Err(e)
            }
        }
    }

    /// GET `/products`, filling in pagination defaults the caller left out.
    pub async fn get_products(&self, params: &[(String, String)]) -> Result<Value, ClientError> {
        let query = with_pagination_defaults(params);
        info!(params = ?query, "sandbox_products_fetching");

        let request = self.request(Method::GET, "products")?.query(&query);
        let response = execute(SERVICE, request).await.inspect_err(|e| {
            error!(error = %e, "sandbox_products_failed");
        })?;

        info!(
            count = response["data"].as_array().map(Vec::len).unwrap_or(0),
            "sandbox_products_fetched"
        );
        Ok(response)
    }
}

impl RecordSink for SandboxClient {
    async fn send(&self, record: &Record) -> Result<Value, ClientError> {
        self.send_contact(record).await
    }
}

/// Caller params first, then any missing pagination keys.
///
/// Bare `page` / `pageSize` params fill the pagination keys when the caller
/// did not set those directly.
fn with_pagination_defaults(params: &[(String, String)]) -> Vec<(String, String)> {
    let mut query = params.to_vec();
    let get = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());

    if get(PAGE_PARAM).is_none() {
        let page = get("page").unwrap_or_else(|| "1".to_string());
        query.push((PAGE_PARAM.to_string(), page));
    }
    if get(PAGE_SIZE_PARAM).is_none() {
        let size = get("pageSize").unwrap_or_else(|| DEFAULT_PAGE_SIZE.to_string());
        query.push((PAGE_SIZE_PARAM.to_string(), size));
    }
    query
}

//! HubSpot CRM v3 objects client.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;

use super::{endpoint, execute, parse_base, ClientError, DEFAULT_REQUEST_TIMEOUT};
use crate::format::{format_hubspot_contact, format_hubspot_deal, Record};

const SERVICE: &str = "hubspot";

/// CRM object kinds the relay reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrmObject {
    Contact,
    Deal,
    Company,
}

impl CrmObject {
    fn path(self) -> &'static str {
        match self {
            CrmObject::Contact => "contacts",
            CrmObject::Deal => "deals",
            CrmObject::Company => "companies",
        }
    }
}

#[derive(Clone)]
pub struct HubSpotClient {
    http: Client,
    base: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl HubSpotClient {
    pub fn new(http: Client, base_url: &str, access_token: Option<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base: parse_base(base_url)?,
            access_token,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    fn request(&self, method: Method, object: CrmObject, id: Option<&str>) -> Result<RequestBuilder, ClientError> {
        let mut segments = vec!["crm", "v3", "objects", object.path()];
        if let Some(id) = id {
            segments.push(id);
        }
        let url = endpoint(&self.base, &segments)?;

        let mut request = self.http.request(method, url).timeout(self.timeout);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn create(&self, object: CrmObject, properties: Record) -> Result<Value, ClientError> {
        let request = self
            .request(Method::POST, object, None)?
            .json(&json!({ "properties": properties }));

        match execute(SERVICE, request).await {
            Ok(created) => {
                info!(
                    object = object.path(),
                    object_id = %created["id"],
                    "hubspot_object_created"
                );
                Ok(created)
            }
            Err(e) => {
                error!(object = object.path(), error = %e, "hubspot_create_failed");
                Err(e)
            }
        }
    }

    async fn get(&self, object: CrmObject, id: &str) -> Result<Value, ClientError> {
        let request = self.request(Method::GET, object, Some(id))?;
        execute(SERVICE, request).await
    }

    async fn update(&self, object: CrmObject, id: &str, properties: Record) -> Result<Value, ClientError> {
        let request = self
            .request(Method::PATCH, object, Some(id))?
            .json(&json!({ "properties": properties }));

        match execute(SERVICE, request).await {
            Ok(updated) => {
                info!(object = object.path(), object_id = %id, "hubspot_object_updated");
                Ok(updated)
            }
            Err(e) => {
                error!(
                    object = object.path(),
                    object_id = %id,
                    error = %e,
                    "hubspot_update_failed"
                );
                Err(e)
            }
        }
    }

    pub async fn create_contact(&self, data: &Record) -> Result<Value, ClientError> {
        self.create(CrmObject::Contact, format_hubspot_contact(data)).await
    }

    /// Fetch a contact; a 404 from HubSpot is `Ok(None)`.
    pub async fn get_contact(&self, id: &str) -> Result<Option<Value>, ClientError> {
        match self.get(CrmObject::Contact, id).await {
            Ok(contact) => Ok(Some(contact)),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => {
                error!(contact_id = %id, error = %e, "hubspot_get_contact_failed");
                Err(e)
            }
        }
    }

    pub async fn update_contact(&self, id: &str, data: &Record) -> Result<Value, ClientError> {
        self.update(CrmObject::Contact, id, format_hubspot_contact(data)).await
    }

    pub async fn create_deal(&self, data: &Record) -> Result<Value, ClientError> {
        self.create(CrmObject::Deal, format_hubspot_deal(data)).await
    }

    pub async fn get_deal(&self, id: &str) -> Result<Value, ClientError> {
        self.get(CrmObject::Deal, id).await.inspect_err(|e| {
            error!(deal_id = %id, error = %e, "hubspot_get_deal_failed");
        })
    }

    pub async fn update_deal(&self, id: &str, data: &Record) -> Result<Value, ClientError> {
        self.update(CrmObject::Deal, id, format_hubspot_deal(data)).await
    }

    /// Company properties are forwarded untouched.
    pub async fn update_company(&self, id: &str, data: &Record) -> Result<Value, ClientError> {
        self.update(CrmObject::Company, id, data.clone()).await
    }
}

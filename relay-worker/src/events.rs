//! Inbound event kinds and how each one is relayed.
//!
//! ```text
//! HubSpot webhook  → fetch object from HubSpot → backend /sync
//! Backend webhook  → create/update HubSpot object
//! Backend process  → update HubSpot object by hubspotId
//! ```

use serde_json::Value;
use tracing::{info, warn};

use crate::clients::{BackendClient, HubSpotClient};
use crate::error::{AppError, AppResult};
use crate::format::{cell_text, Record};

/// One HubSpot webhook notification.
#[derive(Debug, Clone, PartialEq)]
pub enum HubSpotEvent {
    ContactCreation { object_id: String },
    ContactPropertyChange { object_id: String },
    DealCreation { object_id: String },
    DealPropertyChange { object_id: String },
    Unhandled { subscription_type: String },
}

impl HubSpotEvent {
    /// Parse one event object by its `subscriptionType`.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let event = value
            .as_object()
            .ok_or_else(|| AppError::BadRequest("Evento de webhook inválido".into()))?;

        let subscription_type = event
            .get("subscriptionType")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let object_id = || -> AppResult<String> {
            let id = cell_text(event.get("objectId"));
            if id.is_empty() {
                Err(AppError::invalid("objectId", "objectId é obrigatório"))
            } else {
                Ok(id)
            }
        };

        Ok(match subscription_type {
            "contact.creation" => HubSpotEvent::ContactCreation { object_id: object_id()? },
            "contact.propertyChange" => HubSpotEvent::ContactPropertyChange { object_id: object_id()? },
            "deal.creation" => HubSpotEvent::DealCreation { object_id: object_id()? },
            "deal.propertyChange" => HubSpotEvent::DealPropertyChange { object_id: object_id()? },
            other => HubSpotEvent::Unhandled {
                subscription_type: other.to_string(),
            },
        })
    }

    /// HubSpot delivers either one event object or a batch array.
    pub fn parse_batch(body: &Value) -> AppResult<Vec<Self>> {
        match body {
            Value::Array(events) => events.iter().map(Self::from_value).collect(),
            single => Ok(vec![Self::from_value(single)?]),
        }
    }
}

/// Fetch the changed object from HubSpot and sync it to the backend.
pub async fn relay_hubspot_event(
    event: &HubSpotEvent,
    hubspot: &HubSpotClient,
    backend: &BackendClient,
) -> AppResult<()> {
    let (entity, action, object_id) = match event {
        HubSpotEvent::ContactCreation { object_id } => ("contact", "create", object_id),
        HubSpotEvent::ContactPropertyChange { object_id } => ("contact", "update", object_id),
        HubSpotEvent::DealCreation { object_id } => ("deal", "create", object_id),
        HubSpotEvent::DealPropertyChange { object_id } => ("deal", "update", object_id),
        HubSpotEvent::Unhandled { subscription_type } => {
            warn!(subscription_type = %subscription_type, "hubspot_event_unhandled");
            return Ok(());
        }
    };

    info!(entity = entity, action = action, object_id = %object_id, "hubspot_event_relaying");

    let object = if entity == "contact" {
        match hubspot.get_contact(object_id).await? {
            Some(contact) => contact,
            None => {
                warn!(object_id = %object_id, "hubspot_event_contact_missing");
                return Ok(());
            }
        }
    } else {
        hubspot.get_deal(object_id).await?
    };

    backend.sync_data(entity, action, &object).await?;
    Ok(())
}

/// A backend webhook `{event, data}`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CustomerCreated(Record),
    CustomerUpdated { id: String, data: Record },
    OrderCreated(Record),
    Unhandled(String),
}

impl BackendEvent {
    pub fn from_body(body: &Value) -> AppResult<Self> {
        let event = body.get("event").and_then(Value::as_str).unwrap_or_default();
        let data = match body.get("data") {
            Some(Value::Object(map)) => map.clone(),
            _ => Record::new(),
        };

        Ok(match event {
            "customer.created" => BackendEvent::CustomerCreated(data),
            "customer.updated" => {
                let id = cell_text(data.get("id"));
                if id.is_empty() {
                    return Err(AppError::invalid("data.id", "data.id é obrigatório"));
                }
                BackendEvent::CustomerUpdated { id, data }
            }
            "order.created" => BackendEvent::OrderCreated(data),
            other => BackendEvent::Unhandled(other.to_string()),
        })
    }
}

/// Push a backend event into HubSpot.
pub async fn relay_backend_event(event: &BackendEvent, hubspot: &HubSpotClient) -> AppResult<()> {
    match event {
        BackendEvent::CustomerCreated(data) => {
            hubspot.create_contact(data).await?;
        }
        BackendEvent::CustomerUpdated { id, data } => {
            hubspot.update_contact(id, data).await?;
        }
        BackendEvent::OrderCreated(data) => {
            hubspot.create_deal(data).await?;
        }
        BackendEvent::Unhandled(name) => {
            warn!(event = %name, "backend_event_unhandled");
        }
    }
    Ok(())
}

/// A backend process request `{type, payload}` targeting one HubSpot object.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessRequest {
    ContactUpdate { hubspot_id: String, properties: Record },
    DealUpdate { hubspot_id: String, properties: Record },
    CompanyUpdate { hubspot_id: String, properties: Record },
}

impl ProcessRequest {
    /// `hubspotId` is lifted out of the payload; the rest become properties.
    pub fn parse(kind: &str, payload: &Record) -> AppResult<Self> {
        let build = |ctor: fn(String, Record) -> ProcessRequest| -> AppResult<ProcessRequest> {
            let mut properties = payload.clone();
            let hubspot_id = cell_text(properties.remove("hubspotId").as_ref());
            if hubspot_id.is_empty() {
                return Err(AppError::invalid("payload.hubspotId", "hubspotId é obrigatório"));
            }
            Ok(ctor(hubspot_id, properties))
        };

        match kind {
            "contact_update" => build(|hubspot_id, properties| ProcessRequest::ContactUpdate {
                hubspot_id,
                properties,
            }),
            "deal_update" => build(|hubspot_id, properties| ProcessRequest::DealUpdate {
                hubspot_id,
                properties,
            }),
            "company_update" => build(|hubspot_id, properties| ProcessRequest::CompanyUpdate {
                hubspot_id,
                properties,
            }),
            other => {
                warn!(kind = %other, "backend_process_unrecognized");
                Err(AppError::BadRequest("Tipo de processamento não reconhecido".into()))
            }
        }
    }

    pub async fn apply(&self, hubspot: &HubSpotClient) -> AppResult<Value> {
        let updated = match self {
            ProcessRequest::ContactUpdate { hubspot_id, properties } => {
                hubspot.update_contact(hubspot_id, properties).await?
            }
            ProcessRequest::DealUpdate { hubspot_id, properties } => {
                hubspot.update_deal(hubspot_id, properties).await?
            }
            ProcessRequest::CompanyUpdate { hubspot_id, properties } => {
                hubspot.update_company(hubspot_id, properties).await?
            }
        };
        Ok(updated)
    }
}

//! Route handlers.
//!
//! Handlers validate input, call the remote clients and wrap results in the
//! standard `ApiResponse` envelope. Failures bubble up as `AppError`.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::dispatch::dispatch_all;
use crate::error::{AppError, AppResult};
use crate::events::{relay_backend_event, relay_hubspot_event, BackendEvent, HubSpotEvent, ProcessRequest};
use crate::export::{export_filename, write_products_csv};
use crate::format::Record;
use crate::ingest::{resolve_data_file, ContactReader, DEFAULT_CONTACTS_FILE};
use crate::validation::{
    sanitize_str, sanitize_value, validate_contact, validate_contact_update, validate_contacts_batch,
    validate_deal, validate_numeric_id, validate_process, validate_sync,
};
use crate::web::extract::{parse_json_body, SanitizedJson};
use crate::web::middleware::resolve_client_ip;
use crate::web::response::ApiResponse;
use crate::web::signature::{verify_hubspot_signature, SIGNATURE_HEADER, SIGNATURE_VERSION_HEADER};
use crate::web::AppState;

type ApiResult = AppResult<Json<ApiResponse>>;

fn created(body: ApiResponse) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::CREATED, Json(body))
}

/// Run blocking file work off the async runtime.
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since startup
    pub uptime: f64,
    pub environment: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.config.environment.clone(),
    })
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "HubRelay - integração HubSpot e backend",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "hubspot": "/api/hubspot",
            "backend": "/api/backend",
            "products": "/api/products",
            "contacts": "/api/contacts"
        }
    }))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    warn!(path = %uri.path(), "route_not_found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Route not found",
            "path": uri.path(),
        })),
    )
}

// =============================================================================
// HubSpot
// =============================================================================

/// HubSpot webhook endpoint.
///
/// The signature is checked against the raw body before anything parses or
/// sanitizes it.
pub async fn hubspot_webhook(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    let ip = resolve_client_ip(peer.map(|ConnectInfo(addr)| addr), &headers);
    let path = uri.path();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty());

    let Some(signature) = signature else {
        warn!(path = %path, ip = %ip, body_length = body.len(), "hubspot_signature_missing");
        return Err(AppError::Unauthorized("Assinatura HubSpot não fornecida".into()));
    };

    let version = headers
        .get(SIGNATURE_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_hubspot_signature(state.config.hubspot_webhook_secret.as_deref(), &body, signature) {
        warn!(path = %path, ip = %ip, body_length = body.len(), "hubspot_signature_mismatch");
        return Err(AppError::SignatureMismatch);
    }
    info!(path = %path, ip = %ip, signature_version = %version, "hubspot_signature_valid");

    let payload = sanitize_value(parse_json_body(&body)?);
    let events = HubSpotEvent::parse_batch(&payload)?;
    info!(events = events.len(), "hubspot_webhook_received");

    for event in &events {
        relay_hubspot_event(event, &state.hubspot, &state.backend).await?;
    }

    Ok(Json(ApiResponse::message(true, "Webhook processado com sucesso")))
}

pub async fn create_contact(
    State(state): State<AppState>,
    SanitizedJson(body): SanitizedJson,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let record = validate_contact(&body)?;
    info!(email = ?record.get("email"), "hubspot_contact_creating");

    let contact = state.hubspot.create_contact(&record).await?;
    state.backend.sync_data("contact", "create", &contact).await?;

    Ok(created(ApiResponse::ok_with_message(contact, "Contato criado com sucesso")))
}

pub async fn get_contact(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    validate_numeric_id(&id)?;

    match state.hubspot.get_contact(&id).await? {
        Some(contact) => Ok(Json(ApiResponse::ok(contact))),
        None => Err(AppError::NotFound("Contato não encontrado".into())),
    }
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    SanitizedJson(body): SanitizedJson,
) -> ApiResult {
    validate_numeric_id(&id)?;
    let record = validate_contact_update(&body)?;

    let contact = state.hubspot.update_contact(&id, &record).await?;
    state.backend.sync_data("contact", "update", &contact).await?;

    Ok(Json(ApiResponse::ok_with_message(contact, "Contato atualizado com sucesso")))
}

pub async fn create_deal(
    State(state): State<AppState>,
    SanitizedJson(body): SanitizedJson,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let record = validate_deal(&body)?;
    info!(dealname = ?record.get("dealname"), "hubspot_deal_creating");

    let deal = state.hubspot.create_deal(&record).await?;
    state.backend.sync_data("deal", "create", &deal).await?;

    Ok(created(ApiResponse::ok_with_message(deal, "Negócio criado com sucesso")))
}

// =============================================================================
// Backend
// =============================================================================

pub async fn backend_sync(State(state): State<AppState>, SanitizedJson(body): SanitizedJson) -> ApiResult {
    let request = validate_sync(&body)?;
    let result = state
        .backend
        .sync_data(&request.entity, &request.action, &request.data)
        .await?;

    Ok(Json(ApiResponse::ok_with_message(result, "Sincronização realizada com sucesso")))
}

pub async fn backend_status(State(state): State<AppState>) -> Json<ApiResponse> {
    let start = Instant::now();
    let online = state.backend.check_status().await;
    let response_time = start.elapsed().as_millis() as u64;

    Json(ApiResponse::ok(json!({
        "status": if online { "online" } else { "offline" },
        "timestamp": Utc::now().to_rfc3339(),
        "responseTime": response_time,
    })))
}

pub async fn backend_process(State(state): State<AppState>, SanitizedJson(body): SanitizedJson) -> ApiResult {
    let (kind, payload) = validate_process(&body)?;
    let request = ProcessRequest::parse(&kind, &payload)?;
    info!(kind = %kind, "backend_process_start");

    let result = request.apply(&state.hubspot).await?;

    Ok(Json(ApiResponse::ok_with_message(result, "Dados processados com sucesso")))
}

pub async fn backend_webhook(State(state): State<AppState>, SanitizedJson(body): SanitizedJson) -> ApiResult {
    let event = BackendEvent::from_body(&body)?;
    info!(event = ?body.get("event"), "backend_webhook_received");

    relay_backend_event(&event, &state.hubspot).await?;

    Ok(Json(ApiResponse::message(true, "Webhook processado com sucesso")))
}

// =============================================================================
// Contacts
// =============================================================================

/// Read a contacts CSV from the data directory and bulk-send it.
pub async fn send_contacts_csv(State(state): State<AppState>, SanitizedJson(body): SanitizedJson) -> ApiResult {
    let filename = match body.get("filename") {
        None | Some(Value::Null) => DEFAULT_CONTACTS_FILE.to_string(),
        Some(Value::String(name)) if name.trim().is_empty() => DEFAULT_CONTACTS_FILE.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Err(AppError::invalid("filename", "filename deve ser um texto")),
    };

    let path = resolve_data_file(&state.config.data_dir, &filename)
        .ok_or_else(|| AppError::invalid("filename", "Nome de arquivo inválido"))?;

    info!(filename = %filename, path = %path.display(), "contacts_csv_requested");

    let records: Vec<Record> = blocking(move || Ok(ContactReader::open(&path)?.read_all()?)).await?;

    if records.is_empty() {
        warn!(filename = %filename, "contacts_csv_empty");
        return Ok(Json(ApiResponse::message(false, "Nenhum contato encontrado no arquivo CSV")));
    }

    let summary = dispatch_all(&state.sandbox, &records, &state.dispatch_delay).await;
    let data = serde_json::to_value(&summary).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::ok_with_message(data, "Contatos processados")))
}

/// Bulk-send contacts from the request body.
pub async fn send_contacts(State(state): State<AppState>, SanitizedJson(body): SanitizedJson) -> ApiResult {
    let records = validate_contacts_batch(&body)?;
    info!(total = records.len(), "contacts_send_requested");

    let summary = dispatch_all(&state.sandbox, &records, &state.dispatch_delay).await;
    let data = serde_json::to_value(&summary).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::ok_with_message(data, "Contatos enviados")))
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult {
    let params: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k, sanitize_str(&v)))
        .collect();

    let mut response = state.sandbox.get_products(&params).await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(response.get_mut("data").map(Value::take).unwrap_or(Value::Null)),
        meta: response.get_mut("meta").map(Value::take),
        ..Default::default()
    }))
}

pub async fn export_products(State(state): State<AppState>) -> ApiResult {
    let params = [("pageSize".to_string(), "100".to_string())];
    let mut response = state.sandbox.get_products(&params).await?;

    let products = match response.get_mut("data").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    if products.is_empty() {
        warn!("products_export_empty");
        return Ok(Json(ApiResponse::message(false, "Nenhum produto encontrado")));
    }

    let data_dir = state.config.data_dir.clone();
    let filename = export_filename();
    let result = blocking(move || Ok(write_products_csv(&data_dir, &filename, &products)?)).await?;
    let data = serde_json::to_value(&result).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::ok_with_message(data, "Produtos exportados com sucesso")))
}

pub async fn download_products(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let path = resolve_data_file(&state.config.data_dir, &filename)
        .ok_or_else(|| AppError::invalid("filename", "Nome de arquivo inválido"))?;

    let content = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("Arquivo não encontrado".into()));
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    info!(filename = %filename, bytes = content.len(), "products_csv_download");

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

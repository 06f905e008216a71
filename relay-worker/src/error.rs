//! Error taxonomy for the HTTP surface.
//!
//! Every failure that escapes a handler ends up here and is rendered as the
//! standard `{success: false, error, ...}` envelope with a status code per
//! variant. Per-record bulk dispatch failures never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::clients::ClientError;
use crate::ingest::IngestError;
use crate::web::response::ApiResponse;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    Validation(Vec<FieldError>),

    #[error("JSON inválido")]
    InvalidJson,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Assinatura HubSpot inválida")]
    SignatureMismatch,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Timeout na requisição ao serviço externo")]
    UpstreamTimeout,

    #[error("Erro no serviço externo (status {status})")]
    Upstream { status: u16, body: Value },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidJson | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::SignatureMismatch | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            // Remote 2xx/3xx never become errors; anything else outside
            // the error range is reported as a bad gateway.
            AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Timeout(_) | ClientError::Connect(_) => AppError::UpstreamTimeout,
            ClientError::Status { status, body } => AppError::Upstream { status, body },
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::NotFound(_) => AppError::NotFound(e.to_string()),
            IngestError::Csv(_) => AppError::BadRequest(e.to_string()),
            IngestError::Io(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request_failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request_rejected");
        }

        let mut body = ApiResponse::error(self.to_string());
        match self {
            AppError::Validation(details) => {
                body.details = serde_json::to_value(details).ok();
            }
            AppError::Upstream { body: remote, .. } if !remote.is_null() => {
                body.details = Some(remote);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

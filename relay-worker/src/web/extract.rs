//! Request body extractors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::Value;
use tracing::warn;

use crate::error::AppError;
use crate::validation::sanitize_value;

/// A JSON body with markup stripped from every string.
///
/// An empty body reads as `{}`; anything unparseable is `AppError::InvalidJson`.
#[derive(Debug, Clone)]
pub struct SanitizedJson(pub Value);

#[async_trait]
impl<S> FromRequest<S> for SanitizedJson
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        parse_json_body(&body)
            .map(|value| SanitizedJson(sanitize_value(value)))
            .inspect_err(|_| warn!(path = %path, body_length = body.len(), "json_body_invalid"))
    }
}

/// Parse raw bytes as JSON, treating a blank body as an empty object.
pub fn parse_json_body(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|_| AppError::InvalidJson)
}

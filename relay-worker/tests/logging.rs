//! Structured log output of rejected requests, captured through the same
//! JSON formatter the server installs.

use std::io;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;

use hubrelay::{build_router, AppState, Config};

const SECRET: &str = "test-webhook-secret";

/// In-memory log sink, one JSON object per line.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    fn event(&self, message: &str) -> Value {
        self.text()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .find(|line| line["message"] == message)
            .unwrap_or_else(|| panic!("no {} event in:\n{}", message, self.text()))
    }
}

/// Install a thread-local JSON subscriber at the production `info` level.
fn capture() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

fn app() -> Router {
    let config = Config {
        hubspot_webhook_secret: Some(SECRET.to_string()),
        dispatch_delay_ms: 0,
        ..Config::default()
    };
    build_router(AppState::from_config(config).unwrap())
}

fn webhook(signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/hubspot/webhook")
        .header("content-type", "application/json")
        .header("X-Forwarded-For", "203.0.113.9");
    if let Some(sig) = signature {
        builder = builder.header("X-HubSpot-Signature", sig);
    }
    builder.body(Body::from("{}")).unwrap()
}

#[tokio::test]
async fn test_signature_mismatch_logs_path_and_ip() {
    let (logs, _guard) = capture();

    let response = app().oneshot(webhook(Some("deadbeef"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let event = logs.event("hubspot_signature_mismatch");
    assert_eq!(event["path"], "/api/hubspot/webhook");
    assert_eq!(event["ip"], "203.0.113.9");

    let text = logs.text();
    assert!(!text.contains("deadbeef"));
    assert!(!text.contains(SECRET));
}

#[tokio::test]
async fn test_signature_missing_logs_path_and_ip() {
    let (logs, _guard) = capture();

    let response = app().oneshot(webhook(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let event = logs.event("hubspot_signature_missing");
    assert_eq!(event["path"], "/api/hubspot/webhook");
    assert_eq!(event["ip"], "203.0.113.9");
}

#[tokio::test]
async fn test_error_response_logged_with_method_and_path() {
    let (logs, _guard) = capture();

    let request = Request::builder()
        .method("POST")
        .uri("/api/contacts/send")
        .header("content-type", "application/json")
        .body(Body::from(json!({"contacts": []}).to_string()))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let event = logs.event("request_rejected");
    assert_eq!(event["status"], 400);
    assert_eq!(event["span"]["method"], "POST");
    assert_eq!(event["span"]["uri"], "/api/contacts/send");
}

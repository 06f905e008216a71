//! HTTP surface of the relay.
//!
//! ```text
//! /              service info
//! /health        liveness
//! /api/hubspot   signed webhook + CRM writes (API key)
//! /api/backend   sync, status, process, webhook (API key + IP allow-list)
//! /api/products  list, export, download
//! /api/contacts  bulk send from CSV or body
//! ```
//!
//! Every `/api` route passes the global rate limiter; the HubSpot webhook
//! also passes the webhook limiter. Requests run inside an INFO `request`
//! span carrying method and uri, so error events logged by `AppError`
//! inherit both.

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod signature;
pub mod state;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{warn, Level};

pub use response::ApiResponse;
pub use signature::verify_hubspot_signature;
pub use state::AppState;

use self::handlers::*;
use self::middleware::{global_rate_limit, require_allowed_ip, require_api_key, webhook_rate_limit};

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let webhook = Router::new()
        .route("/webhook", post(hubspot_webhook))
        .route_layer(from_fn_with_state(state.clone(), webhook_rate_limit));

    let hubspot = Router::new()
        .route("/contact", post(create_contact))
        .route("/contact/:id", get(get_contact).put(update_contact))
        .route("/deal", post(create_deal))
        .route_layer(from_fn_with_state(state.clone(), require_api_key))
        .merge(webhook);

    let backend = Router::new()
        .route("/sync", post(backend_sync))
        .route("/status", get(backend_status))
        .route("/process", post(backend_process))
        .route("/webhook", post(backend_webhook))
        .route_layer(from_fn_with_state(state.clone(), require_api_key))
        .route_layer(from_fn_with_state(state.clone(), require_allowed_ip));

    let products = Router::new()
        .route("/", get(list_products))
        .route("/export", post(export_products))
        .route("/download/:filename", get(download_products));

    let contacts = Router::new()
        .route("/send-csv", post(send_contacts_csv))
        .route("/send", post(send_contacts));

    let api = Router::new()
        .nest("/hubspot", hubspot)
        .nest("/backend", backend)
        .nest("/products", products)
        .nest("/contacts", contacts)
        .route_layer(from_fn_with_state(state.clone(), global_rate_limit));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(cors_origin = %origin, "cors_origin_invalid");
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

//! HubRelay - HubSpot to backend CRM relay.
//!
//! This library backs the `hubrelay-web` binary:
//! - Verifies signed HubSpot webhooks and syncs the changed objects to the backend
//! - Pushes backend events and updates into HubSpot
//! - Bulk-sends contacts from CSV files or request bodies to the sandbox backend
//! - Exports sandbox products to CSV
//!
//! ## Bulk pipeline
//!
//! ```text
//! contatos.csv → ContactReader → [Record] → dispatch_all → SandboxClient → DispatchSummary
//! ```

pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod export;
pub mod format;
pub mod ingest;
pub mod rate_limit;
pub mod validation;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{dispatch_all, DelayPolicy, DispatchOutcome, DispatchSummary, FixedDelay, RecordSink};
pub use error::{AppError, AppResult};
pub use format::Record;
pub use web::{build_router, AppState};

//! Sequential bulk dispatch with partial-failure accounting.
//!
//! ## Flow
//!
//! ```text
//! [Record] → sink.send() → pause → sink.send() → ... → DispatchSummary
//! ```
//!
//! Sends are strictly one at a time. A failed record is recorded and the
//! batch moves on; nothing is retried or rolled back.

pub mod summary;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::ClientError;
use crate::format::{record_email, Record};

pub use summary::{DispatchOutcome, DispatchSummary};

/// Default pause between consecutive sends.
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_millis(100);

/// Destination for bulk-dispatched records.
pub trait RecordSink {
    /// Send one record, returning the remote response body.
    fn send(&self, record: &Record) -> impl Future<Output = Result<Value, ClientError>> + Send;
}

/// Pacing between consecutive sends.
pub trait DelayPolicy {
    fn pause(&self) -> impl Future<Output = ()> + Send;
}

/// Sleep for a fixed duration; a zero duration never yields to the timer.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        FixedDelay(DEFAULT_DISPATCH_DELAY)
    }
}

impl DelayPolicy for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            sleep(self.0).await;
        }
    }
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayPolicy for NoDelay {
    async fn pause(&self) {}
}

/// Send every record through `sink` in order and tally the outcomes.
pub async fn dispatch_all<S, D>(sink: &S, records: &[Record], delay: &D) -> DispatchSummary
where
    S: RecordSink + Sync,
    D: DelayPolicy + Sync,
{
    info!(total = records.len(), "bulk_dispatch_start");

    let mut results = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            delay.pause().await;
        }

        let identifier = record_email(record);

        let outcome = match sink.send(record).await {
            Ok(data) => {
                info!(index = index, contact = ?identifier, "bulk_dispatch_record_sent");
                DispatchOutcome::succeeded(identifier, data)
            }
            Err(e) => {
                warn!(
                    index = index,
                    contact = ?identifier,
                    error = %e,
                    "bulk_dispatch_record_failed"
                );
                DispatchOutcome::failed(identifier, e.failure_payload())
            }
        };

        results.push(outcome);
    }

    let summary = DispatchSummary::from_outcomes(results);

    info!(
        total = summary.total,
        success = summary.success_count,
        errors = summary.error_count,
        "bulk_dispatch_complete"
    );

    summary
}

//! Per-record outcomes and their aggregate.

use serde::Serialize;
use serde_json::Value;

/// Result of sending one record.
///
/// Exactly one of `data` (remote response) or `error` (remote error body or
/// failure message) is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub success: bool,
    /// The record's email, serialized as `contact`
    #[serde(rename = "contact")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl DispatchOutcome {
    pub fn succeeded(identifier: Option<String>, data: Value) -> Self {
        Self {
            success: true,
            identifier,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(identifier: Option<String>, error: Value) -> Self {
        Self {
            success: false,
            identifier,
            data: None,
            error: Some(error),
        }
    }
}

/// Totals for a bulk dispatch.
///
/// `success_count + error_count == total == results.len()` by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<DispatchOutcome>,
}

impl DispatchSummary {
    pub fn from_outcomes(results: Vec<DispatchOutcome>) -> Self {
        let success_count = results.iter().filter(|o| o.success).count();
        Self {
            total: results.len(),
            success_count,
            error_count: results.len() - success_count,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_add_up() {
        let summary = DispatchSummary::from_outcomes(vec![
            DispatchOutcome::succeeded(Some("a@x.com".into()), json!({"id": 1})),
            DispatchOutcome::failed(Some("b@x.com".into()), json!("boom")),
            DispatchOutcome::succeeded(None, json!({})),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.success_count + summary.error_count, summary.results.len());
    }

    #[test]
    fn test_empty_summary() {
        let summary = DispatchSummary::from_outcomes(Vec::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.error_count, 0);
    }

    #[test]
    fn test_wire_shape() {
        let summary = DispatchSummary::from_outcomes(vec![
            DispatchOutcome::succeeded(Some("a@x.com".into()), json!({"id": 7})),
            DispatchOutcome::failed(Some("b@x.com".into()), json!({"message": "dup"})),
        ]);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["successCount"], 1);
        assert_eq!(json["errorCount"], 1);
        assert_eq!(json["results"][0]["contact"], "a@x.com");
        assert_eq!(json["results"][0]["data"]["id"], 7);
        assert!(json["results"][0].get("error").is_none());
        assert_eq!(json["results"][1]["error"]["message"], "dup");
        assert!(json["results"][1].get("data").is_none());
    }
}

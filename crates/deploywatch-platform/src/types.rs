//! Typed views of platform API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deploywatch_core::DeploymentRecord;

/// Full deployment detail, as returned by the overview endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub prediction_environment_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub importance: Option<String>,
}

impl Deployment {
    /// The display label, falling back to the ID.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    /// The summary record used by listing and name resolution.
    pub fn record(&self) -> DeploymentRecord {
        DeploymentRecord {
            id: self.id.clone(),
            label: self.label.clone(),
            status: self.status.clone(),
            description: self.description.clone(),
        }
    }
}

/// Aggregate service statistics for a deployment over a window.
///
/// Request/error counters and latency percentiles are platform-computed;
/// latency fields may be absent when the deployment saw no traffic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub total_errors: u64,
    #[serde(default)]
    pub data_errors: u64,
    #[serde(default)]
    pub system_errors: u64,
    #[serde(default)]
    pub avg_response_time: Option<f64>,
    #[serde(default)]
    pub p50_response_time: Option<f64>,
    #[serde(default)]
    pub p95_response_time: Option<f64>,
    #[serde(default)]
    pub p99_response_time: Option<f64>,
    #[serde(default)]
    pub max_response_time: Option<f64>,
}

impl ServiceStats {
    /// Error rate as a percentage, 0 when there was no traffic.
    pub fn error_rate_pct(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_errors as f64 / self.total_requests as f64 * 100.0
        }
    }

    /// Success rate as a percentage, 0 when there was no traffic.
    ///
    /// Both counters are platform-supplied; an error count exceeding the
    /// request count clamps to 0% rather than underflowing.
    pub fn success_rate_pct(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_requests.saturating_sub(self.total_errors) as f64
                / self.total_requests as f64
                * 100.0
        }
    }
}

/// One row of the recent-traces listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Comma-separated tool names the traced run invoked, if reported.
    #[serde(default)]
    pub tools: Option<String>,
}

/// One span of a trace detail, pre-flattened by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    pub name: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub status: String,
    /// Nesting depth in the span tree (0 = root).
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TraceSpan {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_stats_rates() {
        let stats = ServiceStats {
            total_requests: 200,
            total_errors: 10,
            ..Default::default()
        };
        assert!((stats.error_rate_pct() - 5.0).abs() < 1e-9);
        assert!((stats.success_rate_pct() - 95.0).abs() < 1e-9);

        let idle = ServiceStats::default();
        assert_eq!(idle.error_rate_pct(), 0.0);
        assert_eq!(idle.success_rate_pct(), 0.0);

        // Inconsistent platform counters clamp instead of underflowing.
        let inconsistent = ServiceStats {
            total_requests: 10,
            total_errors: 15,
            ..Default::default()
        };
        assert_eq!(inconsistent.success_rate_pct(), 0.0);
        assert!((inconsistent.error_rate_pct() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_service_stats_camel_case_wire_format() {
        let json = r#"{
            "totalRequests": 1200,
            "totalErrors": 30,
            "dataErrors": 20,
            "systemErrors": 10,
            "avgResponseTime": 850.5,
            "p95ResponseTime": 2100.0
        }"#;
        let stats: ServiceStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_requests, 1200);
        assert_eq!(stats.system_errors, 10);
        assert_eq!(stats.avg_response_time, Some(850.5));
        assert_eq!(stats.p99_response_time, None);
    }

    #[test]
    fn test_deployment_record_projection() {
        let deployment = Deployment {
            id: "abc123".to_string(),
            label: Some("churn-model".to_string()),
            status: Some("active".to_string()),
            description: None,
            model_type: Some("agentic".to_string()),
            target_type: None,
            prediction_environment_url: None,
            created_at: None,
            importance: None,
        };
        let record = deployment.record();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.label.as_deref(), Some("churn-model"));
        assert_eq!(deployment.display_label(), "churn-model");
    }
}

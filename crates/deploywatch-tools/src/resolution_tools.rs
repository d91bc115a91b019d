//! Error-resolution knowledge base and history tools.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use deploywatch_core::{
    integer_property, object_schema, string_property, ActivityLog, ErrorHistory, TimeWindow, Tool,
    ToolOutput, ToolResult,
};

use crate::args;

const DEFAULT_HISTORY_HOURS: u64 = 168;

struct ResolutionEntry {
    pattern: &'static str,
    title: &'static str,
    severity: &'static str,
    steps: &'static [&'static str],
    prevention: &'static [&'static str],
}

// Patterns match against the lowercased error message.
const KNOWLEDGE_BASE: &[ResolutionEntry] = &[
    ResolutionEntry {
        pattern: r"deployment.*not found|404",
        title: "Deployment not found",
        severity: "high",
        steps: &[
            "1. Check that the deployment ID is correct",
            "2. Confirm in the platform UI that the deployment exists",
            "3. Confirm the deployment has not been deleted",
            "4. Confirm you have access (check the sharing settings)",
        ],
        prevention: &[
            "Copy and paste deployment IDs rather than retyping them",
            "Do not keep IDs of deleted deployments around",
        ],
    },
    ResolutionEntry {
        pattern: r"authentication|unauthorized|401|403",
        title: "API authentication error",
        severity: "critical",
        steps: &[
            "1. Check that the API token environment variable is set correctly",
            "2. Check the API key's expiry in the platform UI",
            "3. Confirm the API key is enabled",
            "4. Confirm the API key has the required permissions",
        ],
        prevention: &[
            "Rotate API keys regularly",
            "Review environment variables periodically",
        ],
    },
    ResolutionEntry {
        pattern: r"rate limit|too many requests|429",
        title: "Rate limit exceeded",
        severity: "medium",
        steps: &[
            "1. Lower the request rate (implement a backoff strategy)",
            "2. Ask a platform administrator to raise the limit if needed",
            "3. Use caching to cut down API calls",
            "4. Batch multiple requests together",
        ],
        prevention: &["Throttle outgoing requests", "Cache results"],
    },
    ResolutionEntry {
        pattern: r"invalid data|format error|schema",
        title: "Data format error",
        severity: "medium",
        steps: &[
            "1. Check the input data schema",
            "2. Confirm all required fields are present",
            "3. Confirm the field types are correct (string, number, date)",
            "4. Try the request with sample data",
        ],
        prevention: &["Validate input data", "Document the schema definitions"],
    },
    ResolutionEntry {
        pattern: r"timeout|timed out",
        title: "Timeout error",
        severity: "high",
        steps: &[
            "1. Check the network connection",
            "2. Extend the timeout when processing large payloads",
            "3. Reduce the payload size and split the request",
            "4. Check the platform's service status",
        ],
        prevention: &[
            "Set appropriate timeouts",
            "Split large payloads into chunks",
        ],
    },
    ResolutionEntry {
        pattern: r"trace.*not available|no trace data",
        title: "Trace data not available",
        severity: "low",
        steps: &[
            "1. Check that tracing is enabled in the deployment settings",
            "2. Check that prediction data storage is enabled",
            "3. Check that the trace ID is correct",
            "4. Check the trace data retention window",
        ],
        prevention: &[
            "Enable tracing when creating deployments",
            "Archive trace data regularly",
        ],
    },
];

/// Patterns compiled once, in knowledge-base order. The patterns are
/// static and known-good; a compile failure is a programming defect and
/// surfaces at first use.
fn compiled_patterns() -> &'static [(Regex, &'static ResolutionEntry)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static ResolutionEntry)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        KNOWLEDGE_BASE
            .iter()
            .map(|entry| {
                let re = Regex::new(entry.pattern)
                    .unwrap_or_else(|e| panic!("invalid pattern {:?}: {e}", entry.pattern));
                (re, entry)
            })
            .collect()
    })
}

fn lookup(error_message: &str) -> Option<&'static ResolutionEntry> {
    let lowered = error_message.to_lowercase();
    compiled_patterns()
        .iter()
        .find(|(re, _)| re.is_match(&lowered))
        .map(|(_, entry)| *entry)
}

/// Suggest a resolution for an error message from the knowledge base.
pub struct SuggestErrorResolutionTool;

impl SuggestErrorResolutionTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SuggestErrorResolutionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SuggestErrorResolutionTool {
    fn name(&self) -> &str {
        "suggest_error_resolution"
    }

    fn description(&self) -> &str {
        "Match an error message against the known error patterns and suggest \
         step-by-step resolution and prevention advice."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                (
                    "error_message",
                    string_property("The error message to diagnose"),
                ),
                (
                    "deployment_id",
                    string_property("Deployment ID for context (optional)"),
                ),
                ("context", string_property("Extra context (optional)")),
            ],
            &["error_message"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let error_message = args::required_str(&arguments, "error_message")?;
        let deployment_id = args::optional_str(&arguments, "deployment_id");
        let context = args::optional_str(&arguments, "context");

        let Some(entry) = lookup(error_message) else {
            return Ok(ToolOutput::text(format!(
                "## Error Resolution Suggestion\n\n\
                 **Error message**: {error_message}\n\n\
                 This error did not match any known pattern.\n\n\
                 ### General steps\n\
                 1. Review the full error message\n\
                 2. Check the platform logs (UI or API)\n\
                 3. Review recent changes (deployment, code, environment variables)\n\
                 4. Contact platform support\n\n\
                 ### Information to collect\n\
                 - The complete error stack trace\n\
                 - The timestamp when the error occurred\n\
                 - Deployment ID: {}\n\
                 - Details of the request that was made",
                deployment_id.unwrap_or("N/A"),
            )));
        };

        let mut out = format!(
            "## Error Resolution Suggestion\n\n\
             [{}] **{}**\n\n\
             **Error message**: {error_message}\n\
             **Severity**: {}\n\n\
             ### Steps\n\n",
            entry.severity.to_uppercase(),
            entry.title,
            entry.severity.to_uppercase(),
        );
        for step in entry.steps {
            let _ = writeln!(out, "{step}");
        }
        out.push_str("\n### Prevention\n\n");
        for item in entry.prevention {
            let _ = writeln!(out, "- {item}");
        }
        if let Some(id) = deployment_id {
            let _ = write!(out, "\n### Context\n- **Deployment ID**: {id}\n");
        }
        if let Some(extra) = context {
            let _ = writeln!(out, "- **Additional information**: {extra}");
        }
        Ok(ToolOutput::text(out))
    }
}

/// Historical error digest from the activity log.
pub struct ErrorResolutionHistoryTool {
    activity: Arc<ActivityLog>,
}

impl ErrorResolutionHistoryTool {
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self { activity }
    }
}

#[async_trait]
impl Tool for ErrorResolutionHistoryTool {
    fn name(&self) -> &str {
        "get_error_resolution_history"
    }

    fn description(&self) -> &str {
        "Digest of the errors recorded for a deployment: the most frequent \
         error messages with occurrence counts, affected users, and first/last \
         seen times. Defaults to the last 7 days."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                (
                    "time_range_hours",
                    integer_property("Hours to analyze, counting back from now (default 168)"),
                ),
            ],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let hours = args::int_or(&arguments, "time_range_hours", DEFAULT_HISTORY_HOURS) as i64;

        let header = format!(
            "## Error History\n\n\
             **Deployment ID**: {deployment_id}\n\
             **Window**: last {hours} hours\n",
        );
        let digest = self
            .activity
            .error_digest(deployment_id, TimeWindow::last_hours(hours));
        let (total_errors, groups) = match digest {
            ErrorHistory::NoErrors => {
                return Ok(ToolOutput::text(format!(
                    "{header}\nNo errors were recorded in this window."
                )))
            }
            ErrorHistory::Digest {
                total_errors,
                groups,
            } => (total_errors, groups),
        };

        let mut out = format!("{header}**Total errors**: {total_errors}\n\n### Top errors\n\n");
        for (i, group) in groups.iter().enumerate() {
            // Long messages are truncated to keep the digest scannable.
            let display: String = if group.message.chars().count() > 100 {
                format!("{}...", group.message.chars().take(100).collect::<String>())
            } else {
                group.message.clone()
            };
            let _ = write!(
                out,
                "#### {}. {display}\n\
                 - **Occurrences**: {}\n\
                 - **Affected users**: {}\n\
                 - **First seen**: {} UTC\n\
                 - **Last seen**: {} UTC\n\n",
                i + 1,
                group.count,
                group.affected_users,
                group.first_seen.format("%Y-%m-%d %H:%M"),
                group.last_seen.format("%Y-%m-%d %H:%M"),
            );
        }
        out.push_str(
            "### Recommended actions\n\
             - Run `suggest_error_resolution` on the frequent errors for remediation steps\n\
             - Recurring identical errors call for a root-cause investigation",
        );
        Ok(ToolOutput::text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use deploywatch_core::ToolOutcome;

    #[test]
    fn test_every_knowledge_base_pattern_compiles() {
        assert_eq!(compiled_patterns().len(), KNOWLEDGE_BASE.len());
    }

    #[test]
    fn test_lookup_matches_known_patterns() {
        assert_eq!(
            lookup("Deployment abc was not found").map(|e| e.title),
            Some("Deployment not found")
        );
        assert_eq!(
            lookup("HTTP 401 Unauthorized").map(|e| e.title),
            Some("API authentication error")
        );
        assert_eq!(
            lookup("request timed out after 30s").map(|e| e.title),
            Some("Timeout error")
        );
        assert!(lookup("something completely different").is_none());
    }

    #[test]
    fn test_lookup_order_prefers_earlier_entries() {
        // "404" appears before the timeout pattern in the knowledge base,
        // so a message matching both resolves to the first entry.
        assert_eq!(
            lookup("404 after the request timed out").map(|e| e.title),
            Some("Deployment not found")
        );
    }

    #[tokio::test]
    async fn test_suggest_resolution_known_error() {
        let tool = SuggestErrorResolutionTool::new();
        let out = tool
            .execute(json!({
                "error_message": "rate limit exceeded",
                "deployment_id": "d1",
            }))
            .await
            .unwrap();
        let text = out.as_text();
        assert!(text.contains("[MEDIUM] **Rate limit exceeded**"));
        assert!(text.contains("backoff strategy"));
        assert!(text.contains("**Deployment ID**: d1"));
    }

    #[tokio::test]
    async fn test_suggest_resolution_unknown_error() {
        let tool = SuggestErrorResolutionTool::new();
        let out = tool
            .execute(json!({"error_message": "flux capacitor misaligned"}))
            .await
            .unwrap();
        let text = out.as_text();
        assert!(text.contains("did not match any known pattern"));
        assert!(text.contains("Deployment ID: N/A"));
    }

    #[tokio::test]
    async fn test_error_history_digest() {
        let log = Arc::new(ActivityLog::new());
        for _ in 0..3 {
            log.record("d1", "alice", "analyze_errors", "q", ToolOutcome::failed("timeout"));
        }
        log.record("d1", "bob", "analyze_errors", "q", ToolOutcome::failed("schema mismatch"));
        log.record("d1", "bob", "analyze_errors", "q", ToolOutcome::Succeeded);

        let tool = ErrorResolutionHistoryTool::new(log);
        let out = tool.execute(json!({"deployment_id": "d1"})).await.unwrap();
        let text = out.as_text();
        assert!(text.contains("**Total errors**: 4"));
        assert!(text.contains("#### 1. timeout"));
        assert!(text.contains("**Occurrences**: 3"));
        assert!(text.contains("#### 2. schema mismatch"));
    }

    #[tokio::test]
    async fn test_error_history_empty_window() {
        let tool = ErrorResolutionHistoryTool::new(Arc::new(ActivityLog::new()));
        let out = tool.execute(json!({"deployment_id": "d1"})).await.unwrap();
        assert!(out.as_text().contains("No errors were recorded"));
    }
}

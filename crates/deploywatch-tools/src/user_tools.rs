//! Usage reporting tools backed by the in-process activity log.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use deploywatch_core::{
    integer_property, object_schema, string_property, ActivityLog, FleetReport, TimeWindow, Tool,
    ToolOutput, ToolResult, UsageReport,
};

use crate::args;

const DEFAULT_USAGE_HOURS: u64 = 24;

/// Per-user usage statistics over a window.
pub struct UserUsageStatsTool {
    activity: Arc<ActivityLog>,
}

impl UserUsageStatsTool {
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self { activity }
    }
}

#[async_trait]
impl Tool for UserUsageStatsTool {
    fn name(&self) -> &str {
        "get_user_usage_stats"
    }

    fn description(&self) -> &str {
        "Per-user usage statistics for a deployment: request counts, error \
         rates, and each user's most used tool. Optionally narrowed to one \
         user."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                (
                    "user_id",
                    string_property("Limit the report to one user (optional)"),
                ),
                (
                    "time_range_hours",
                    integer_property("Hours to analyze, counting back from now (default 24)"),
                ),
            ],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let user_id = args::optional_str(&arguments, "user_id");
        let hours = args::int_or(&arguments, "time_range_hours", DEFAULT_USAGE_HOURS) as i64;

        let report =
            self.activity
                .user_usage(deployment_id, TimeWindow::last_hours(hours), user_id);
        let users = match report {
            UsageReport::NoData => {
                return Ok(ToolOutput::text(format!(
                    "No usage data in the last {hours} hours."
                )))
            }
            UsageReport::Users(users) => users,
        };

        let mut out = format!(
            "## User Usage Statistics\n\n\
             **Deployment ID**: {deployment_id}\n\
             **Window**: last {hours} hours\n\n\
             ### Per-user summary\n",
        );
        for user in &users {
            let _ = write!(
                out,
                "\n#### User: {}\n\
                 - **Total requests**: {}\n\
                 - **Errors**: {}\n\
                 - **Error rate**: {:.1}%\n\
                 - **Most used tool**: {}\n",
                user.user_id,
                user.total_requests,
                user.errors,
                user.error_rate * 100.0,
                user.most_used_tool.as_deref().unwrap_or("none"),
            );
        }
        Ok(ToolOutput::text(out))
    }
}

/// Fleet-wide usage summary over a window.
pub struct AllUsersSummaryTool {
    activity: Arc<ActivityLog>,
}

impl AllUsersSummaryTool {
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self { activity }
    }
}

#[async_trait]
impl Tool for AllUsersSummaryTool {
    fn name(&self) -> &str {
        "get_all_users_summary"
    }

    fn description(&self) -> &str {
        "Fleet-wide usage summary for a deployment: active users, request and \
         error totals, overall error rate, and the top three tools."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                (
                    "time_range_hours",
                    integer_property("Hours to analyze, counting back from now (default 24)"),
                ),
            ],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let hours = args::int_or(&arguments, "time_range_hours", DEFAULT_USAGE_HOURS) as i64;

        let report = self
            .activity
            .fleet_summary(deployment_id, TimeWindow::last_hours(hours));
        let summary = match report {
            FleetReport::NoData => {
                return Ok(ToolOutput::text(format!(
                    "No usage data in the last {hours} hours."
                )))
            }
            FleetReport::Summary(summary) => summary,
        };

        let mut out = format!(
            "## All Users Summary\n\n\
             **Deployment ID**: {deployment_id}\n\
             **Window**: last {hours} hours\n\n\
             ### Overall statistics\n\
             - **Active users**: {}\n\
             - **Total requests**: {}\n\
             - **Total errors**: {}\n\
             - **Overall error rate**: {:.1}%\n\n\
             ### Top 3 tools\n",
            summary.active_users,
            summary.total_requests,
            summary.total_errors,
            summary.error_rate * 100.0,
        );
        for (i, tool) in summary.top_tools.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}**: {} call(s) ({:.1}%)",
                i + 1,
                tool.tool_name,
                tool.count,
                tool.share * 100.0,
            );
        }
        if summary.top_tools.is_empty() {
            out.push_str("no data\n");
        }
        Ok(ToolOutput::text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use deploywatch_core::ToolOutcome;

    fn seeded_log() -> Arc<ActivityLog> {
        let log = ActivityLog::new();
        for _ in 0..3 {
            log.record("d1", "alice", "get_service_health", "health?", ToolOutcome::Succeeded);
        }
        log.record(
            "d1",
            "alice",
            "analyze_errors",
            "errors?",
            ToolOutcome::failed("boom"),
        );
        log.record("d1", "bob", "analyze_errors", "errors?", ToolOutcome::Succeeded);
        Arc::new(log)
    }

    #[tokio::test]
    async fn test_user_usage_report() {
        let tool = UserUsageStatsTool::new(seeded_log());
        let out = tool.execute(json!({"deployment_id": "d1"})).await.unwrap();
        let text = out.as_text();
        assert!(text.contains("#### User: alice"));
        assert!(text.contains("**Total requests**: 4"));
        assert!(text.contains("**Error rate**: 25.0%"));
        assert!(text.contains("**Most used tool**: get_service_health"));
        assert!(text.contains("#### User: bob"));
    }

    #[tokio::test]
    async fn test_user_usage_single_user_filter() {
        let tool = UserUsageStatsTool::new(seeded_log());
        let out = tool
            .execute(json!({"deployment_id": "d1", "user_id": "bob"}))
            .await
            .unwrap();
        let text = out.as_text();
        assert!(text.contains("#### User: bob"));
        assert!(!text.contains("alice"));
    }

    #[tokio::test]
    async fn test_usage_no_data_sentinel_message() {
        let tool = UserUsageStatsTool::new(Arc::new(ActivityLog::new()));
        let out = tool.execute(json!({"deployment_id": "d1"})).await.unwrap();
        assert_eq!(out.as_text(), "No usage data in the last 24 hours.");
    }

    #[tokio::test]
    async fn test_all_users_summary() {
        let tool = AllUsersSummaryTool::new(seeded_log());
        let out = tool
            .execute(json!({"deployment_id": "d1", "time_range_hours": 48}))
            .await
            .unwrap();
        let text = out.as_text();
        assert!(text.contains("**Active users**: 2"));
        assert!(text.contains("**Total requests**: 5"));
        assert!(text.contains("**Overall error rate**: 20.0%"));
        assert!(text.contains("1. **get_service_health**: 3 call(s) (60.0%)"));
        assert!(text.contains("2. **analyze_errors**: 2 call(s) (40.0%)"));
    }
}

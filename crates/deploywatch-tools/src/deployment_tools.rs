//! Deployment discovery, health, trace, and diagnosis tools.
//!
//! Each tool wraps one read-only platform lookup and renders the result
//! as markdown (or JSON where the agent needs to parse it back).

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use deploywatch_core::{
    integer_property, object_schema, resolve, string_property, ResolutionResult, Tool, ToolOutput,
    ToolResult,
};
use deploywatch_platform::{DynPlatformClient, ServiceStats};

use crate::args;

const DEFAULT_LIST_LIMIT: u64 = 20;
const DEFAULT_TRACE_LIMIT: u64 = 10;
const DEFAULT_WINDOW_HOURS: u64 = 24;

fn fmt_ms(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0}ms"),
        None => "N/A".to_string(),
    }
}

/// List deployments the credential can see, optionally filtered.
pub struct ListDeploymentsTool {
    platform: DynPlatformClient,
}

impl ListDeploymentsTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for ListDeploymentsTool {
    fn name(&self) -> &str {
        "list_deployments"
    }

    fn description(&self) -> &str {
        "List accessible deployments with their IDs, labels, and statuses. \
         Supports an optional substring search over label and description."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                (
                    "search",
                    string_property("Substring to match against label or description"),
                ),
                ("limit", integer_property("Maximum rows to return (default 20)")),
            ],
            &[],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let search = args::optional_str(&arguments, "search").map(str::to_lowercase);
        let limit = args::int_or(&arguments, "limit", DEFAULT_LIST_LIMIT) as usize;

        let mut deployments = match self.platform.list_deployments().await {
            Ok(list) => list,
            Err(e) => return Ok(ToolOutput::error(format!("failed to list deployments: {e}"))),
        };
        if let Some(needle) = &search {
            deployments.retain(|d| {
                d.label
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(needle)
                    || d.description
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(needle)
            });
        }
        deployments.truncate(limit);

        if deployments.is_empty() {
            return Ok(ToolOutput::text(match &search {
                Some(needle) => format!("No deployments match \"{needle}\"."),
                None => "No deployments are accessible.".to_string(),
            }));
        }

        let mut report = String::from("## Deployments\n\n");
        match &search {
            Some(needle) => {
                let _ = writeln!(
                    report,
                    "Showing {} deployment(s) (search: \"{needle}\")\n",
                    deployments.len()
                );
            }
            None => {
                let _ = writeln!(report, "Showing {} deployment(s)\n", deployments.len());
            }
        }
        report.push_str("| # | Label | Deployment ID | Status |\n");
        report.push_str("|---|-------|---------------|--------|\n");
        for (i, d) in deployments.iter().enumerate() {
            let _ = writeln!(
                report,
                "| {} | {} | `{}` | {} |",
                i + 1,
                d.label.as_deref().unwrap_or("N/A"),
                d.id,
                d.status.as_deref().unwrap_or("N/A"),
            );
        }
        report.push_str(
            "\n**Tip**: use the deployment ID with `get_deployment_overview` or \
             `diagnose_deployment_issues` for details.",
        );
        Ok(ToolOutput::text(report))
    }
}

/// Resolve a human-readable deployment name to an ID.
pub struct FindDeploymentTool {
    platform: DynPlatformClient,
}

impl FindDeploymentTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for FindDeploymentTool {
    fn name(&self) -> &str {
        "find_deployment_by_name"
    }

    fn description(&self) -> &str {
        "Resolve a deployment name (label) to its deployment ID. Exact matches \
         win over partial matches; multiple candidates are returned for the \
         user to choose from. Call this before other tools whenever the user \
         referred to a deployment by name."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[(
                "deployment_name",
                string_property("Deployment name to resolve, matched case-insensitively"),
            )],
            &["deployment_name"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let name = args::required_str(&arguments, "deployment_name")?;
        let deployments = match self.platform.list_deployments().await {
            Ok(list) => list,
            Err(e) => return Ok(ToolOutput::error(format!("failed to list deployments: {e}"))),
        };

        let output = match resolve(name, &deployments) {
            ResolutionResult::Exact { deployment } => ToolOutput::success(json!({
                "match_type": "exact",
                "deployment_id": deployment.id,
                "label": deployment.label,
                "status": deployment.status,
                "description": deployment.description,
            })),
            ResolutionResult::Partial { deployment } => ToolOutput::success(json!({
                "match_type": "partial",
                "deployment_id": deployment.id,
                "label": deployment.label,
                "status": deployment.status,
                "description": deployment.description,
            })),
            ResolutionResult::Multiple { candidates } => ToolOutput::success(json!({
                "match_type": "multiple",
                "message": format!(
                    "\"{name}\" matched several deployments. Which one should be used?"
                ),
                "candidates": candidates
                    .iter()
                    .map(|d| json!({
                        "deployment_id": d.id,
                        "label": d.label,
                        "status": d.status,
                    }))
                    .collect::<Vec<_>>(),
            })),
            ResolutionResult::NoMatch => ToolOutput::text(format!(
                "No deployment matches \"{name}\".\nUse `list_deployments` to see what is available."
            )),
        };
        Ok(output)
    }
}

/// Overview detail for one deployment, as JSON.
pub struct DeploymentOverviewTool {
    platform: DynPlatformClient,
}

impl DeploymentOverviewTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for DeploymentOverviewTool {
    fn name(&self) -> &str {
        "get_deployment_overview"
    }

    fn description(&self) -> &str {
        "Fetch the overview of one deployment: label, status, model and target \
         type, prediction environment, creation time, and importance."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[("deployment_id", string_property("Deployment ID"))],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        Ok(ToolOutput::success(json!({
            "deployment_id": deployment.id,
            "label": deployment.label,
            "status": deployment.status,
            "description": deployment.description,
            "model_type": deployment.model_type,
            "target_type": deployment.target_type,
            "prediction_environment_url": deployment.prediction_environment_url,
            "created_at": deployment.created_at.map(|t| t.to_rfc3339()),
            "importance": deployment.importance,
        })))
    }
}

/// Service health statistics over a window.
pub struct ServiceHealthTool {
    platform: DynPlatformClient,
}

impl ServiceHealthTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for ServiceHealthTool {
    fn name(&self) -> &str {
        "get_service_health"
    }

    fn description(&self) -> &str {
        "Service health statistics for a deployment over a window: request and \
         error counts, success rate, latency, and error breakdown. The window \
         defaults to the last 24 hours."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                (
                    "start_time",
                    string_property("Window start, RFC 3339 (default: end minus 24h)"),
                ),
                (
                    "end_time",
                    string_property("Window end, RFC 3339 (default: now)"),
                ),
            ],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let end = args::optional_timestamp(&arguments, "end_time")?.unwrap_or_else(Utc::now);
        let start = args::optional_timestamp(&arguments, "start_time")?
            .unwrap_or_else(|| end - Duration::hours(DEFAULT_WINDOW_HOURS as i64));

        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        let stats = match self.platform.service_stats(deployment_id, start, end).await {
            Ok(s) => s,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch service stats for {deployment_id}: {e}"
                )))
            }
        };

        let report = format!(
            "## Service Health: {}\n\n\
             ### Window\n\
             - **Start**: {}\n\
             - **End**: {}\n\n\
             ### Requests\n\
             - **Total requests**: {}\n\
             - **Errors**: {}\n\
             - **Success rate**: {:.2}%\n\n\
             ### Performance\n\
             - **Average response time**: {}\n\
             - **P95 response time**: {}\n\
             - **Max response time**: {}\n\n\
             ### Error breakdown\n\
             - **Data errors**: {}\n\
             - **System errors**: {}",
            deployment.display_label(),
            start.format("%Y-%m-%d %H:%M:%S UTC"),
            end.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.total_requests,
            stats.total_errors,
            stats.success_rate_pct(),
            fmt_ms(stats.avg_response_time),
            fmt_ms(stats.p95_response_time),
            fmt_ms(stats.max_response_time),
            stats.data_errors,
            stats.system_errors,
        );
        Ok(ToolOutput::text(report))
    }
}

/// Recent trace listing for agentic deployments.
pub struct RecentTracesTool {
    platform: DynPlatformClient,
}

impl RecentTracesTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for RecentTracesTool {
    fn name(&self) -> &str {
        "get_recent_traces"
    }

    fn description(&self) -> &str {
        "Most recent execution traces for an agentic deployment, newest first, \
         optionally filtered by status (success, error, all)."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                ("limit", integer_property("Traces to return, 1-100 (default 10)")),
                (
                    "filter_status",
                    string_property("Status filter: \"success\", \"error\", or \"all\""),
                ),
            ],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let limit = args::int_or(&arguments, "limit", DEFAULT_TRACE_LIMIT).clamp(1, 100) as usize;
        let filter_status = args::optional_str(&arguments, "filter_status");

        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        let traces = match self
            .platform
            .recent_traces(deployment_id, limit, filter_status)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch traces for {deployment_id}: {e}"
                )))
            }
        };

        let mut report = format!(
            "## Recent Traces: {}\n\nReturned: {} trace(s)\nFilter: {}\n\n\
             ### Traces\n\n\
             | Trace ID | Timestamp | Status | Duration | Tools |\n\
             |----------|-----------|--------|----------|-------|\n",
            deployment.display_label(),
            traces.len(),
            filter_status.unwrap_or("all"),
        );
        if traces.is_empty() {
            report.push_str("| - | - | - | - | no data |\n");
        }
        for trace in &traces {
            // Long trace IDs are shown truncated to keep the table narrow.
            // Count characters, not bytes: trace IDs are opaque and may
            // contain multibyte text.
            let display_id = if trace.trace_id.chars().count() > 16 {
                format!("{}...", trace.trace_id.chars().take(16).collect::<String>())
            } else {
                trace.trace_id.clone()
            };
            let duration = trace
                .duration_ms
                .map(|d| format!("{d}ms"))
                .unwrap_or_else(|| "N/A".to_string());
            let _ = writeln!(
                report,
                "| {display_id} | {} | {} | {duration} | {} |",
                trace.timestamp.format("%Y-%m-%d %H:%M:%S"),
                trace.status,
                trace.tools.as_deref().unwrap_or("N/A"),
            );
        }
        report.push_str("\n**Note**: use `search_trace_by_id` for the span-level detail of one trace.");
        Ok(ToolOutput::text(report))
    }
}

/// Span-level detail of a single trace.
pub struct TraceDetailTool {
    platform: DynPlatformClient,
}

impl TraceDetailTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for TraceDetailTool {
    fn name(&self) -> &str {
        "search_trace_by_id"
    }

    fn description(&self) -> &str {
        "Span-level detail for one trace: the span hierarchy, per-span timing \
         and status, and error messages where spans failed."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                ("trace_id", string_property("Trace ID")),
            ],
            &["deployment_id", "trace_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let trace_id = args::required_str(&arguments, "trace_id")?;

        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        let spans = match self.platform.trace_detail(deployment_id, trace_id).await {
            Ok(s) => s,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch trace {trace_id}: {e}"
                )))
            }
        };

        let mut report = format!(
            "## Trace Detail\n\n**Trace ID**: `{trace_id}`\n**Deployment**: {}\n",
            deployment.display_label(),
        );
        if spans.is_empty() {
            report.push_str("\nNo span data was found for this trace.\n");
            return Ok(ToolOutput::text(report));
        }

        report.push_str("\n### Span hierarchy\n\n```\n");
        for span in &spans {
            let indent = "  ".repeat(span.depth as usize);
            let prefix = if span.depth > 0 { "├─ " } else { "" };
            let duration = span
                .duration_ms
                .map(|d| format!("{d}ms"))
                .unwrap_or_else(|| "N/A".to_string());
            let _ = writeln!(report, "{indent}{prefix}{} [{duration}]", span.name);
        }
        report.push_str("```\n");

        report.push_str("\n### Span metrics\n\n| Span | Duration | Status |\n|------|----------|--------|\n");
        for span in &spans {
            let duration = span
                .duration_ms
                .map(|d| format!("{d}ms"))
                .unwrap_or_else(|| "N/A".to_string());
            let _ = writeln!(report, "| {} | {duration} | {} |", span.name, span.status);
        }

        let failed: Vec<_> = spans.iter().filter(|s| s.is_error()).collect();
        if !failed.is_empty() {
            report.push_str("\n### Errors\n\n");
            for span in failed {
                let _ = writeln!(
                    report,
                    "- **{}**: {}",
                    span.name,
                    span.error_message.as_deref().unwrap_or("no error detail"),
                );
            }
        }
        Ok(ToolOutput::text(report))
    }
}

/// Error pattern and frequency analysis.
pub struct AnalyzeErrorsTool {
    platform: DynPlatformClient,
}

impl AnalyzeErrorsTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for AnalyzeErrorsTool {
    fn name(&self) -> &str {
        "analyze_errors"
    }

    fn description(&self) -> &str {
        "Analyze a deployment's errors over a window: totals, error rate, the \
         data/system split, and a recommended response keyed to severity."
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
        let hours = args::int_or(&arguments, "time_range_hours", DEFAULT_WINDOW_HOURS) as i64;
        let end = Utc::now();
        let start = end - Duration::hours(hours);

        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        let stats = match self.platform.service_stats(deployment_id, start, end).await {
            Ok(s) => s,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch service stats for {deployment_id}: {e}"
                )))
            }
        };

        let error_rate = stats.error_rate_pct();
        let data_error_pct = share_of(stats.data_errors, stats.total_errors);
        let system_error_pct = share_of(stats.system_errors, stats.total_errors);

        let mut report = format!(
            "## Error Analysis: {}\n\n\
             ### Window\n\
             - **Last {hours} hours**\n\
             - {} - {} UTC\n\n\
             ### Summary\n\
             - **Total requests**: {}\n\
             - **Total errors**: {}\n\
             - **Error rate**: {error_rate:.2}%\n\n\
             ### Error breakdown\n\
             - **Data errors**: {} ({data_error_pct:.1}%)\n\
             - **System errors**: {} ({system_error_pct:.1}%)\n\n\
             ### Recommended actions\n",
            deployment.display_label(),
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M"),
            stats.total_requests,
            stats.total_errors,
            stats.data_errors,
            stats.system_errors,
        );

        if error_rate > 10.0 {
            report.push_str(
                "**High error rate detected** - urgent response needed\n\
                 - Check the system logs\n\
                 - Review recent deployment changes\n",
            );
        } else if error_rate > 5.0 {
            report.push_str(
                "**Moderate error rate** - tighten monitoring\n\
                 - Analyze the error patterns in detail\n",
            );
        } else if stats.total_errors > 0 {
            report.push_str(
                "**Low error rate** - within normal bounds, keep watching\n\
                 - Review the error contents periodically\n",
            );
        } else {
            report.push_str("**No errors** - the deployment is operating normally\n");
        }
        Ok(ToolOutput::text(report))
    }
}

fn share_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Latency and throughput metrics.
pub struct PerformanceMetricsTool {
    platform: DynPlatformClient,
}

impl PerformanceMetricsTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Tool for PerformanceMetricsTool {
    fn name(&self) -> &str {
        "get_performance_metrics"
    }

    fn description(&self) -> &str {
        "Latency percentiles and throughput for a deployment over a window, \
         with a recommendation keyed to the average latency."
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
        let hours = args::int_or(&arguments, "time_range_hours", DEFAULT_WINDOW_HOURS).max(1) as i64;
        let end = Utc::now();
        let start = end - Duration::hours(hours);

        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        let stats = match self.platform.service_stats(deployment_id, start, end).await {
            Ok(s) => s,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch service stats for {deployment_id}: {e}"
                )))
            }
        };

        let mut report = format!(
            "## Performance Metrics: {}\n\n\
             ### Window\n\
             - **Last {hours} hours**\n\n\
             ### Latency\n\
             - **Average**: {}\n\
             - **Median (P50)**: {}\n\
             - **P95**: {}\n\
             - **P99**: {}\n\
             - **Max**: {}\n\n\
             ### Throughput\n\
             - **Total requests**: {}\n\
             - **Average requests/hour**: {:.1}\n\n\
             ### Recommendations\n",
            deployment.display_label(),
            fmt_ms(stats.avg_response_time),
            fmt_ms(stats.p50_response_time),
            fmt_ms(stats.p95_response_time),
            fmt_ms(stats.p99_response_time),
            fmt_ms(stats.max_response_time),
            stats.total_requests,
            stats.total_requests as f64 / hours as f64,
        );

        match stats.avg_response_time {
            Some(avg) if avg > 10_000.0 => report.push_str(
                "**High latency detected** - optimization needed\n\
                 - Consider a different LLM model\n\
                 - Consider parallelizing tool calls\n",
            ),
            Some(avg) if avg > 5_000.0 => {
                report.push_str("**Latency somewhat elevated** - keep monitoring\n")
            }
            _ => report.push_str("**Good performance**\n"),
        }
        Ok(ToolOutput::text(report))
    }
}

/// Automatic issue diagnosis with a health score.
pub struct DiagnoseDeploymentTool {
    platform: DynPlatformClient,
}

impl DiagnoseDeploymentTool {
    pub fn new(platform: DynPlatformClient) -> Self {
        Self { platform }
    }
}

struct Issue {
    severity: &'static str,
    issue: String,
    impact: &'static str,
    action: &'static str,
}

#[async_trait]
impl Tool for DiagnoseDeploymentTool {
    fn name(&self) -> &str {
        "diagnose_deployment_issues"
    }

    fn description(&self) -> &str {
        "Run an automatic diagnosis over the last 24 hours: detected issues \
         with severity, a 0-100 health score, and suggested next steps."
    }

    fn parameters(&self) -> Value {
        object_schema(
            &[("deployment_id", string_property("Deployment ID"))],
            &["deployment_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> ToolResult<ToolOutput> {
        let deployment_id = args::required_str(&arguments, "deployment_id")?;
        let end = Utc::now();
        let start = end - Duration::hours(DEFAULT_WINDOW_HOURS as i64);

        let deployment = match self.platform.get_deployment(deployment_id).await {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch deployment {deployment_id}: {e}"
                )))
            }
        };
        let stats = match self.platform.service_stats(deployment_id, start, end).await {
            Ok(s) => s,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to fetch service stats for {deployment_id}: {e}"
                )))
            }
        };

        let (issues, health_score) = diagnose(&stats, deployment.status.as_deref());

        let health_status = if health_score >= 90 {
            "good"
        } else if health_score >= 70 {
            "attention"
        } else if health_score >= 50 {
            "warning"
        } else {
            "critical"
        };

        let mut report = format!(
            "## Deployment Diagnosis\n\n\
             **Deployment**: {}\n\
             **Deployment ID**: {deployment_id}\n\
             **Diagnosed at**: {} UTC\n\n\
             ### Health score\n\
             **{health_score}/100** - {health_status}\n\n",
            deployment.display_label(),
            end.format("%Y-%m-%d %H:%M:%S"),
        );

        if issues.is_empty() {
            report.push_str(
                "### No issues detected\n\n\
                 The deployment is operating normally. Continued monitoring is recommended.\n",
            );
        } else {
            report.push_str("### Detected issues\n\n");
            for (i, issue) in issues.iter().enumerate() {
                let _ = writeln!(
                    report,
                    "[{}] **Issue {}: {}**\n\
                     - **Severity**: {}\n\
                     - **Impact**: {}\n\
                     - **Suggested action**: {}\n",
                    issue.severity.to_uppercase(),
                    i + 1,
                    issue.issue,
                    issue.severity.to_uppercase(),
                    issue.impact,
                    issue.action,
                );
            }
        }

        let _ = write!(
            report,
            "\n### Summary statistics (last 24 hours)\n\
             - **Total requests**: {}\n\
             - **Errors**: {}\n\
             - **Error rate**: {:.2}%\n\
             - **Average response time**: {}\n\n\
             ### Next steps\n",
            stats.total_requests,
            stats.total_errors,
            stats.error_rate_pct(),
            fmt_ms(stats.avg_response_time),
        );
        if health_score < 70 {
            report.push_str(
                "1. Urgent: address the detected issues\n\
                 2. Use `analyze_errors` for the error details\n\
                 3. Use `get_recent_traces` to inspect recent runs\n",
            );
        } else {
            report.push_str(
                "1. Keep up continuous monitoring\n\
                 2. Run `diagnose_deployment_issues` periodically to confirm health\n",
            );
        }
        Ok(ToolOutput::text(report))
    }
}

/// Score the deployment: start at 100 and deduct per detected issue.
fn diagnose(stats: &ServiceStats, status: Option<&str>) -> (Vec<Issue>, i32) {
    let mut issues = Vec::new();
    let mut health_score = 100i32;

    let error_rate = stats.error_rate_pct();
    if error_rate > 10.0 {
        issues.push(Issue {
            severity: "critical",
            issue: format!("high error rate ({error_rate:.1}%)"),
            impact: "a large share of user requests is failing",
            action: "check the error logs and identify the cause",
        });
        health_score -= 30;
    } else if error_rate > 5.0 {
        issues.push(Issue {
            severity: "high",
            issue: format!("moderate error rate ({error_rate:.1}%)"),
            impact: "some user requests are failing",
            action: "analyze the error patterns",
        });
        health_score -= 15;
    }

    if let Some(avg) = stats.avg_response_time {
        if avg > 10_000.0 {
            issues.push(Issue {
                severity: "high",
                issue: format!("high latency (average {avg:.0}ms)"),
                impact: "user experience is severely degraded",
                action: "performance optimization is needed",
            });
            health_score -= 20;
        } else if avg > 5_000.0 {
            issues.push(Issue {
                severity: "medium",
                issue: format!("somewhat high latency (average {avg:.0}ms)"),
                impact: "user experience may be degraded",
                action: "monitor performance",
            });
            health_score -= 10;
        }
    }

    if status != Some("active") {
        issues.push(Issue {
            severity: "critical",
            issue: format!("abnormal deployment status ({})", status.unwrap_or("unknown")),
            impact: "the deployment is not operating normally",
            action: "check the deployment configuration",
        });
        health_score -= 40;
    }

    (issues, health_score.max(0))
}

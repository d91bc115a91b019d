//! In-process activity log with time-windowed retention and aggregation.
//!
//! Every completed tool invocation is recorded here by the dispatch layer.
//! The log keeps at most seven days of history (pruned on every append) and
//! answers windowed aggregate queries: per-user usage statistics, a
//! fleet-wide summary, and an error-history digest.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Retention horizon in days. Events older than this are discarded on append.
pub const RETENTION_DAYS: i64 = 7;

/// How many tools the fleet summary ranks.
const TOP_TOOLS: usize = 3;

/// How many error groups the digest reports.
const TOP_ERRORS: usize = 5;

/// Label used for failed events that carry no error message.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Outcome of a tool invocation.
///
/// A failed invocation may carry an error message; a successful one never
/// does, so the "message only when failed" invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Succeeded,
    Failed { message: Option<String> },
}

impl ToolOutcome {
    /// Create a failed outcome with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: Some(message.into()),
        }
    }

    /// Whether this outcome is a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The error message, if this is a failure that carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => message.as_deref(),
            Self::Succeeded => None,
        }
    }
}

/// One record per tool invocation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// When the invocation completed (assigned at append time, UTC).
    pub timestamp: DateTime<Utc>,
    /// Target deployment (opaque identifier supplied by the caller).
    pub deployment_id: String,
    /// Invoking user.
    pub user_id: String,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Original free-text request, kept for audit only.
    pub query: String,
    /// Whether the invocation succeeded or failed.
    pub outcome: ToolOutcome,
}

/// An inclusive query window `[start, end]`.
///
/// A window with `start > end` is not an error; it simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window covering the last `hours` hours, ending now.
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::hours(hours),
            end,
        }
    }

    fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Per-user statistics over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_requests: usize,
    pub errors: usize,
    /// Errors divided by total, 0.0 when there were no requests.
    pub error_rate: f64,
    /// The most frequently used tool. Ties resolve to the tool seen first.
    pub most_used_tool: Option<String>,
}

/// Result of a per-user usage query.
///
/// `NoData` is distinct from a report over a window that merely contained
/// zero errors, so callers can render an explicit "no data" message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageReport {
    NoData,
    Users(Vec<UserStats>),
}

/// A tool's share of all invocations in a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub tool_name: String,
    pub count: usize,
    /// Fraction of total invocations, in `[0, 1]`.
    pub share: f64,
}

/// Fleet-wide aggregate over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub active_users: usize,
    pub total_requests: usize,
    pub total_errors: usize,
    pub error_rate: f64,
    /// Top tools by invocation count, ties in first-seen order.
    pub top_tools: Vec<ToolUsage>,
}

/// Result of a fleet-wide summary query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FleetReport {
    NoData,
    Summary(FleetSummary),
}

/// One group of failures sharing an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorGroup {
    pub message: String,
    pub count: usize,
    /// Number of distinct users that hit this error.
    pub affected_users: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Result of an error-history query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorHistory {
    NoErrors,
    Digest {
        total_errors: usize,
        /// Top groups by occurrence count, descending.
        groups: Vec<ErrorGroup>,
    },
}

/// Process-wide store of tool-invocation events.
///
/// One instance per process, shared via `Arc` and injected into the tool
/// dispatch layer. The internal lock makes append and query safe under
/// multi-threaded hosts; reporting operations work on a snapshot and never
/// hand out mutable access to stored events.
#[derive(Debug, Default)]
pub struct ActivityLog {
    events: RwLock<Vec<ActivityEvent>>,
}

impl ActivityLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed tool invocation, stamped with the current UTC time.
    ///
    /// As a side effect, prunes every event older than the retention
    /// horizon, so the log's staleness is bounded on every append.
    pub fn record(
        &self,
        deployment_id: &str,
        user_id: &str,
        tool_name: &str,
        query: &str,
        outcome: ToolOutcome,
    ) {
        self.record_at(Utc::now(), deployment_id, user_id, tool_name, query, outcome);
    }

    /// Record with an explicit timestamp.
    ///
    /// Retention is applied relative to `timestamp`, which also makes
    /// pruning deterministic for historical backfill and tests. Callers
    /// must supply non-decreasing timestamps to preserve the append-order
    /// == chronological-order guarantee that `query` relies on.
    pub fn record_at(
        &self,
        timestamp: DateTime<Utc>,
        deployment_id: &str,
        user_id: &str,
        tool_name: &str,
        query: &str,
        outcome: ToolOutcome,
    ) {
        let mut events = self.events.write();
        events.push(ActivityEvent {
            timestamp,
            deployment_id: deployment_id.to_string(),
            user_id: user_id.to_string(),
            tool_name: tool_name.to_string(),
            query: query.to_string(),
            outcome,
        });
        let cutoff = timestamp - Duration::days(RETENTION_DAYS);
        let before = events.len();
        events.retain(|e| e.timestamp > cutoff);
        let pruned = before - events.len();
        if pruned > 0 {
            debug!(pruned, retained = events.len(), "pruned expired activity events");
        }
    }

    /// Snapshot the events matching a deployment, window, and optional user.
    ///
    /// Results keep insertion order, which under normal operation is also
    /// chronological order.
    pub fn query(
        &self,
        deployment_id: &str,
        window: TimeWindow,
        user_id: Option<&str>,
    ) -> Vec<ActivityEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| {
                e.deployment_id == deployment_id
                    && window.contains(e.timestamp)
                    && user_id.is_none_or(|u| e.user_id == u)
            })
            .cloned()
            .collect()
    }

    /// Number of events currently retained, across all deployments.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Per-user usage statistics over a window.
    pub fn user_usage(
        &self,
        deployment_id: &str,
        window: TimeWindow,
        user_id: Option<&str>,
    ) -> UsageReport {
        let events = self.query(deployment_id, window, user_id);
        if events.is_empty() {
            return UsageReport::NoData;
        }

        struct Acc {
            total: usize,
            errors: usize,
            // (tool, count) in first-seen order, so count ties resolve
            // deterministically to the earliest tool.
            tools: Vec<(String, usize)>,
        }

        let mut order: Vec<String> = Vec::new();
        let mut by_user: HashMap<String, Acc> = HashMap::new();
        for event in &events {
            let acc = by_user.entry(event.user_id.clone()).or_insert_with(|| {
                order.push(event.user_id.clone());
                Acc {
                    total: 0,
                    errors: 0,
                    tools: Vec::new(),
                }
            });
            acc.total += 1;
            if event.outcome.is_error() {
                acc.errors += 1;
            }
            match acc.tools.iter_mut().find(|(t, _)| *t == event.tool_name) {
                Some((_, n)) => *n += 1,
                None => acc.tools.push((event.tool_name.clone(), 1)),
            }
        }

        let users = order
            .into_iter()
            .map(|uid| {
                let acc = by_user.remove(&uid).expect("user accumulated above");
                let most_used_tool = most_frequent(&acc.tools);
                UserStats {
                    user_id: uid,
                    total_requests: acc.total,
                    errors: acc.errors,
                    error_rate: rate(acc.errors, acc.total),
                    most_used_tool,
                }
            })
            .collect();
        UsageReport::Users(users)
    }

    /// Fleet-wide summary over a window.
    pub fn fleet_summary(&self, deployment_id: &str, window: TimeWindow) -> FleetReport {
        let events = self.query(deployment_id, window, None);
        if events.is_empty() {
            return FleetReport::NoData;
        }

        let total_requests = events.len();
        let total_errors = events.iter().filter(|e| e.outcome.is_error()).count();
        let active_users = events
            .iter()
            .map(|e| e.user_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut tool_counts: Vec<(String, usize)> = Vec::new();
        for event in &events {
            match tool_counts.iter_mut().find(|(t, _)| *t == event.tool_name) {
                Some((_, n)) => *n += 1,
                None => tool_counts.push((event.tool_name.clone(), 1)),
            }
        }
        // Stable sort: ties stay in first-seen order.
        tool_counts.sort_by(|a, b| b.1.cmp(&a.1));
        tool_counts.truncate(TOP_TOOLS);
        let top_tools = tool_counts
            .into_iter()
            .map(|(tool_name, count)| ToolUsage {
                tool_name,
                count,
                share: rate(count, total_requests),
            })
            .collect();

        FleetReport::Summary(FleetSummary {
            active_users,
            total_requests,
            total_errors,
            error_rate: rate(total_errors, total_requests),
            top_tools,
        })
    }

    /// Error-history digest over a window: failed events grouped by message,
    /// top groups by occurrence count.
    pub fn error_digest(&self, deployment_id: &str, window: TimeWindow) -> ErrorHistory {
        let failures: Vec<ActivityEvent> = self
            .query(deployment_id, window, None)
            .into_iter()
            .filter(|e| e.outcome.is_error())
            .collect();
        if failures.is_empty() {
            return ErrorHistory::NoErrors;
        }

        struct Group {
            count: usize,
            users: HashSet<String>,
            first_seen: DateTime<Utc>,
            last_seen: DateTime<Utc>,
        }

        let mut order: Vec<String> = Vec::new();
        let mut by_message: HashMap<String, Group> = HashMap::new();
        for event in &failures {
            let message = event.outcome.message().unwrap_or(UNKNOWN_ERROR).to_string();
            let group = by_message.entry(message.clone()).or_insert_with(|| {
                order.push(message);
                Group {
                    count: 0,
                    users: HashSet::new(),
                    first_seen: event.timestamp,
                    last_seen: event.timestamp,
                }
            });
            group.count += 1;
            group.users.insert(event.user_id.clone());
            if event.timestamp < group.first_seen {
                group.first_seen = event.timestamp;
            }
            if event.timestamp > group.last_seen {
                group.last_seen = event.timestamp;
            }
        }

        let mut groups: Vec<ErrorGroup> = order
            .into_iter()
            .map(|message| {
                let g = by_message.remove(&message).expect("group accumulated above");
                ErrorGroup {
                    message,
                    count: g.count,
                    affected_users: g.users.len(),
                    first_seen: g.first_seen,
                    last_seen: g.last_seen,
                }
            })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups.truncate(TOP_ERRORS);

        ErrorHistory::Digest {
            total_errors: failures.len(),
            groups,
        }
    }
}

/// Fraction `part / whole`, 0.0 when `whole` is zero.
fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// The entry with the highest count; ties go to the earliest entry.
fn most_frequent(counts: &[(String, usize)]) -> Option<String> {
    let mut best: Option<&(String, usize)> = None;
    for entry in counts {
        // Strictly-greater comparison keeps the first max on ties.
        if best.is_none_or(|b| entry.1 > b.1) {
            best = Some(entry);
        }
    }
    best.map(|(tool, _)| tool.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEP: &str = "dep-1";

    fn ts(hours_ago: i64) -> DateTime<Utc> {
        base() - Duration::hours(hours_ago)
    }

    fn base() -> DateTime<Utc> {
        "2026-08-01T12:00:00Z".parse().unwrap()
    }

    fn window_hours(hours: i64) -> TimeWindow {
        TimeWindow::new(base() - Duration::hours(hours), base())
    }

    fn record_ok(log: &ActivityLog, at: DateTime<Utc>, user: &str, tool: &str) {
        log.record_at(at, DEP, user, tool, "q", ToolOutcome::Succeeded);
    }

    fn record_err(log: &ActivityLog, at: DateTime<Utc>, user: &str, msg: Option<&str>) {
        log.record_at(
            at,
            DEP,
            user,
            "get_service_health",
            "q",
            ToolOutcome::Failed {
                message: msg.map(String::from),
            },
        );
    }

    #[test]
    fn retention_prunes_on_every_append() {
        let log = ActivityLog::new();
        // Ten days of hourly events; after each append nothing may be older
        // than the newest timestamp minus seven days.
        let start = base() - Duration::days(10);
        for h in 0..(10 * 24) {
            let now = start + Duration::hours(h);
            record_ok(&log, now, "alice", "list_deployments");
            let cutoff = now - Duration::days(RETENTION_DAYS);
            let all = log.query(
                DEP,
                TimeWindow::new(now - Duration::days(30), now),
                None,
            );
            assert!(all.iter().all(|e| e.timestamp > cutoff));
        }
        // 7 days of hourly events remain (strictly newer than the cutoff).
        assert_eq!(log.len(), 7 * 24);
    }

    #[test]
    fn query_preserves_append_order() {
        let log = ActivityLog::new();
        for i in 0..20 {
            record_ok(&log, base() + Duration::seconds(i), "alice", &format!("tool_{i}"));
        }
        let events = log.query(
            DEP,
            TimeWindow::new(base(), base() + Duration::minutes(1)),
            None,
        );
        assert_eq!(events.len(), 20);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.tool_name, format!("tool_{i}"));
        }
    }

    #[test]
    fn query_window_is_inclusive() {
        let log = ActivityLog::new();
        record_ok(&log, ts(3), "alice", "a");
        record_ok(&log, ts(2), "alice", "b");
        record_ok(&log, ts(1), "alice", "c");
        let window = TimeWindow::new(ts(2), ts(1));
        let events = log.query(DEP, window, None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tool_name, "b");
        assert_eq!(events[1].tool_name, "c");
    }

    #[test]
    fn query_filters_deployment_and_user() {
        let log = ActivityLog::new();
        record_ok(&log, ts(1), "alice", "a");
        log.record_at(ts(1), "other-dep", "alice", "a", "q", ToolOutcome::Succeeded);
        record_ok(&log, ts(1), "bob", "b");

        assert_eq!(log.query(DEP, window_hours(2), None).len(), 2);
        let alice = log.query(DEP, window_hours(2), Some("alice"));
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].user_id, "alice");
    }

    #[test]
    fn inverted_window_yields_empty_not_error() {
        let log = ActivityLog::new();
        record_ok(&log, ts(1), "alice", "a");
        let inverted = TimeWindow::new(base(), base() - Duration::days(1));
        assert!(log.query(DEP, inverted, None).is_empty());
        assert_eq!(log.user_usage(DEP, inverted, None), UsageReport::NoData);
    }

    #[test]
    fn user_usage_counts_and_rates() {
        let log = ActivityLog::new();
        record_ok(&log, ts(4), "alice", "get_service_health");
        record_ok(&log, ts(3), "alice", "get_service_health");
        record_err(&log, ts(2), "alice", Some("boom"));
        record_ok(&log, ts(1), "bob", "analyze_errors");

        let report = log.user_usage(DEP, window_hours(5), None);
        let UsageReport::Users(users) = report else {
            panic!("expected user stats");
        };
        assert_eq!(users.len(), 2);
        // First-seen order: alice before bob.
        assert_eq!(users[0].user_id, "alice");
        assert_eq!(users[0].total_requests, 3);
        assert_eq!(users[0].errors, 1);
        assert!((users[0].error_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(users[0].most_used_tool.as_deref(), Some("get_service_health"));
        assert_eq!(users[1].user_id, "bob");
        assert_eq!(users[1].errors, 0);
        assert_eq!(users[1].error_rate, 0.0);
    }

    #[test]
    fn most_used_tool_tie_goes_to_first_seen() {
        let log = ActivityLog::new();
        record_ok(&log, ts(4), "alice", "first_tool");
        record_ok(&log, ts(3), "alice", "second_tool");
        record_ok(&log, ts(2), "alice", "second_tool");
        record_ok(&log, ts(1), "alice", "first_tool");

        let UsageReport::Users(users) = log.user_usage(DEP, window_hours(5), None) else {
            panic!("expected user stats");
        };
        assert_eq!(users[0].most_used_tool.as_deref(), Some("first_tool"));
    }

    #[test]
    fn user_usage_is_idempotent() {
        let log = ActivityLog::new();
        record_ok(&log, ts(2), "alice", "a");
        record_err(&log, ts(1), "bob", Some("x"));
        let w = window_hours(3);
        assert_eq!(log.user_usage(DEP, w, None), log.user_usage(DEP, w, None));
    }

    #[test]
    fn fleet_summary_totals_and_top_tools() {
        let log = ActivityLog::new();
        for _ in 0..4 {
            record_ok(&log, ts(5), "alice", "get_service_health");
        }
        for _ in 0..3 {
            record_ok(&log, ts(4), "bob", "analyze_errors");
        }
        for _ in 0..3 {
            record_ok(&log, ts(3), "carol", "list_deployments");
        }
        record_ok(&log, ts(2), "alice", "get_recent_traces");
        record_err(&log, ts(1), "bob", Some("boom"));

        let FleetReport::Summary(summary) = log.fleet_summary(DEP, window_hours(6)) else {
            panic!("expected summary");
        };
        assert_eq!(summary.active_users, 3);
        assert_eq!(summary.total_requests, 12);
        assert_eq!(summary.total_errors, 1);
        assert!((summary.error_rate - 1.0 / 12.0).abs() < 1e-9);
        assert_eq!(summary.top_tools.len(), 3);
        assert_eq!(summary.top_tools[0].tool_name, "get_service_health");
        assert_eq!(summary.top_tools[0].count, 4);
        assert!((summary.top_tools[0].share - 4.0 / 12.0).abs() < 1e-9);
        // analyze_errors and list_deployments tie at 3; first-seen wins.
        assert_eq!(summary.top_tools[1].tool_name, "analyze_errors");
        assert_eq!(summary.top_tools[2].tool_name, "list_deployments");
    }

    #[test]
    fn fleet_summary_no_data_sentinel() {
        let log = ActivityLog::new();
        assert_eq!(log.fleet_summary(DEP, window_hours(1)), FleetReport::NoData);
    }

    #[test]
    fn error_digest_ranks_top_five() {
        let log = ActivityLog::new();
        // Seven messages with counts 10..=4; only the five largest survive.
        for (i, count) in [10usize, 9, 8, 7, 6, 5, 4].into_iter().enumerate() {
            for _ in 0..count {
                record_err(&log, ts(1), "alice", Some(&format!("error-{i}")));
            }
        }
        let ErrorHistory::Digest { total_errors, groups } =
            log.error_digest(DEP, window_hours(2))
        else {
            panic!("expected digest");
        };
        assert_eq!(total_errors, 49);
        assert_eq!(groups.len(), 5);
        let counts: Vec<usize> = groups.iter().map(|g| g.count).collect();
        assert_eq!(counts, vec![10, 9, 8, 7, 6]);
        assert_eq!(groups[0].message, "error-0");
        assert_eq!(groups[4].message, "error-4");
    }

    #[test]
    fn error_digest_tracks_users_and_span() {
        let log = ActivityLog::new();
        record_err(&log, ts(3), "alice", Some("timeout"));
        record_err(&log, ts(2), "bob", Some("timeout"));
        record_err(&log, ts(1), "alice", Some("timeout"));

        let ErrorHistory::Digest { groups, .. } = log.error_digest(DEP, window_hours(4)) else {
            panic!("expected digest");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].affected_users, 2);
        assert_eq!(groups[0].first_seen, ts(3));
        assert_eq!(groups[0].last_seen, ts(1));
    }

    #[test]
    fn error_digest_normalizes_missing_message() {
        let log = ActivityLog::new();
        record_err(&log, ts(1), "alice", None);
        let ErrorHistory::Digest { groups, .. } = log.error_digest(DEP, window_hours(2)) else {
            panic!("expected digest");
        };
        assert_eq!(groups[0].message, UNKNOWN_ERROR);
    }

    #[test]
    fn error_digest_sentinel_distinct_from_clean_window() {
        let log = ActivityLog::new();
        record_ok(&log, ts(1), "alice", "a");
        // Events exist but none failed: still the NoErrors sentinel.
        assert_eq!(log.error_digest(DEP, window_hours(2)), ErrorHistory::NoErrors);
        // And the usage report over the same window is real data.
        assert_ne!(log.user_usage(DEP, window_hours(2), None), UsageReport::NoData);
    }

    #[test]
    fn outcome_serialization_is_tagged() {
        let failed = ToolOutcome::failed("boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "boom");
        let ok = serde_json::to_value(ToolOutcome::Succeeded).unwrap();
        assert_eq!(ok["status"], "succeeded");
    }

    #[test]
    fn shared_log_is_send_and_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<ActivityLog>();
    }
}

//! Diagnostic tool catalog for DeployWatch.
//!
//! Every tool is a read-only formatter over the platform client or the
//! activity log, implementing the core [`Tool`] trait so the agent can
//! invoke it through function calling. The [`ToolRegistry`] dispatches
//! calls and records one activity event per completed invocation.

pub mod deployment_tools;
pub mod registry;
pub mod resolution_tools;
pub mod user_tools;

mod args;

pub use deployment_tools::{
    AnalyzeErrorsTool, DeploymentOverviewTool, DiagnoseDeploymentTool, FindDeploymentTool,
    ListDeploymentsTool, PerformanceMetricsTool, RecentTracesTool, ServiceHealthTool,
    TraceDetailTool,
};
pub use registry::{InvocationContext, ToolRegistry, ToolRegistryBuilder};
pub use resolution_tools::{ErrorResolutionHistoryTool, SuggestErrorResolutionTool};
pub use user_tools::{AllUsersSummaryTool, UserUsageStatsTool};

// Re-export the trait and output types tools are built from.
pub use deploywatch_core::{DynTool, Tool, ToolDefinition, ToolError, ToolOutput};

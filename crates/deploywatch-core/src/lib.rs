//! Core traits and types for DeployWatch.
//!
//! This crate defines the foundational abstractions used across the project:
//! the activity log, the deployment name resolver, the tool trait, and the
//! unified error type.

pub mod activity;
pub mod config;
pub mod error;
pub mod resolver;
pub mod tool;

pub use activity::{
    ActivityEvent, ActivityLog, ErrorGroup, ErrorHistory, FleetReport, FleetSummary, TimeWindow,
    ToolOutcome, ToolUsage, UsageReport, UserStats, RETENTION_DAYS,
};
pub use error::{Error, Result};
pub use resolver::{resolve, DeploymentRecord, ResolutionResult, MAX_CANDIDATES};
pub use tool::{
    integer_property, object_schema, string_property, DynTool, Tool, ToolDefinition, ToolError,
    ToolOutput, ToolResult,
};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::activity::{
        ActivityEvent, ActivityLog, ErrorHistory, FleetReport, TimeWindow, ToolOutcome,
        UsageReport,
    };
    pub use crate::error::{Error, Result};
    pub use crate::resolver::{resolve, DeploymentRecord, ResolutionResult};
    pub use crate::tool::{DynTool, Tool, ToolDefinition, ToolError, ToolOutput, ToolResult};
}

//! Tool registry and tracked dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use deploywatch_core::{
    ActivityLog, DynTool, ToolDefinition, ToolError, ToolOutcome, ToolOutput, ToolResult,
};
use deploywatch_platform::DynPlatformClient;

use crate::deployment_tools::{
    AnalyzeErrorsTool, DeploymentOverviewTool, DiagnoseDeploymentTool, FindDeploymentTool,
    ListDeploymentsTool, PerformanceMetricsTool, RecentTracesTool, ServiceHealthTool,
    TraceDetailTool,
};
use crate::resolution_tools::{ErrorResolutionHistoryTool, SuggestErrorResolutionTool};
use crate::user_tools::{AllUsersSummaryTool, UserUsageStatsTool};

/// Who is asking, and what they asked. Attached to every tracked
/// invocation so the activity log can attribute usage.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub user_id: String,
    pub query: String,
}

impl InvocationContext {
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
        }
    }
}

/// Registry of available tools.
///
/// Dispatch goes through [`execute`](ToolRegistry::execute) for plain
/// calls or [`execute_tracked`](ToolRegistry::execute_tracked) when the
/// invocation should land in the activity log.
pub struct ToolRegistry {
    tools: HashMap<String, DynTool>,
    order: Vec<String>,
    activity: Arc<ActivityLog>,
}

impl ToolRegistry {
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
            activity,
        }
    }

    /// Register a tool. A duplicate name replaces the earlier entry.
    pub fn register(&mut self, tool: DynTool) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(%name, "tool registered twice, replacing");
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&DynTool> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn list(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Definitions for LLM function calling, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The shared activity log invocations are recorded into.
    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }

    /// Execute a tool without touching the activity log.
    pub async fn execute(&self, name: &str, args: Value) -> ToolResult<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        debug!(tool = %name, "executing tool");
        tool.execute(args).await
    }

    /// Execute a tool and record exactly one activity event for the
    /// completed invocation, successful or not.
    ///
    /// The target deployment is read from the `deployment_id` (or, for
    /// resolution tools, `deployment_name`) argument; tools that take
    /// neither are logged with an empty deployment ID.
    pub async fn execute_tracked(
        &self,
        ctx: &InvocationContext,
        name: &str,
        args: Value,
    ) -> ToolResult<ToolOutput> {
        let deployment_id = deployment_from_args(&args);
        let result = self.execute(name, args).await;

        let outcome = match &result {
            Err(e) => ToolOutcome::failed(e.to_string()),
            Ok(output) if !output.success => match &output.error {
                Some(message) => ToolOutcome::failed(message.clone()),
                None => ToolOutcome::Failed { message: None },
            },
            Ok(_) => ToolOutcome::Succeeded,
        };
        self.activity
            .record(&deployment_id, &ctx.user_id, name, &ctx.query, outcome);
        result
    }
}

fn deployment_from_args(args: &Value) -> String {
    args.get("deployment_id")
        .or_else(|| args.get("deployment_name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Builder assembling the full diagnostic catalog over shared handles.
pub struct ToolRegistryBuilder {
    registry: ToolRegistry,
}

impl ToolRegistryBuilder {
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self {
            registry: ToolRegistry::new(activity),
        }
    }

    /// All deployment discovery and health tools.
    pub fn with_deployment_tools(mut self, platform: DynPlatformClient) -> Self {
        self.registry
            .register(Arc::new(ListDeploymentsTool::new(platform.clone())));
        self.registry
            .register(Arc::new(FindDeploymentTool::new(platform.clone())));
        self.registry
            .register(Arc::new(DeploymentOverviewTool::new(platform.clone())));
        self.registry
            .register(Arc::new(ServiceHealthTool::new(platform.clone())));
        self.registry
            .register(Arc::new(RecentTracesTool::new(platform.clone())));
        self.registry
            .register(Arc::new(TraceDetailTool::new(platform.clone())));
        self.registry
            .register(Arc::new(AnalyzeErrorsTool::new(platform.clone())));
        self.registry
            .register(Arc::new(PerformanceMetricsTool::new(platform.clone())));
        self.registry
            .register(Arc::new(DiagnoseDeploymentTool::new(platform)));
        self
    }

    /// Per-user and fleet-wide usage reporting tools.
    pub fn with_user_tools(mut self) -> Self {
        let activity = self.registry.activity.clone();
        self.registry
            .register(Arc::new(UserUsageStatsTool::new(activity.clone())));
        self.registry
            .register(Arc::new(AllUsersSummaryTool::new(activity)));
        self
    }

    /// Error-resolution knowledge base and history tools.
    pub fn with_resolution_tools(mut self) -> Self {
        let activity = self.registry.activity.clone();
        self.registry
            .register(Arc::new(SuggestErrorResolutionTool::new()));
        self.registry
            .register(Arc::new(ErrorResolutionHistoryTool::new(activity)));
        self
    }

    /// Register an extra tool outside the standard catalog.
    pub fn with_tool(mut self, tool: DynTool) -> Self {
        self.registry.register(tool);
        self
    }

    pub fn build(self) -> ToolRegistry {
        self.registry
    }
}

//! The monitoring agent's tool-calling loop.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use deploywatch_core::{config, Error, Result};
use deploywatch_tools::{InvocationContext, ToolRegistry};

use crate::llm::{ChatMessage, DynChatBackend};
use crate::prompts::SYSTEM_PROMPT;

/// Conversational agent over the diagnostic tool catalog.
///
/// Each question runs a bounded react loop: the model may request tool
/// calls, the results are fed back, and the loop ends when the model
/// answers in plain text. Every tool call goes through
/// `ToolRegistry::execute_tracked`, so the activity log sees one event
/// per invocation.
pub struct MonitoringAgent {
    backend: DynChatBackend,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
}

impl MonitoringAgent {
    pub fn new(backend: DynChatBackend, registry: Arc<ToolRegistry>) -> Self {
        Self {
            backend,
            registry,
            max_iterations: config::agent::DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// A fresh history seeded with the system prompt, for multi-turn chat.
    pub fn new_history(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(SYSTEM_PROMPT)]
    }

    /// Answer one question with no prior conversation.
    pub async fn ask(&self, user_id: &str, question: &str) -> Result<String> {
        let mut history = self.new_history();
        self.ask_in(&mut history, user_id, question).await
    }

    /// Answer a question within an ongoing conversation.
    ///
    /// `history` accumulates the user turn, any assistant tool-call turns
    /// with their results, and the final answer, so the caller can keep
    /// passing it back for follow-up questions.
    pub async fn ask_in(
        &self,
        history: &mut Vec<ChatMessage>,
        user_id: &str,
        question: &str,
    ) -> Result<String> {
        history.push(ChatMessage::user(question));
        let definitions = self.registry.definitions();
        let ctx = InvocationContext::new(user_id, question);

        for iteration in 0..self.max_iterations {
            let reply = self.backend.chat(history, &definitions).await?;

            let Some(calls) = reply.tool_calls.clone().filter(|c| !c.is_empty()) else {
                let answer = reply.text().to_string();
                history.push(reply);
                return Ok(answer);
            };

            debug!(iteration, calls = calls.len(), "model requested tool calls");
            history.push(reply);
            for call in &calls {
                let result = self.run_tool(&ctx, &call.function.name, &call.function.arguments);
                let text = match result.await {
                    Ok(text) => text,
                    Err(e) => {
                        // Feed the failure back so the model can recover
                        // or suggest an alternative.
                        warn!(tool = %call.function.name, error = %e, "tool call failed");
                        format!("Tool error: {e}")
                    }
                };
                history.push(ChatMessage::tool_result(call.id.clone(), text));
            }
        }
        Err(Error::llm(format!(
            "no final answer after {} tool iterations",
            self.max_iterations
        )))
    }

    async fn run_tool(
        &self,
        ctx: &InvocationContext,
        name: &str,
        raw_arguments: &str,
    ) -> Result<String> {
        let arguments: Value = if raw_arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw_arguments)
                .map_err(|e| Error::validation(format!("malformed tool arguments: {e}")))?
        };
        let output = self
            .registry
            .execute_tracked(ctx, name, arguments)
            .await?;
        if output.success {
            Ok(output.as_text())
        } else {
            Ok(format!(
                "Tool reported an error: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use deploywatch_core::{ActivityLog, TimeWindow, ToolDefinition};
    use deploywatch_platform::{Deployment, MemoryPlatform, ServiceStats};
    use deploywatch_tools::ToolRegistryBuilder;

    use crate::llm::{ChatBackend, FunctionCall, ToolCall};

    /// Backend that replays a queue of scripted replies.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<ChatMessage>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<ChatMessage>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatMessage> {
            self.replies
                .lock()
                .pop_front()
                .ok_or_else(|| Error::llm("scripted backend exhausted"))
        }
    }

    fn tool_call_reply(name: &str, arguments: Value) -> ChatMessage {
        ChatMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
            tool_call_id: None,
        }
    }

    fn registry() -> (Arc<ActivityLog>, Arc<ToolRegistry>) {
        let activity = Arc::new(ActivityLog::new());
        let platform = Arc::new(
            MemoryPlatform::new()
                .with_deployment(Deployment {
                    id: "dep-1".to_string(),
                    label: Some("churn-predictor".to_string()),
                    status: Some("active".to_string()),
                    description: None,
                    model_type: None,
                    target_type: None,
                    prediction_environment_url: None,
                    created_at: None,
                    importance: None,
                })
                .with_stats(
                    "dep-1",
                    ServiceStats {
                        total_requests: 100,
                        total_errors: 2,
                        ..Default::default()
                    },
                ),
        );
        let registry = ToolRegistryBuilder::new(activity.clone())
            .with_deployment_tools(platform)
            .with_user_tools()
            .with_resolution_tools()
            .build();
        (activity, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_plain_answer_needs_no_tools() {
        let (_, registry) = registry();
        let backend = ScriptedBackend::new(vec![ChatMessage::assistant("All quiet.")]);
        let agent = MonitoringAgent::new(backend, registry);
        let answer = agent.ask("alice", "anything wrong?").await.unwrap();
        assert_eq!(answer, "All quiet.");
    }

    #[tokio::test]
    async fn test_tool_loop_records_activity_and_answers() {
        let (activity, registry) = registry();
        let backend = ScriptedBackend::new(vec![
            tool_call_reply("get_service_health", json!({"deployment_id": "dep-1"})),
            ChatMessage::assistant("Health looks fine: 98% success."),
        ]);
        let agent = MonitoringAgent::new(backend, registry);

        let answer = agent.ask("alice", "how is dep-1?").await.unwrap();
        assert_eq!(answer, "Health looks fine: 98% success.");

        let events = activity.query("dep-1", TimeWindow::last_hours(1), None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tool_name, "get_service_health");
        assert_eq!(events[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back_to_the_model() {
        let (activity, registry) = registry();
        let backend = ScriptedBackend::new(vec![
            tool_call_reply("get_deployment_overview", json!({"deployment_id": "ghost"})),
            ChatMessage::assistant("That deployment does not exist."),
        ]);
        let agent = MonitoringAgent::new(backend, registry);

        let answer = agent.ask("bob", "overview of ghost").await.unwrap();
        assert_eq!(answer, "That deployment does not exist.");

        // The failed call was still recorded.
        let events = activity.query("ghost", TimeWindow::last_hours(1), None);
        assert_eq!(events.len(), 1);
        assert!(events[0].outcome.is_error());
    }

    #[tokio::test]
    async fn test_iteration_bound_is_enforced() {
        let (_, registry) = registry();
        let looping: Vec<ChatMessage> = (0..4)
            .map(|_| tool_call_reply("get_service_health", json!({"deployment_id": "dep-1"})))
            .collect();
        let agent = MonitoringAgent::new(ScriptedBackend::new(looping), registry)
            .with_max_iterations(3);

        let err = agent.ask("alice", "loop forever").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_history_carries_across_turns() {
        let (_, registry) = registry();
        let backend = ScriptedBackend::new(vec![
            ChatMessage::assistant("First answer."),
            ChatMessage::assistant("Second answer."),
        ]);
        let agent = MonitoringAgent::new(backend, registry);

        let mut history = agent.new_history();
        agent.ask_in(&mut history, "alice", "first?").await.unwrap();
        agent.ask_in(&mut history, "alice", "second?").await.unwrap();

        // system + (user, assistant) x2
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].role, "system");
        assert_eq!(history[4].text(), "Second answer.");
    }
}

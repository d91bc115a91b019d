//! Chat backend trait and the OpenAI-compatible implementation.
//!
//! The wire format follows the chat-completions API: messages carry an
//! optional `tool_calls` list on assistant turns and a `tool_call_id`
//! on tool-result turns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use deploywatch_core::{config, Error, Result, ToolDefinition};

/// One requested tool call from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as the API delivers them.
    pub arguments: String,
}

/// One chat turn in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// A tool-result turn answering one tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// An LLM that can hold a tool-calling conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One completion over the history, with the tool catalog offered.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition])
        -> Result<ChatMessage>;
}

/// Shared reference to a chat backend.
pub type DynChatBackend = Arc<dyn ChatBackend>;

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL, without trailing slash.
    pub endpoint: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: config::endpoints::LLM.to_string(),
            api_key: None,
            model: config::models::LLM_DEFAULT.to_string(),
            temperature: config::agent::DEFAULT_TEMPERATURE,
            max_tokens: config::agent::DEFAULT_MAX_TOKENS,
            timeout_secs: config::agent::DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Build the config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            endpoint: config::normalize_endpoint(config::llm_endpoint()),
            api_key: config::llm_api_key(),
            model: config::llm_model(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// `reqwest`-backed chat-completions client.
pub struct OpenAiChatBackend {
    config: LlmConfig,
    client: Client,
}

impl OpenAiChatBackend {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::network(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env())
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        },
                    })
                })
                .collect();
        }
        body
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.config.endpoint);
        debug!(%url, model = %self.config.model, turns = messages.len(), "chat request");

        let mut request = self
            .client
            .post(&url)
            .json(&self.request_body(messages, tools));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("chat completion failed ({status}): {body}")));
        }
        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("malformed chat completion: {e}")))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::llm("chat completion returned no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::tool_result("call_1", "done");
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.text(), "done");

        let user = ChatMessage::user("hello");
        assert_eq!(user.role, "user");
        assert!(user.tool_calls.is_none());
    }

    #[test]
    fn test_request_body_includes_tool_definitions() {
        let backend = OpenAiChatBackend::new(LlmConfig::default()).unwrap();
        let tools = vec![ToolDefinition {
            name: "list_deployments".to_string(),
            description: "List deployments".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let body = backend.request_body(&[ChatMessage::user("hi")], &tools);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "list_deployments");

        let bare = backend.request_body(&[ChatMessage::user("hi")], &[]);
        assert!(bare.get("tools").is_none());
    }

    #[test]
    fn test_completion_wire_parsing() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_service_health",
                            "arguments": "{\"deployment_id\": \"d1\"}"
                        }
                    }]
                }
            }]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let message = &parsed.choices[0].message;
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "get_service_health");
        assert!(calls[0].function.arguments.contains("deployment_id"));
    }
}

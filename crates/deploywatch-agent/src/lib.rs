//! Conversational agent front end.
//!
//! Wires an LLM chat backend to the diagnostic tool catalog: the agent
//! runs a bounded tool-calling loop, dispatching every call through the
//! registry so each invocation is recorded in the activity log.

pub mod agent;
pub mod llm;
pub mod prompts;

pub use agent::MonitoringAgent;
pub use llm::{
    ChatBackend, ChatMessage, DynChatBackend, LlmConfig, OpenAiChatBackend, ToolCall,
};
pub use prompts::SYSTEM_PROMPT;

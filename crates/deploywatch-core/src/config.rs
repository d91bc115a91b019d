//! Configuration defaults and environment-variable helpers.
//!
//! Every crate in the workspace reads its settings through this module so
//! that variable names, defaults, and parsing live in exactly one place.

/// Environment variable names.
pub mod env_vars {
    /// Base URL of the deployment-management platform API.
    pub const PLATFORM_ENDPOINT: &str = "DEPLOYWATCH_PLATFORM_ENDPOINT";
    /// API token for the deployment-management platform.
    pub const PLATFORM_API_TOKEN: &str = "DEPLOYWATCH_PLATFORM_API_TOKEN";
    /// OpenAI-compatible chat endpoint used by the agent.
    pub const LLM_ENDPOINT: &str = "DEPLOYWATCH_LLM_ENDPOINT";
    /// API key for the chat endpoint.
    pub const LLM_API_KEY: &str = "DEPLOYWATCH_LLM_API_KEY";
    /// Model identifier for the chat endpoint.
    pub const LLM_MODEL: &str = "DEPLOYWATCH_LLM_MODEL";
}

/// Default endpoint constants.
pub mod endpoints {
    pub const PLATFORM: &str = "https://app.datarobot.com/api/v2";
    pub const LLM: &str = "https://api.openai.com/v1";
}

/// Default model constants.
pub mod models {
    pub const LLM_DEFAULT: &str = "gpt-4o";
}

/// Agent tuning constants.
pub mod agent {
    /// Default LLM temperature.
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;
    /// Default maximum generated tokens per turn.
    pub const DEFAULT_MAX_TOKENS: usize = 4096;
    /// Maximum tool-call round trips before the agent answers with what it has.
    pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 8;
    /// Default HTTP timeout for LLM requests, in seconds.
    pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
    /// Default HTTP timeout for platform requests, in seconds.
    pub const DEFAULT_PLATFORM_TIMEOUT_SECS: u64 = 30;
}

/// Get the platform endpoint from the environment, or the default.
pub fn platform_endpoint() -> String {
    std::env::var(env_vars::PLATFORM_ENDPOINT)
        .map(normalize_endpoint)
        .unwrap_or_else(|_| endpoints::PLATFORM.to_string())
}

/// Get the platform API token from the environment, if set.
pub fn platform_api_token() -> Option<String> {
    std::env::var(env_vars::PLATFORM_API_TOKEN).ok()
}

/// Get the LLM endpoint from the environment, or the default.
pub fn llm_endpoint() -> String {
    std::env::var(env_vars::LLM_ENDPOINT)
        .map(normalize_endpoint)
        .unwrap_or_else(|_| endpoints::LLM.to_string())
}

/// Get the LLM API key from the environment, if set.
pub fn llm_api_key() -> Option<String> {
    std::env::var(env_vars::LLM_API_KEY).ok()
}

/// Get the LLM model from the environment, or the default.
pub fn llm_model() -> String {
    std::env::var(env_vars::LLM_MODEL).unwrap_or_else(|_| models::LLM_DEFAULT.to_string())
}

/// Normalize an endpoint URL (strip trailing slashes).
pub fn normalize_endpoint(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("https://example.com/api/v2/".to_string()),
            "https://example.com/api/v2"
        );
        assert_eq!(
            normalize_endpoint("https://example.com/api/v2".to_string()),
            "https://example.com/api/v2"
        );
    }

    #[test]
    fn test_defaults() {
        assert!(endpoints::PLATFORM.starts_with("https://"));
        assert_eq!(models::LLM_DEFAULT, "gpt-4o");
        assert!(agent::DEFAULT_MAX_TOOL_ITERATIONS > 0);
    }
}

//! LLM Module - generative backend used for intent routing and RAG answers
//! Talks to OpenAI-compatible chat-completion APIs with tool calling

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::BackendError;

pub mod external;

pub use external::ExternalProvider;

/// LLM operation mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LLMMode {
    /// External API provider
    External {
        provider: ApiProvider,
        api_key: String,
        model: String,
    },
    /// No credentials configured: routing and RAG use their offline fallbacks
    Disabled,
}

/// OpenAI-compatible chat-completion endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    OpenAI,
    OpenRouter,
    Together,
    Groq,
    Ollama,
    Custom { endpoint: String },
}

impl ApiProvider {
    pub fn endpoint(&self) -> String {
        match self {
            Self::OpenAI => "https://api.openai.com/v1/chat/completions".to_string(),
            Self::OpenRouter => "https://openrouter.ai/api/v1/chat/completions".to_string(),
            Self::Together => "https://api.together.xyz/v1/chat/completions".to_string(),
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions".to_string(),
            Self::Ollama => "http://localhost:11434/v1/chat/completions".to_string(),
            Self::Custom { endpoint } => endpoint.clone(),
        }
    }
}

/// How strongly the backend is pushed towards calling one of the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    Required,
    None,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Required => "required",
            Self::None => "none",
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub mode: LLMMode,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub tool_choice: ToolChoice,
    /// Upper bound on one backend call, on top of the HTTP client's own timeout
    pub timeout: Duration,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            mode: LLMMode::Disabled,
            max_tokens: 800,
            temperature: 0.3,
            top_p: 0.95,
            tool_choice: ToolChoice::Auto,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Core trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Chat completion with full message history and optional tool schemas.
    /// Returns ChatResponse::Content or ChatResponse::ToolCalls.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &GenerationConfig,
    ) -> Result<ChatResponse, BackendError>;

    /// Get provider info
    fn info(&self) -> ProviderInfo;
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub tool_choice: ToolChoice,
}

impl From<&LLMConfig> for GenerationConfig {
    fn from(config: &LLMConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            tool_choice: config.tool_choice,
        }
    }
}

// ==================== Tool Calling Types ====================

/// A chat message with role, content, and optional tool call metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    /// Tool calls requested by the assistant (only present when role=Assistant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: Some(content.into()), tool_calls: None }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: Some(content.into()), tool_calls: None }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: Some(content.into()), tool_calls: None }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A tool call emitted by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments string, exactly as the backend produced it
    pub arguments: String,
}

/// Schema describing a tool the LLM can call (OpenAI-compatible format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (must match what the LLM will emit)
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// JSON Schema for the tool's parameters
    pub parameters: JsonValue,
}

/// The result of a chat completion - either text content or tool call requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatResponse {
    /// LLM produced text content (final answer)
    Content(String),
    /// LLM wants to call tools
    ToolCalls(Vec<ToolCall>),
}

/// Provider information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    pub supports_functions: bool,
}

/// Main LLM manager
pub struct LLMManager {
    config: LLMConfig,
    provider: Option<Box<dyn LLMProvider>>,
}

impl LLMManager {
    /// Create new LLM manager
    pub fn new(config: LLMConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    /// Manager with no backend; every call reports `BackendError::Unavailable`.
    pub fn disabled() -> Self {
        Self::new(LLMConfig::default())
    }

    /// Manager around an already-built provider (alternative backends, tests).
    pub fn with_provider(config: LLMConfig, provider: Box<dyn LLMProvider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }

    /// Initialize the LLM provider from the configured mode
    pub fn initialize(&mut self) -> Result<()> {
        match &self.config.mode {
            LLMMode::External {
                provider,
                api_key,
                model,
            } => {
                let provider = ExternalProvider::new(provider.clone(), api_key.clone(), model.clone())?;
                self.provider = Some(Box::new(provider));
                Ok(())
            }
            LLMMode::Disabled => {
                tracing::info!("No backend credentials configured, running in offline mode");
                self.provider = None;
                Ok(())
            }
        }
    }

    /// Chat completion with message history and optional tool calling.
    ///
    /// The provider call is bounded by the configured timeout; an elapsed
    /// timeout is reported as `BackendError::Timeout`.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ChatResponse, BackendError> {
        let provider = self.provider.as_ref().ok_or(BackendError::Unavailable)?;
        let config = GenerationConfig::from(&self.config);

        match tokio::time::timeout(self.config.timeout, provider.chat(messages, tools, &config)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.config.timeout)),
        }
    }

    /// Plain text completion (no tools). A tool-call reply here is malformed.
    pub async fn complete_text(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        match self.chat(messages, &[]).await? {
            ChatResponse::Content(text) if !text.trim().is_empty() => Ok(text),
            ChatResponse::Content(_) => Err(BackendError::Malformed("empty completion".to_string())),
            ChatResponse::ToolCalls(_) => Err(BackendError::Malformed(
                "tool call returned for a text-only request".to_string(),
            )),
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Check if the current provider supports function/tool calling.
    pub fn supports_tools(&self) -> bool {
        self.provider
            .as_ref()
            .map(|p| p.info().supports_functions)
            .unwrap_or(false)
    }

    /// Get current provider info
    pub fn info(&self) -> Option<ProviderInfo> {
        self.provider.as_ref().map(|p| p.info())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();
        assert!(matches!(config.mode, LLMMode::Disabled));
        assert_eq!(config.tool_choice, ToolChoice::Auto);
        assert_eq!(config.timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_disabled_manager_is_unavailable() {
        let mut manager = LLMManager::disabled();
        manager.initialize().unwrap();
        assert!(!manager.is_available());
        let err = manager.chat(&[ChatMessage::user("hi")], &[]).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let mut provider = ScriptedProvider::new(vec![Ok(ChatResponse::Content("late".into()))]);
        provider.delay = Some(Duration::from_millis(200));
        let config = LLMConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let manager = LLMManager::with_provider(config, Box::new(provider));
        let err = manager.chat(&[ChatMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_complete_text_rejects_tool_calls() {
        let (manager, calls) = scripted_manager(vec![
            Ok(ChatResponse::ToolCalls(vec![ToolCall {
                id: "1".into(),
                name: "get_help".into(),
                arguments: "{}".into(),
            }])),
            Ok(ChatResponse::Content("xin chào".into())),
        ]);
        assert!(matches!(
            manager.complete_text(&[ChatMessage::user("a")]).await,
            Err(BackendError::Malformed(_))
        ));
        assert_eq!(manager.complete_text(&[ChatMessage::user("b")]).await.unwrap(), "xin chào");
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_provider_endpoints() {
        assert!(ApiProvider::OpenAI.endpoint().ends_with("/chat/completions"));
        let custom = ApiProvider::Custom {
            endpoint: "http://127.0.0.1:8080/v1/chat/completions".into(),
        };
        assert_eq!(custom.endpoint(), "http://127.0.0.1:8080/v1/chat/completions");
    }
}

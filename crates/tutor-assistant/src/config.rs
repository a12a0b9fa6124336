use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{ApiProvider, LLMConfig, LLMMode, ToolChoice};

/// Environment variables consulted, in order, when the config carries no API key.
pub const API_KEY_ENV_VARS: &[&str] = &["TUTOR_ASSISTANT_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub backend: BackendConfig,
    pub routing: RoutingConfig,
    pub search: SearchConfig,
    pub retrieval: RetrievalConfig,
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: ApiProvider,
    pub model: String,
    /// Usually left out of the file and read from the environment instead.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Caller turns kept in the prompt context.
    pub history_turns: usize,
    pub tool_choice: ToolChoice,
    /// Dispatch obvious tutor searches without the backend when it is unavailable.
    pub offline_search_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// JSON catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: ApiProvider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 20,
            max_tokens: 800,
            temperature: 0.3,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            history_turns: crate::context::DEFAULT_MAX_TURNS,
            tool_choice: ToolChoice::Auto,
            offline_search_fallback: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: crate::search::DEFAULT_LIMIT,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: crate::knowledge::MAX_RESULTS,
        }
    }
}

impl AssistantConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.backend.timeout_secs == 0 {
            return Err("backend.timeout_secs must be > 0".into());
        }
        if self.backend.max_tokens == 0 {
            return Err("backend.max_tokens must be > 0".into());
        }
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err("backend.temperature must be in [0.0, 2.0]".into());
        }
        if self.backend.model.trim().is_empty() {
            return Err("backend.model must not be empty".into());
        }
        if self.search.limit == 0 {
            return Err("search.limit must be > 0".into());
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_k > crate::knowledge::MAX_RESULTS {
            return Err(format!(
                "retrieval.top_k must be in 1..={}",
                crate::knowledge::MAX_RESULTS
            ));
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/tutor-assistant/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tutor-assistant")
            .join("config.json")
    }

    /// The API key from the file, else from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.backend
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|k| !k.trim().is_empty()))
            })
    }

    /// Backend settings. No key means `LLMMode::Disabled`, except for a local
    /// Ollama endpoint which needs none.
    pub fn llm_config(&self) -> LLMConfig {
        let mode = match (self.resolve_api_key(), &self.backend.provider) {
            (Some(api_key), provider) => LLMMode::External {
                provider: provider.clone(),
                api_key,
                model: self.backend.model.clone(),
            },
            (None, ApiProvider::Ollama) => LLMMode::External {
                provider: ApiProvider::Ollama,
                api_key: String::new(),
                model: self.backend.model.clone(),
            },
            (None, _) => LLMMode::Disabled,
        };

        LLMConfig {
            mode,
            max_tokens: self.backend.max_tokens,
            temperature: self.backend.temperature,
            tool_choice: self.routing.tool_choice,
            timeout: Duration::from_secs(self.backend.timeout_secs),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.routing.history_turns, 6);
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.backend.timeout_secs, 20);
        assert!(config.routing.offline_search_fallback);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("cfg-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"routing": {"tool_choice": "required"}, "search": {"limit": 5}}"#,
        )
        .unwrap();
        let config = AssistantConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.routing.tool_choice, ToolChoice::Required);
        assert_eq!(config.routing.history_turns, 6);
        assert_eq!(config.search.limit, 5);
    }

    #[test]
    fn test_validate_rejects_broken_values() {
        let mut config = AssistantConfig::default();
        config.retrieval.top_k = 4;
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_key_in_file_enables_backend() {
        let mut config = AssistantConfig::default();
        config.backend.api_key = Some("sk-test".into());
        let llm = config.llm_config();
        assert!(matches!(llm.mode, LLMMode::External { ref api_key, .. } if api_key == "sk-test"));
        assert_eq!(llm.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let mut config = AssistantConfig::default();
        config.backend.provider = ApiProvider::Ollama;
        config.backend.api_key = None;
        assert!(matches!(config.llm_config().mode, LLMMode::External { .. }));
    }
}

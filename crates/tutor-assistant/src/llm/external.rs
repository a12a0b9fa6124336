//! OpenAI-compatible chat-completion provider with tool calling

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

use super::{
    ApiProvider, ChatMessage, ChatResponse, ChatRole, GenerationConfig, LLMProvider, ProviderInfo,
    ToolCall, ToolChoice, ToolSchema,
};
use crate::error::BackendError;

/// External API provider
pub struct ExternalProvider {
    provider: ApiProvider,
    api_key: String,
    model: String,
    client: Client,
}

impl ExternalProvider {
    pub fn new(provider: ApiProvider, api_key: String, model: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        tracing::info!(
            provider = ?provider,
            model = %model,
            "Creating ExternalProvider (connect_timeout=10s)"
        );

        Ok(Self {
            provider,
            api_key,
            model,
            client,
        })
    }

    fn format_openai_messages(messages: &[ChatMessage]) -> Vec<JsonValue> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                };
                let mut msg = json!({ "role": role });
                if let Some(ref content) = m.content {
                    msg["content"] = json!(content);
                }
                if let Some(ref calls) = m.tool_calls {
                    msg["tool_calls"] = json!(calls
                        .iter()
                        .map(|tc| json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments,
                            }
                        }))
                        .collect::<Vec<_>>());
                }
                msg
            })
            .collect()
    }

    fn format_openai_tools(tools: &[ToolSchema]) -> Vec<JsonValue> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &GenerationConfig,
    ) -> JsonValue {
        let mut request = json!({
            "model": self.model,
            "messages": Self::format_openai_messages(messages),
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "stream": false
        });

        if !tools.is_empty() && config.tool_choice != ToolChoice::None {
            request["tools"] = json!(Self::format_openai_tools(tools));
            request["tool_choice"] = json!(config.tool_choice.as_str());
        }

        request
    }

    /// Parse a response body, returning a clear error if the server returned HTML
    /// (e.g. a gateway error page) instead of valid JSON.
    fn parse_body(body: &str, endpoint: &str) -> Result<JsonValue, BackendError> {
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(BackendError::Malformed(format!(
                "{} returned HTML instead of JSON: {}",
                endpoint, preview
            )));
        }

        serde_json::from_str(body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            BackendError::Malformed(format!(
                "invalid JSON from {}: {}. Response body: {}",
                endpoint, e, preview
            ))
        })
    }

    /// Turn a chat-completion body into either tool calls or text content.
    fn parse_chat_body(body: &JsonValue) -> Result<ChatResponse, BackendError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| BackendError::Malformed("response has no choices[0].message".to_string()))?;

        if let Some(tool_calls) = choice["tool_calls"].as_array() {
            let calls: Vec<ToolCall> = tool_calls
                .iter()
                .enumerate()
                .filter_map(|(i, tc)| {
                    Some(ToolCall {
                        id: tc["id"]
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("call_{}", i)),
                        name: tc["function"]["name"].as_str()?.to_string(),
                        arguments: tc["function"]["arguments"].as_str().unwrap_or("{}").to_string(),
                    })
                })
                .collect();
            if !calls.is_empty() {
                return Ok(ChatResponse::ToolCalls(calls));
            }
        }

        let content = choice["content"].as_str().unwrap_or("").to_string();
        Ok(ChatResponse::Content(content))
    }
}

#[async_trait]
impl LLMProvider for ExternalProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &GenerationConfig,
    ) -> Result<ChatResponse, BackendError> {
        let request = self.build_request(messages, tools, config);
        let endpoint = self.provider.endpoint();

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                BackendError::Transport {
                    endpoint: endpoint.clone(),
                    message,
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BackendError::Transport {
            endpoint: endpoint.clone(),
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let preview: String = body.chars().take(300).collect();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body: preview,
            });
        }

        let json = Self::parse_body(&body, &endpoint)?;
        Self::parse_chat_body(&json)
    }

    fn info(&self) -> ProviderInfo {
        let name = match &self.provider {
            ApiProvider::OpenAI => "OpenAI",
            ApiProvider::OpenRouter => "OpenRouter",
            ApiProvider::Together => "Together AI",
            ApiProvider::Groq => "Groq",
            ApiProvider::Ollama => "Ollama",
            ApiProvider::Custom { .. } => "Custom",
        };
        ProviderInfo {
            name: name.to_string(),
            model: self.model.clone(),
            supports_functions: true,
        }
    }
}

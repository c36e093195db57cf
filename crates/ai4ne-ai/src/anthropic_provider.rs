use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

/// Configuration for Anthropic Claude provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key for Anthropic
    pub api_key: String,
    /// Model to use (e.g., "claude-3-5-sonnet-20241022")
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Maximum context window
    pub context_window: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: DEFAULT_MODEL.to_string(),
            base_url: ANTHROPIC_API_BASE.to_string(),
            context_window: 200_000,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Anthropic Claude LLM provider
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(mut config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "Anthropic API key is required. Set ANTHROPIC_API_KEY environment variable."
            ));
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::default())
    }

    /// Send a request to Anthropic API with retry logic
    async fn send_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        config: &GenerationConfig,
    ) -> Result<AnthropicResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.try_request(messages, tools, config).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        tracing::warn!(
                            "Anthropic request failed (attempt {}/{}), retrying...",
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        config: &GenerationConfig,
    ) -> Result<AnthropicRequest> {
        let tools = tools.filter(|t| !t.is_empty()).map(|t| {
            t.iter()
                .map(|tool| AnthropicTool {
                    name: tool.function.name.clone(),
                    description: tool.function.description.clone(),
                    input_schema: tool.function.parameters.clone(),
                })
                .collect()
        });

        Ok(AnthropicRequest {
            model: self.config.model.clone(),
            messages: convert_messages(messages)?,
            system: messages
                .iter()
                .find(|m| matches!(m.role, MessageRole::System))
                .map(|m| m.content.clone()),
            max_tokens: config.max_tokens.unwrap_or(4096),
            temperature: Some(config.temperature),
            top_p: config.top_p,
            stop_sequences: config.stop.clone(),
            tools,
        })
    }

    /// Try a single request to Anthropic API
    async fn try_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        config: &GenerationConfig,
    ) -> Result<AnthropicResponse> {
        let request = self.build_request(messages, tools, config)?;

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(anyhow!("Anthropic API error ({}): {}", status, error_text));
        }

        response
            .json::<AnthropicResponse>()
            .await
            .context("Failed to parse Anthropic API response")
    }
}

/// Map the chat history onto Anthropic content blocks.
///
/// Tool results must travel in a user turn directly after the assistant turn that
/// requested them, so consecutive tool messages are merged into one user message.
fn convert_messages(messages: &[Message]) -> Result<Vec<AnthropicMessage>> {
    let mut converted: Vec<AnthropicMessage> = Vec::new();

    for message in messages {
        match message.role {
            MessageRole::System => continue,
            MessageRole::User => converted.push(AnthropicMessage {
                role: "user".to_string(),
                content: vec![RequestBlock::Text {
                    text: message.content.clone(),
                }],
            }),
            MessageRole::Assistant => {
                let mut content = Vec::new();
                if !message.content.is_empty() {
                    content.push(RequestBlock::Text {
                        text: message.content.clone(),
                    });
                }
                for call in message.tool_calls.iter().flatten() {
                    let input: JsonValue = if call.function.arguments.trim().is_empty() {
                        JsonValue::Object(Default::default())
                    } else {
                        serde_json::from_str(&call.function.arguments).with_context(|| {
                            format!("Tool call {} carries non-JSON arguments", call.id)
                        })?
                    };
                    content.push(RequestBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.function.name.clone(),
                        input,
                    });
                }
                converted.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content,
                });
            }
            MessageRole::Tool => {
                let block = RequestBlock::ToolResult {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: message.content.clone(),
                    is_error: message.is_error,
                };
                match converted.last_mut() {
                    Some(last)
                        if last.role == "user"
                            && last
                                .content
                                .iter()
                                .all(|b| matches!(b, RequestBlock::ToolResult { .. })) =>
                    {
                        last.content.push(block)
                    }
                    _ => converted.push(AnthropicMessage {
                        role: "user".to_string(),
                        content: vec![block],
                    }),
                }
            }
        }
    }

    Ok(converted)
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.generate_chat_with_tools(messages, None, config).await
    }

    async fn generate_chat_with_tools(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self.send_request(messages, tools, config).await?;

        let mut text = Vec::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                ResponseBlock::Text { text: t } => text.push(t),
                ResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::function(id, name, input.to_string()))
                }
                ResponseBlock::Other => {}
            }
        }

        tracing::debug!(
            "Anthropic generate_chat_with_tools: tool_calls={}, stop_reason={:?}",
            tool_calls.len(),
            response.stop_reason
        );

        Ok(LLMResponse {
            content: text.join(""),
            total_tokens: Some(response.usage.input_tokens + response.usage.output_tokens),
            prompt_tokens: Some(response.usage.input_tokens),
            completion_tokens: Some(response.usage.output_tokens),
            finish_reason: response.stop_reason,
            model: response.model,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        })
    }

    async fn is_available(&self) -> bool {
        // Try a simple request to check availability
        let messages = vec![Message::user("test")];

        let config = GenerationConfig {
            max_tokens: Some(1),
            ..Default::default()
        };

        self.generate_chat(&messages, &config).await.is_ok()
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: self.config.context_window,
            avg_latency_ms: 1000,
            supports_functions: true,
            supports_structured_output: false,
        }
    }
}

// Anthropic API request/response types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<RequestBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: JsonValue,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: JsonValue,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: JsonValue,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation_requires_api_key() {
        let config = AnthropicConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(AnthropicProvider::new(config).is_err());
    }

    #[test]
    fn test_tool_exchange_is_mapped_to_content_blocks() {
        let messages = vec![
            Message::system("route things"),
            Message::user("low latency please"),
            Message::assistant_with_tool_calls(
                "",
                vec![
                    ToolCall::function("toolu_1", "fetchDevices", "{}"),
                    ToolCall::function("toolu_2", "fetchNetworkTopology", ""),
                ],
            ),
            Message::tool_result("toolu_1", "[]"),
            Message::tool_error("toolu_2", "{\"error\":\"HTTP 503\"}"),
        ];

        let converted = convert_messages(&messages).unwrap();
        let value = serde_json::to_value(&converted).unwrap();

        assert_eq!(converted.len(), 3);
        assert_eq!(value[1]["content"][0]["type"], "tool_use");
        assert_eq!(value[1]["content"][1]["input"], json!({}));
        assert_eq!(value[2]["role"], "user");
        assert_eq!(value[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(value[2]["content"][0].get("is_error"), None);
        assert_eq!(value[2]["content"][1]["content"], "{\"error\":\"HTTP 503\"}");
        assert_eq!(value[2]["content"][1]["is_error"], true);
    }

    #[test]
    fn test_response_blocks_tolerate_unknown_types() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "tool_use", "id": "toolu_9", "name": "route", "input": {"deviceIds": ["d1"]}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 3}
        }))
        .unwrap();

        assert!(matches!(response.content[0], ResponseBlock::Other));
        assert!(matches!(response.content[1], ResponseBlock::ToolUse { .. }));
    }
}

//! Anthropic Messages API adapter.
//!
//! Structured-call variant: tool invocations come back as `tool_use`
//! content blocks carrying an already-parsed `input` object, interleaved
//! with `text` blocks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{Action, ProviderResult, ToolSpec, Usage};
use super::{decode, send_json, skip_invalid_call, with_text_fallback, MoveProvider, ProviderOptions};
use crate::error::CoreError;

pub const PROVIDER_NAME: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const API_KEY_ENV: &[&str] = &["ANTHROPIC_API_KEY", "ANTHROPIC_S"];

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicProvider {
    /// Create a new adapter, resolving the API key from `api_key` or the
    /// environment.
    pub fn new(
        api_key: Option<&str>,
        model: &str,
        options: ProviderOptions,
        client: Client,
    ) -> Result<Self, CoreError> {
        let api_key = super::resolve_credential(PROVIDER_NAME, api_key, API_KEY_ENV)?;
        let base_url = options.base_url(DEFAULT_BASE_URL);

        debug!(provider = PROVIDER_NAME, base_url = %base_url, model, "Initialized LLM provider");

        Ok(Self {
            client,
            api_key,
            base_url,
            model: model.to_string(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        })
    }
}

// ── Messages API request/response types ─────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [RequestMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ToolDefinition<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: Value,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct UsageResponse {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl From<UsageResponse> for Usage {
    fn from(u: UsageResponse) -> Self {
        Self {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens.saturating_add(u.output_tokens),
        }
    }
}

/// Collapse content blocks into text plus actions, in emission order.
fn normalize(content: Vec<ContentBlock>, tools: &[ToolSpec]) -> (String, Vec<Action>) {
    let mut text = String::new();
    let mut actions = Vec::new();

    for block in content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => {
                let args = match input {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    other => {
                        skip_invalid_call(PROVIDER_NAME, &name, &format!("input is not an object: {other}"));
                        continue;
                    }
                };
                match Action::from_call(tools, &name, args, Some(id)) {
                    Ok(action) => actions.push(action),
                    Err(e) => skip_invalid_call(PROVIDER_NAME, &name, &e),
                }
            }
            ContentBlock::Other => {}
        }
    }

    (text, actions)
}

// ── MoveProvider implementation ─────────────────────────────────────

#[async_trait]
impl MoveProvider for AnthropicProvider {
    async fn predict(
        &self,
        system_message: &str,
        user_prompt: &str,
        tools: &[ToolSpec],
    ) -> Result<ProviderResult, CoreError> {
        let url = format!("{}/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_message,
            messages: [RequestMessage {
                role: "user",
                content: user_prompt,
            }],
            temperature: self.temperature,
            tools: tools
                .iter()
                .map(|t| ToolDefinition {
                    name: t.name,
                    description: t.description,
                    input_schema: t.input_schema(),
                })
                .collect(),
        };

        debug!(model = %self.model, url = %url, tools = tools.len(), "Sending messages request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let raw = send_json(PROVIDER_NAME, request).await?;
        let response: MessagesResponse = decode(PROVIDER_NAME, &raw)?;

        let (text_content, structured) = normalize(response.content, tools);
        let actions = with_text_fallback(PROVIDER_NAME, structured, &text_content, tools);

        let usage = response.usage.map(Usage::from).unwrap_or_default();
        let finish_reason = response.stop_reason.unwrap_or_else(|| "end_turn".into());

        debug!(
            finish_reason = %finish_reason,
            actions = actions.len(),
            tokens = usage.total_tokens,
            "Received LLM response"
        );

        Ok(ProviderResult {
            text_content,
            actions,
            raw,
            finish_reason,
            usage,
        })
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

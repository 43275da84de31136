//! OpenAI-compatible chat completions adapter.
//!
//! Structured-call variant: the model returns `tool_calls`, each with a
//! function name and a JSON-encoded argument string. The same wire types
//! are reused by the Hugging Face adapter, whose router speaks the same
//! protocol.
//!
//! No SDK dependency, just direct HTTP via `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{Action, ProviderResult, ToolSpec, Usage};
use super::{decode, send_json, skip_invalid_call, with_text_fallback, MoveProvider, ProviderOptions};
use crate::error::CoreError;

pub const PROVIDER_NAME: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &[&str] = &["OPENAI_API_KEY"];

/// Adapter for any provider exposing the `/chat/completions` endpoint with
/// native function calling.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl OpenAiProvider {
    /// Create a new adapter.
    ///
    /// # Arguments
    /// * `api_key` - API key (falls back to `OPENAI_API_KEY`)
    /// * `model` - Model to use for every call
    /// * `options` - Base URL override and sampling knobs
    /// * `client` - Shared HTTP client
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

// ── OpenAI API request/response types ───────────────────────────────

#[derive(Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<RequestMessage<'a>>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'a str>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(
        model: &'a str,
        system: &'a str,
        user: &'a str,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            model,
            messages: vec![
                RequestMessage { role: "system", content: system },
                RequestMessage { role: "user", content: user },
            ],
            max_tokens,
            temperature,
            tools: None,
            tool_choice: None,
        }
    }

    /// Offer `tools` natively with `tool_choice: "auto"`.
    pub fn with_tools(mut self, tools: &[ToolSpec]) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools.iter().map(ToolDefinition::from_spec).collect());
            self.tool_choice = Some("auto");
        }
        self
    }
}

#[derive(Serialize)]
pub(crate) struct RequestMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Tool definition in OpenAI function-calling format.
#[derive(Serialize)]
pub(crate) struct ToolDefinition {
    #[serde(rename = "type")]
    def_type: &'static str,
    function: ToolFunctionDef,
}

#[derive(Serialize)]
struct ToolFunctionDef {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

impl ToolDefinition {
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            def_type: "function",
            function: ToolFunctionDef {
                name: spec.name,
                description: spec.description,
                parameters: spec.input_schema(),
            },
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallResponse>>,
}

#[derive(Deserialize)]
struct ToolCallResponse {
    #[serde(default)]
    id: Option<String>,
    function: FunctionCallResponse,
}

#[derive(Deserialize)]
struct FunctionCallResponse {
    name: String,
    /// Usually a JSON-encoded string; some servers send the object itself.
    arguments: Value,
}

#[derive(Deserialize)]
struct UsageResponse {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

/// One decoded completion, before any text fallback.
#[derive(Debug)]
pub(crate) struct Completion {
    pub text: String,
    pub structured: Vec<Action>,
    pub finish_reason: String,
    pub usage: Usage,
    pub raw: Value,
}

impl Completion {
    pub fn into_result(self, provider: &str, tools: &[ToolSpec]) -> ProviderResult {
        let actions = with_text_fallback(provider, self.structured, &self.text, tools);
        ProviderResult {
            text_content: self.text,
            actions,
            raw: self.raw,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}

fn decode_arguments(arguments: Value) -> Result<Map<String, Value>, String> {
    match arguments {
        Value::String(s) if s.trim().is_empty() => Ok(Map::new()),
        Value::String(s) => serde_json::from_str::<Map<String, Value>>(&s).map_err(|e| e.to_string()),
        Value::Object(map) => Ok(map),
        other => Err(format!("arguments are neither a string nor an object: {other}")),
    }
}

fn parse_completion(provider: &str, raw: Value, tools: &[ToolSpec]) -> Result<Completion, CoreError> {
    let completion: CompletionResponse = decode(provider, &raw)?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::upstream(provider, None, "response contained no choices"))?;

    let structured = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| {
            let name = tc.function.name;
            let args = match decode_arguments(tc.function.arguments) {
                Ok(args) => args,
                Err(e) => {
                    skip_invalid_call(provider, &name, &e);
                    return None;
                }
            };
            match Action::from_call(tools, &name, args, tc.id) {
                Ok(action) => Some(action),
                Err(e) => {
                    skip_invalid_call(provider, &name, &e);
                    None
                }
            }
        })
        .collect();

    let usage = completion.usage.map_or(Usage::default(), |u| Usage {
        prompt_tokens: u.prompt_tokens.unwrap_or(0),
        completion_tokens: u.completion_tokens.unwrap_or(0),
        total_tokens: u.total_tokens.unwrap_or(0),
    });

    Ok(Completion {
        text: choice.message.content.unwrap_or_default(),
        structured,
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
        usage,
        raw,
    })
}

/// Send one chat completion request. Exactly one HTTP call.
pub(crate) async fn complete(
    client: &Client,
    provider: &str,
    base_url: &str,
    api_key: &str,
    request: &CompletionRequest<'_>,
    tools: &[ToolSpec],
) -> Result<Completion, CoreError> {
    let url = format!("{}/chat/completions", base_url);

    debug!(
        provider,
        model = request.model,
        url = %url,
        native_tools = request.tools.is_some(),
        "Sending chat completion request"
    );

    let http = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(request);
    let raw = send_json(provider, http).await?;
    let completion = parse_completion(provider, raw, tools)?;

    debug!(
        provider,
        finish_reason = %completion.finish_reason,
        tool_calls = completion.structured.len(),
        tokens = completion.usage.total_tokens,
        "Received LLM response"
    );

    Ok(completion)
}

// ── MoveProvider implementation ─────────────────────────────────────

#[async_trait]
impl MoveProvider for OpenAiProvider {
    async fn predict(
        &self,
        system_message: &str,
        user_prompt: &str,
        tools: &[ToolSpec],
    ) -> Result<ProviderResult, CoreError> {
        let request = CompletionRequest::new(
            &self.model,
            system_message,
            user_prompt,
            self.max_tokens,
            self.temperature,
        )
        .with_tools(tools);

        let completion = complete(
            &self.client,
            PROVIDER_NAME,
            &self.base_url,
            &self.api_key,
            &request,
            tools,
        )
        .await?;

        Ok(completion.into_result(PROVIDER_NAME, tools))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

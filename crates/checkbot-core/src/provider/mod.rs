//! LLM provider trait and adapters.
//!
//! Defines the `MoveProvider` trait that all backends must implement.
//! Each adapter turns one provider's native response shape into
//! [`ProviderResult`]s carrying validated [`Action`]s:
//!
//! - [`anthropic`]: Messages API, `tool_use` content blocks
//! - [`openai`]: OpenAI-compatible `/chat/completions`, `tool_calls`
//! - [`huggingface`]: prompt-injected tool descriptions, text extraction

pub mod anthropic;
pub mod huggingface;
pub mod openai;
pub mod types;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::parser;
use types::{Action, ProviderResult, ToolSpec};

/// Trait for move-predicting LLM providers.
///
/// Callers never need to know which variant they hold: structured-call
/// and text-only backends produce the same [`ProviderResult`].
#[async_trait]
pub trait MoveProvider: Send + Sync {
    /// Ask the model for a move.
    ///
    /// # Arguments
    /// * `system_message` - Opaque system text
    /// * `user_prompt` - Opaque user text (board description)
    /// * `tools` - Tools the model may call (empty = no tool calling)
    async fn predict(
        &self,
        system_message: &str,
        user_prompt: &str,
        tools: &[ToolSpec],
    ) -> Result<ProviderResult, CoreError>;

    /// Registry name of this provider (e.g. "anthropic").
    fn provider_name(&self) -> &str;

    /// Model identifier used for every call.
    fn model(&self) -> &str;
}

/// Per-adapter request knobs.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Custom base URL (overrides the provider's default endpoint).
    pub api_base: Option<String>,
    pub max_tokens: u32,
    /// `None` uses the adapter's own default.
    pub temperature: Option<f32>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_base: None,
            max_tokens: 1024,
            temperature: None,
        }
    }
}

impl ProviderOptions {
    fn base_url(&self, default: &str) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Resolve a credential: explicit value first, then each environment
/// variable in order. Blank values count as missing.
pub fn resolve_credential(
    provider: &str,
    explicit: Option<&str>,
    env_vars: &[&str],
) -> Result<String, CoreError> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    for var in env_vars {
        if let Ok(value) = std::env::var(var) {
            let value = value.trim();
            if !value.is_empty() {
                debug!(provider, env = var, "Resolved API key from environment");
                return Ok(value.to_string());
            }
        }
    }

    Err(CoreError::configuration(
        provider,
        format!(
            "API key is required. Set {} or pass an API key explicitly.",
            env_vars.join(" or ")
        ),
    ))
}

/// Fill in text-extracted actions when the structured path yielded none.
pub(crate) fn with_text_fallback(
    provider: &str,
    structured: Vec<Action>,
    text: &str,
    tools: &[ToolSpec],
) -> Vec<Action> {
    if !structured.is_empty() || tools.is_empty() {
        return structured;
    }

    let actions = parser::parse(text, tools);
    debug!(provider, actions = actions.len(), "No structured tool calls, parsed response text");
    actions
}

/// Log and drop a rejected tool call.
pub(crate) fn skip_invalid_call(provider: &str, tool: &str, reason: &dyn std::fmt::Display) {
    warn!(provider, tool, error = %reason, "Invalid tool call from model, skipping");
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Single(ErrorBody),
    Multiple(Vec<ErrorBody>),
    Plain { error: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ErrorResponse {
    fn message(&self) -> String {
        match self {
            Self::Single(b) => b.error.message.clone(),
            Self::Multiple(v) => v
                .first()
                .map(|b| b.error.message.clone())
                .unwrap_or_else(|| "Unknown error".into()),
            Self::Plain { error } => error.clone(),
        }
    }
}

/// Send a prepared request and return the decoded JSON body.
///
/// Exactly one attempt: every failure becomes [`CoreError::Upstream`].
pub(crate) async fn send_json(provider: &str, request: RequestBuilder) -> Result<Value, CoreError> {
    let response = request
        .send()
        .await
        .map_err(|e| CoreError::upstream(provider, None, format!("network error: {e}")))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        CoreError::upstream(
            provider,
            Some(status.as_u16()),
            format!("failed to read response body: {e}"),
        )
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message())
            .unwrap_or(body);
        return Err(CoreError::upstream(provider, Some(status.as_u16()), message));
    }

    serde_json::from_str(&body).map_err(|e| {
        CoreError::upstream(
            provider,
            Some(status.as_u16()),
            format!("malformed response: {e}"),
        )
    })
}

/// Decode a typed view of an already-parsed response body.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: &str,
    raw: &Value,
) -> Result<T, CoreError> {
    T::deserialize(raw)
        .map_err(|e| CoreError::upstream(provider, None, format!("malformed response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::movement::MOVE_TOOL;

    #[test]
    fn test_explicit_credential_wins() {
        let key = resolve_credential("anthropic", Some("  sk-explicit "), &["CHECKBOT_TEST_UNSET_VAR"])
            .unwrap();
        assert_eq!(key, "sk-explicit");
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let err = resolve_credential("anthropic", Some("   "), &["CHECKBOT_TEST_DEFINITELY_UNSET"])
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
        assert!(err.to_string().contains("CHECKBOT_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_base_url_override() {
        let opts = ProviderOptions {
            api_base: Some("http://localhost:8000/v1/".into()),
            ..Default::default()
        };
        assert_eq!(opts.base_url("https://api.openai.com/v1"), "http://localhost:8000/v1");
        assert_eq!(
            ProviderOptions::default().base_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn test_error_response_shapes() {
        let single: ErrorResponse =
            serde_json::from_str(r#"{"type":"error","error":{"type":"x","message":"bad key"}}"#).unwrap();
        assert_eq!(single.message(), "bad key");

        let plain: ErrorResponse = serde_json::from_str(r#"{"error":"model not supported"}"#).unwrap();
        assert_eq!(plain.message(), "model not supported");
    }

    #[test]
    fn test_text_fallback_only_when_structured_empty() {
        let text = "TOOL_CALL:move:A1:B2";
        let parsed = with_text_fallback("openai", Vec::new(), text, &[MOVE_TOOL]);
        assert_eq!(parsed.len(), 1);

        let structured = parsed.clone();
        let kept = with_text_fallback("openai", structured.clone(), "TOOL_CALL:move:C3:D4", &[MOVE_TOOL]);
        assert_eq!(kept, structured);

        assert!(with_text_fallback("openai", Vec::new(), text, &[]).is_empty());
    }
}

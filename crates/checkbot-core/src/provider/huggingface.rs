//! Hugging Face inference adapter.
//!
//! Unstructured-call variant. Native function calling on the router is
//! model-dependent, so the prompt always carries a textual description of
//! every tool and the `TOOL_CALL:` convention, and the reply text goes to
//! the fallback parser when no usable structured call comes back.
//!
//! If the request with native tools is rejected, it is re-issued once
//! without them. That is the only second call this adapter ever makes.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::openai::{complete, CompletionRequest};
use super::types::{ProviderResult, ToolSpec};
use super::{MoveProvider, ProviderOptions};
use crate::error::CoreError;
use crate::parser::sentinel::SENTINEL;

pub const PROVIDER_NAME: &str = "huggingface";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-72B-Instruct";
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const API_KEY_ENV: &[&str] = &["HF_TOKEN"];

/// Low temperature keeps move choices consistent.
const DEFAULT_TEMPERATURE: f32 = 0.1;

pub struct HuggingFaceProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HuggingFaceProvider {
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
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }
}

/// Append tool descriptions and the textual calling convention to a prompt.
pub fn inject_tools(user_prompt: &str, tools: &[ToolSpec]) -> String {
    if tools.is_empty() {
        return user_prompt.to_string();
    }

    let descriptions: Vec<String> = tools.iter().map(ToolSpec::describe).collect();
    let mut prompt = format!("{user_prompt}\n\nAvailable tools:\n{}", descriptions.join("\n"));

    for tool in tools {
        let placeholders: Vec<&str> = tool.parameters.iter().map(|p| p.name).collect();
        prompt.push_str(&format!(
            "\n\nTo call {name}, respond with a line: {SENTINEL}{name}:{}",
            placeholders.join(":"),
            name = tool.name,
        ));
    }

    prompt
}

#[async_trait]
impl MoveProvider for HuggingFaceProvider {
    async fn predict(
        &self,
        system_message: &str,
        user_prompt: &str,
        tools: &[ToolSpec],
    ) -> Result<ProviderResult, CoreError> {
        let prompt = inject_tools(user_prompt, tools);
        let request = CompletionRequest::new(
            &self.model,
            system_message,
            &prompt,
            self.max_tokens,
            Some(self.temperature),
        );

        let completion = if tools.is_empty() {
            complete(&self.client, PROVIDER_NAME, &self.base_url, &self.api_key, &request, tools).await?
        } else {
            let with_tools = CompletionRequest::new(
                &self.model,
                system_message,
                &prompt,
                self.max_tokens,
                Some(self.temperature),
            )
            .with_tools(tools);

            match complete(&self.client, PROVIDER_NAME, &self.base_url, &self.api_key, &with_tools, tools)
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        provider = PROVIDER_NAME,
                        model = %self.model,
                        error = %e,
                        "Tool calling failed, falling back to plain completion"
                    );
                    complete(&self.client, PROVIDER_NAME, &self.base_url, &self.api_key, &request, tools)
                        .await?
                }
            }
        };

        Ok(completion.into_result(PROVIDER_NAME, tools))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::movement::MOVE_TOOL;

    #[test]
    fn test_inject_tools() {
        let prompt = inject_tools("Pick a move.", &[MOVE_TOOL]);
        assert!(prompt.starts_with("Pick a move.\n\nAvailable tools:\n- move: "));
        assert!(prompt.contains("TOOL_CALL:move:from_position:to_position"));
    }

    #[test]
    fn test_inject_without_tools_is_identity() {
        assert_eq!(inject_tools("Pick a move.", &[]), "Pick a move.");
    }

    #[test]
    fn test_default_temperature() {
        let p = HuggingFaceProvider::new(Some("hf_test"), DEFAULT_MODEL, ProviderOptions::default(), Client::new())
            .unwrap();
        assert_eq!(p.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(p.base_url, DEFAULT_BASE_URL);
        assert_eq!(p.provider_name(), "huggingface");
    }
}

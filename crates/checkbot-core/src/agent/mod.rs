//! Move prediction cycle.
//!
//! [`MoveAgent`] wires the provider registry, the prompt renderer and the
//! action executor into one call: render → predict → execute.

pub mod context;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::provider::types::{Action, Usage};
use crate::provider::ProviderOptions;
use crate::registry::ProviderRegistry;
use crate::tools::movement::SuggestedMove;
use crate::tools::{ActionExecutor, ExecutionRecord};
use context::{CheckersPrompt, PromptRenderer};

/// One move request from a game client.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub provider: String,
    /// `None` uses the provider's default model.
    pub model: Option<String>,
    /// `None` falls back to the provider's environment variable.
    pub credential: Option<String>,
    pub options: ProviderOptions,
    pub board_state: Value,
}

impl PredictRequest {
    pub fn new(provider: impl Into<String>, board_state: Value) -> Self {
        Self {
            provider: provider.into(),
            model: None,
            credential: None,
            options: ProviderOptions::default(),
            board_state,
        }
    }
}

/// What the game client gets back.
#[derive(Debug, Clone, Serialize)]
pub struct MovePrediction {
    pub provider: String,
    pub model: String,
    pub analysis: String,
    pub reasoning: String,
    pub suggested_move: Option<SuggestedMove>,
    /// Every recognized action, in emission order.
    pub tool_calls: Vec<Action>,
    pub tool_results: Vec<ExecutionRecord>,
    pub finish_reason: String,
    pub usage: Usage,
}

pub struct MoveAgent<'r> {
    registry: &'r ProviderRegistry,
    executor: ActionExecutor,
    renderer: Box<dyn PromptRenderer>,
}

impl<'r> MoveAgent<'r> {
    /// Agent with the built-in tools and checkers prompts.
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            executor: ActionExecutor::with_builtin_tools(),
            renderer: Box::new(CheckersPrompt),
        }
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn PromptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Run one prediction cycle.
    ///
    /// Registry and provider failures abort the cycle; per-action failures
    /// are reported in `tool_results`.
    pub async fn predict_move(&self, request: PredictRequest) -> Result<MovePrediction, CoreError> {
        let provider = self.registry.create(
            &request.provider,
            request.credential.as_deref(),
            request.model.as_deref(),
            request.options,
        )?;

        let system_message = self.renderer.system_message();
        let user_prompt = self.renderer.user_prompt(&request.board_state);
        let tools = self.executor.tool_specs();

        info!(
            provider = provider.provider_name(),
            model = provider.model(),
            tools = tools.len(),
            "Predicting move"
        );

        let result = provider.predict(&system_message, &user_prompt, &tools).await?;
        let tool_calls = result.actions.clone();
        let batch = self.executor.execute_batch(result.actions).await;

        match &batch.suggested_move {
            Some(mv) => info!(from = %mv.from, to = %mv.to, actions = tool_calls.len(), "Move suggested"),
            None => warn!(actions = tool_calls.len(), "Model response contained no usable move"),
        }

        Ok(MovePrediction {
            provider: provider.provider_name().to_string(),
            model: provider.model().to_string(),
            analysis: result.text_content.clone(),
            reasoning: result.text_content,
            suggested_move: batch.suggested_move,
            tool_calls,
            tool_results: batch.records,
            finish_reason: result.finish_reason,
            usage: result.usage,
        })
    }
}

//! checkbot-core: Core library for LLM-driven checkers move prediction.
//!
//! Every provider answers tool calls differently: typed content blocks,
//! function-call objects, or plain text. This crate collapses all of them
//! into one validated [`Action`](provider::types::Action) and runs it.
//!
//! - [`provider`]: `MoveProvider` trait, action schema, and the Anthropic,
//!   OpenAI-compatible and Hugging Face adapters
//! - [`parser`]: text fallback strategies for models without tool calling
//! - [`tools`]: tool handlers and the batch executor
//! - [`registry`]: provider name → adapter constructor map
//! - [`recorder`]: one-shot outcome persistence (SQLite or memory)
//! - [`agent`]: prompt rendering and the predict → execute cycle
//! - [`config`]: typed configuration loading from JSON
//! - [`error`]: error taxonomy
//!
//! # Quick Start
//!
//! ```no_run
//! use checkbot_core::agent::{MoveAgent, PredictRequest};
//! use checkbot_core::registry::ProviderRegistry;
//!
//! # async fn run() -> Result<(), checkbot_core::error::CoreError> {
//! let agent = MoveAgent::new(ProviderRegistry::global());
//! let board = serde_json::json!({ "currentPlayer": "red" });
//!
//! let prediction = agent.predict_move(PredictRequest::new("anthropic", board)).await?;
//! if let Some(mv) = prediction.suggested_move {
//!     println!("{} -> {}", mv.from, mv.to);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod parser;
pub mod provider;
pub mod recorder;
pub mod registry;
pub mod tools;

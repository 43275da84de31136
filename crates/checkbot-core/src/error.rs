//! Error taxonomy.
//!
//! Errors are split by how far they propagate:
//!
//! - [`CoreError`] breaks the whole predict → execute → record cycle.
//! - [`ActionError`] is scoped to one action and lands in its
//!   [`ExecutionRecord`](crate::tools::ExecutionRecord).
//! - [`ValidationError`] is scoped to one candidate tool call; adapters and
//!   parsers log it and skip the candidate.

use thiserror::Error;

/// Cycle-fatal errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or unusable credential/settings, raised at adapter construction.
    #[error("{provider}: configuration error: {message}")]
    Configuration { provider: String, message: String },

    /// Transport or provider API failure. Never retried inside the core.
    #[error("{provider} API call failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
        /// Whether a caller-side retry policy could reasonably try again.
        retryable: bool,
    },

    #[error("unknown provider '{name}'. Available providers: {}", .available.join(", "))]
    UnknownProvider { name: String, available: Vec<String> },

    #[error("invalid adapter '{name}': {reason}")]
    InvalidAdapter { name: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn configuration(provider: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn upstream(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        let retryable = status.map_or(true, is_retryable_status);
        Self::Upstream {
            provider: provider.to_string(),
            status,
            message: message.into(),
            retryable,
        }
    }

    /// HTTP-equivalent status a boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Configuration { .. } | Self::Storage(_) => 500,
            Self::Upstream { .. } => 502,
            Self::UnknownProvider { .. } | Self::InvalidAdapter { .. } => 400,
        }
    }
}

/// Returns `true` if an upstream HTTP status is transient.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Per-action failure, recorded instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("error executing tool '{tool}': {message}")]
    HandlerError { tool: String, message: String },
}

/// Why a candidate tool call was rejected before becoming an `Action`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{tool}' is missing required argument '{param}'")]
    MissingArgument { tool: String, param: String },

    #[error("tool '{tool}' does not declare argument '{param}'")]
    UnexpectedArgument { tool: String, param: String },

    #[error("tool '{tool}' argument '{param}': {reason}")]
    InvalidValue {
        tool: String,
        param: String,
        reason: String,
    },
}

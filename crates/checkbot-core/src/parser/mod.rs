//! Text fallback parser.
//!
//! Recovers actions from free-form model output when no structured tool
//! call came back. Models follow textual conventions loosely, so
//! recognition is lenient while every candidate still goes through
//! [`ToolSpec`] validation before it becomes an [`Action`].
//!
//! Strategies run in order and the first non-empty result wins:
//!
//! 1. [`sentinel`]: `TOOL_CALL:<name>:<arg1>:<arg2>` lines
//! 2. [`json_fragment`]: inline `{"name": ..., "arguments": {...}}` objects
//! 3. [`call_syntax`]: `move(from_position="C3", to_position="D4")` and
//!    loose `"name"`/argument key-value blocks in either field order

pub mod call_syntax;
pub mod json_fragment;
pub mod sentinel;

use tracing::debug;

use crate::provider::types::{Action, ToolSpec};

/// A pure extraction strategy.
pub type Strategy = fn(&str, &[ToolSpec]) -> Vec<Action>;

/// Strategies in priority order.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("sentinel", sentinel::parse),
    ("json_fragment", json_fragment::parse),
    ("call_syntax", call_syntax::parse),
];

/// Run every strategy in order, returning the first non-empty result.
pub fn parse(text: &str, tools: &[ToolSpec]) -> Vec<Action> {
    if text.trim().is_empty() || tools.is_empty() {
        return Vec::new();
    }

    for (name, strategy) in STRATEGIES {
        let actions = strategy(text, tools);
        if !actions.is_empty() {
            debug!(strategy = name, actions = actions.len(), "Extracted tool calls from text");
            return actions;
        }
    }

    Vec::new()
}

/// Synthetic id for an action recovered from text.
pub(crate) fn text_call_id(index: usize) -> Option<String> {
    Some(format!("text_call_{index}"))
}

/// Strip quoting and trailing punctuation models like to wrap values in.
pub(crate) fn clean_token(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '(' | '['))
        .trim_end_matches(|c: char| {
            matches!(c, '"' | '\'' | '`' | '*' | '.' | ',' | ';' | '!' | '?' | ')' | ']')
        })
        .trim()
}

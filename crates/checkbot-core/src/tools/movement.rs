//! The `move` tool.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::ToolHandler;
use crate::provider::types::{Action, ParamType, ToolParam, ToolSpec};

pub const MOVE_TOOL: ToolSpec = ToolSpec {
    name: "move",
    description: "Make a move in the checkers game. Call this tool when you want to execute a move.",
    parameters: &[
        ToolParam {
            name: "from_position",
            param_type: ParamType::String,
            description: "Starting position in algebraic notation (e.g., 'C3', 'E5')",
            required: true,
        },
        ToolParam {
            name: "to_position",
            param_type: ParamType::String,
            description: "Destination position in algebraic notation (e.g., 'D4', 'F6')",
            required: true,
        },
    ],
};

/// Canonical move suggestion surfaced to the game client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SuggestedMove {
    pub from: String,
    pub to: String,
}

impl SuggestedMove {
    /// Read a suggestion off a `move` action.
    pub fn from_action(action: &Action) -> Option<Self> {
        if action.name() != MOVE_TOOL.name {
            return None;
        }
        Some(Self {
            from: action.argument("from_position")?.to_string(),
            to: action.argument("to_position")?.to_string(),
        })
    }
}

/// Acknowledges a move. Legality is the game client's business.
pub struct MoveTool;

#[async_trait]
impl ToolHandler for MoveTool {
    fn spec(&self) -> &'static ToolSpec {
        &MOVE_TOOL
    }

    async fn execute(&self, action: &Action) -> anyhow::Result<Value> {
        let from = action
            .argument("from_position")
            .ok_or_else(|| anyhow::anyhow!("missing from_position"))?;
        let to = action
            .argument("to_position")
            .ok_or_else(|| anyhow::anyhow!("missing to_position"))?;

        info!(from, to, "Move tool called");
        Ok(Value::String(format!("Move executed: {from} -> {to}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_move_tool_result() {
        let action = Action::new(
            &MOVE_TOOL,
            [("from_position", json!("C3")), ("to_position", json!("D4"))],
            None,
        )
        .unwrap();

        let result = MoveTool.execute(&action).await.unwrap();
        assert_eq!(result, json!("Move executed: C3 -> D4"));
        assert_eq!(
            SuggestedMove::from_action(&action),
            Some(SuggestedMove { from: "C3".into(), to: "D4".into() })
        );
    }
}

//! Tool system: handler trait, executor, and the built-in `move` tool.
//!
//! Every tool implements [`ToolHandler`] and registers itself in the
//! [`ActionExecutor`]. Adapters are offered the registered specs; the
//! executor dispatches the resulting actions by name.

pub mod movement;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info};

use crate::error::ActionError;
use crate::provider::types::{Action, ToolSpec};
use movement::{MoveTool, SuggestedMove, MOVE_TOOL};

/// Trait that all executable tools must implement.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Static declaration of the tool's name and parameters.
    fn spec(&self) -> &'static ToolSpec;

    /// Run the tool. The action has already been validated against `spec()`.
    async fn execute(&self, action: &Action) -> anyhow::Result<Value>;
}

/// Result of running one action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(ActionError),
}

/// One action and what happened when it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub action: Action,
    pub outcome: Outcome,
}

impl ExecutionRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Wire shape of an execution record: `{tool, arguments, result | error}`.
#[derive(Serialize)]
struct RecordView<'a> {
    tool: &'a str,
    arguments: &'a std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for ExecutionRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (result, error) = match &self.outcome {
            Outcome::Success(v) => (Some(v), None),
            Outcome::Failure(e) => (None, Some(e.to_string())),
        };
        RecordView {
            tool: self.action.name(),
            arguments: self.action.arguments(),
            result,
            error,
        }
        .serialize(serializer)
    }
}

/// Every record of a batch plus the canonical move suggestion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub records: Vec<ExecutionRecord>,
    /// First successfully executed `move`, if any.
    pub suggested_move: Option<SuggestedMove>,
}

/// Name → handler registry that runs actions in isolation.
pub struct ActionExecutor {
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Executor with every built-in tool registered.
    pub fn with_builtin_tools() -> Self {
        let mut executor = Self::new();
        executor.register(Box::new(MoveTool));
        executor
    }

    /// Register a handler. Replaces any existing handler with the same name.
    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        let name = handler.spec().name;
        debug!(tool = name, "Registered tool");
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Specs of every registered tool, sorted by name.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.handlers.values().map(|h| *h.spec()).collect();
        specs.sort_by_key(|s| s.name);
        specs
    }

    /// Run one action. Never fails as a whole: errors and panics from the
    /// handler land in the record.
    pub async fn execute(&self, action: Action) -> ExecutionRecord {
        let Some(handler) = self.handlers.get(action.name()) else {
            error!(tool = action.name(), "Tool not found");
            let outcome = Outcome::Failure(ActionError::UnknownTool(action.name().to_string()));
            return ExecutionRecord { action, outcome };
        };

        debug!(tool = action.name(), id = ?action.origin_id(), "Executing tool");

        let outcome = match AssertUnwindSafe(handler.execute(&action)).catch_unwind().await {
            Ok(Ok(value)) => Outcome::Success(value),
            Ok(Err(e)) => {
                error!(tool = action.name(), error = %e, "Tool execution failed");
                Outcome::Failure(ActionError::HandlerError {
                    tool: action.name().to_string(),
                    message: format!("{e:#}"),
                })
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".into());
                error!(tool = action.name(), error = %message, "Tool panicked");
                Outcome::Failure(ActionError::HandlerError {
                    tool: action.name().to_string(),
                    message,
                })
            }
        };

        ExecutionRecord { action, outcome }
    }

    /// Run actions sequentially, in order. A failure never stops the rest.
    pub async fn execute_batch(&self, actions: Vec<Action>) -> BatchOutcome {
        let mut batch = BatchOutcome::default();

        for action in actions {
            let record = self.execute(action).await;

            if record.is_success() {
                if let Some(mv) = SuggestedMove::from_action(&record.action) {
                    if batch.suggested_move.is_none() {
                        batch.suggested_move = Some(mv);
                    } else {
                        info!(ignored = ?mv, "Additional move in batch recorded but not suggested");
                    }
                }
            }

            batch.records.push(record);
        }

        batch
    }
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::with_builtin_tools()
    }
}

/// Specs of the built-in tools.
pub static BUILTIN_TOOLS: &[ToolSpec] = &[MOVE_TOOL];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::{ParamType, ToolParam};
    use serde_json::json;

    const ECHO_TOOL: ToolSpec = ToolSpec {
        name: "echo",
        description: "Echo a value",
        parameters: &[ToolParam {
            name: "text",
            param_type: ParamType::String,
            description: "Text to echo",
            required: true,
        }],
    };

    struct FailingEcho;

    #[async_trait]
    impl ToolHandler for FailingEcho {
        fn spec(&self) -> &'static ToolSpec {
            &ECHO_TOOL
        }
        async fn execute(&self, action: &Action) -> anyhow::Result<Value> {
            match action.argument("text") {
                Some("panic") => panic!("echo exploded"),
                Some("fail") => anyhow::bail!("echo refused"),
                other => Ok(json!(other)),
            }
        }
    }

    fn mv(from: &str, to: &str) -> Action {
        Action::new(&MOVE_TOOL, [("from_position", json!(from)), ("to_position", json!(to))], None)
            .unwrap()
    }

    fn echo(text: &str) -> Action {
        Action::new(&ECHO_TOOL, [("text", json!(text))], None).unwrap()
    }

    #[tokio::test]
    async fn test_two_moves_first_is_suggested() {
        let executor = ActionExecutor::with_builtin_tools();
        let batch = executor.execute_batch(vec![mv("C3", "D4"), mv("E3", "F4")]).await;

        assert_eq!(batch.records.len(), 2);
        assert!(batch.records.iter().all(ExecutionRecord::is_success));
        assert_eq!(
            batch.suggested_move,
            Some(SuggestedMove { from: "C3".into(), to: "D4".into() })
        );
        assert_eq!(batch.records[1].outcome, Outcome::Success(json!("Move executed: E3 -> F4")));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_isolated() {
        let executor = ActionExecutor::with_builtin_tools();
        let batch = executor.execute_batch(vec![echo("hi"), mv("C3", "D4")]).await;

        assert_eq!(batch.records.len(), 2);
        assert_eq!(
            batch.records[0].outcome,
            Outcome::Failure(ActionError::UnknownTool("echo".into()))
        );
        assert!(batch.records[1].is_success());
        assert!(batch.suggested_move.is_some());
    }

    #[tokio::test]
    async fn test_handler_errors_and_panics_are_recorded() {
        let mut executor = ActionExecutor::with_builtin_tools();
        executor.register(Box::new(FailingEcho));

        let batch = executor
            .execute_batch(vec![echo("fail"), echo("panic"), echo("ok"), mv("A3", "B4")])
            .await;

        assert_eq!(batch.records.len(), 4);
        match &batch.records[0].outcome {
            Outcome::Failure(ActionError::HandlerError { tool, message }) => {
                assert_eq!(tool, "echo");
                assert!(message.contains("echo refused"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &batch.records[1].outcome {
            Outcome::Failure(ActionError::HandlerError { message, .. }) => {
                assert!(message.contains("echo exploded"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(batch.records[2].outcome, Outcome::Success(json!("ok")));
        assert_eq!(
            batch.suggested_move,
            Some(SuggestedMove { from: "A3".into(), to: "B4".into() })
        );
    }

    #[test]
    fn test_tool_specs_sorted() {
        let mut executor = ActionExecutor::with_builtin_tools();
        executor.register(Box::new(FailingEcho));
        let names: Vec<&str> = executor.tool_specs().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["echo", "move"]);
        assert!(executor.has("move"));
    }

    #[test]
    fn test_record_wire_shape() {
        let record = ExecutionRecord {
            action: mv("C3", "D4"),
            outcome: Outcome::Failure(ActionError::UnknownTool("move".into())),
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["tool"], "move");
        assert_eq!(v["arguments"]["from_position"], "C3");
        assert_eq!(v["error"], "unknown tool: move");
        assert!(v.get("result").is_none());
    }
}

//! Provider-independent action schema.
//!
//! Every adapter and the text fallback parser produce [`Action`]s, and the
//! only way to build one is through [`ToolSpec`] validation. Whatever shape
//! the model used to ask for a tool, the executor sees the same thing.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ValidationError;

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolParam {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// Static declaration of a tool: the single source of truth for what a
/// valid [`Action`] may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameters in declaration order. Positional call conventions
    /// (e.g. `TOOL_CALL:move:C3:D4`) map onto this order.
    pub parameters: &'static [ToolParam],
}

impl ToolSpec {
    pub fn param(&self, name: &str) -> Option<&ToolParam> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema for the tool's parameters.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in self.parameters {
            properties.insert(
                p.name.to_string(),
                serde_json::json!({
                    "type": p.param_type.as_str(),
                    "description": p.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Plain-text description, for providers that only understand prose.
    pub fn describe(&self) -> String {
        let mut desc = format!("- {}: {}", self.name, self.description);
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|p| format!("{} ({}): {}", p.name, p.param_type.as_str(), p.description))
                .collect();
            desc.push_str(&format!("\n  Parameters: {}", params.join(", ")));
        }
        desc
    }

    /// Validate an argument bundle and coerce every value to a string.
    ///
    /// Keys must be declared, required keys must be present, and every
    /// value must be a non-empty scalar. String values are single tokens.
    pub fn validate<I, K>(&self, args: I) -> Result<BTreeMap<String, String>, ValidationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut out = BTreeMap::new();

        for (key, value) in args {
            let key = key.into();
            let param = self
                .param(&key)
                .ok_or_else(|| ValidationError::UnexpectedArgument {
                    tool: self.name.to_string(),
                    param: key.clone(),
                })?;
            let coerced = self.coerce(param, value)?;
            out.insert(key, coerced);
        }

        for p in self.parameters.iter().filter(|p| p.required) {
            if !out.contains_key(p.name) {
                return Err(ValidationError::MissingArgument {
                    tool: self.name.to_string(),
                    param: p.name.to_string(),
                });
            }
        }

        Ok(out)
    }

    fn coerce(&self, param: &ToolParam, value: Value) -> Result<String, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidValue {
            tool: self.name.to_string(),
            param: param.name.to_string(),
            reason: reason.to_string(),
        };

        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => return Err(invalid("must not be null")),
            Value::Array(_) | Value::Object(_) => return Err(invalid("expected a scalar value")),
        };

        if text.is_empty() {
            return Err(invalid("must not be empty"));
        }

        match param.param_type {
            ParamType::String if text.contains(char::is_whitespace) => {
                Err(invalid("must be a single token"))
            }
            ParamType::String => Ok(text),
            ParamType::Integer => text
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| invalid("expected an integer")),
            ParamType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "false" => Ok(text.to_ascii_lowercase()),
                _ => Err(invalid("expected a boolean")),
            },
        }
    }
}

/// Look up a spec by tool name.
pub fn find_spec<'a>(specs: &'a [ToolSpec], name: &str) -> Option<&'a ToolSpec> {
    specs.iter().find(|s| s.name == name)
}

/// A validated, immutable tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    name: String,
    arguments: BTreeMap<String, String>,
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    origin_id: Option<String>,
}

impl Action {
    /// Build an action for `spec`, validating the arguments.
    pub fn new<I, K>(
        spec: &ToolSpec,
        args: I,
        origin_id: Option<String>,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let arguments = spec.validate(args)?;
        Ok(Self {
            name: spec.name.to_string(),
            arguments,
            origin_id,
        })
    }

    /// Build an action from a tool name and a decoded argument object.
    pub fn from_call(
        specs: &[ToolSpec],
        name: &str,
        args: Map<String, Value>,
        origin_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let spec =
            find_spec(specs, name).ok_or_else(|| ValidationError::UnknownTool(name.to_string()))?;
        Self::new(spec, args, origin_id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &BTreeMap<String, String> {
        &self.arguments
    }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(|s| s.as_str())
    }

    pub fn origin_id(&self) -> Option<&str> {
        self.origin_id.as_deref()
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized output of one `predict` call.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub text_content: String,
    /// In the order the model emitted them (structured) or line order (text).
    pub actions: Vec<Action>,
    /// The provider's response body, untouched.
    pub raw: Value,
    pub finish_reason: String,
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::movement::MOVE_TOOL;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_move_action_from_call() {
        let action = Action::from_call(
            &[MOVE_TOOL],
            "move",
            obj(json!({"from_position": "C3", "to_position": " D4 "})),
            Some("toolu_1".into()),
        )
        .unwrap();

        assert_eq!(action.name(), "move");
        assert_eq!(action.argument("from_position"), Some("C3"));
        assert_eq!(action.argument("to_position"), Some("D4"));
        assert_eq!(action.origin_id(), Some("toolu_1"));
    }

    #[test]
    fn test_missing_argument_rejected() {
        let err = Action::from_call(&[MOVE_TOOL], "move", obj(json!({"from_position": "C3"})), None)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingArgument {
                tool: "move".into(),
                param: "to_position".into()
            }
        );
    }

    #[test]
    fn test_undeclared_argument_rejected() {
        let err = Action::from_call(
            &[MOVE_TOOL],
            "move",
            obj(json!({"from_position": "C3", "to_position": "D4", "promote": true})),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedArgument { .. }));
    }

    #[test]
    fn test_empty_and_structured_values_rejected() {
        let err = Action::from_call(
            &[MOVE_TOOL],
            "move",
            obj(json!({"from_position": "  ", "to_position": "D4"})),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));

        let err = Action::from_call(
            &[MOVE_TOOL],
            "move",
            obj(json!({"from_position": ["C3"], "to_position": "D4"})),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_multi_word_string_rejected() {
        let err = Action::from_call(
            &[MOVE_TOOL],
            "move",
            obj(json!({"from_position": "the piece on C3", "to_position": "D4"})),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidValue {
                tool: "move".into(),
                param: "from_position".into(),
                reason: "must be a single token".into(),
            }
        );
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let err = Action::from_call(&[MOVE_TOOL], "resign", Map::new(), None).unwrap_err();
        assert_eq!(err, ValidationError::UnknownTool("resign".into()));
    }

    #[test]
    fn test_scalar_coercion() {
        let spec = ToolSpec {
            name: "wait",
            description: "Wait a number of turns",
            parameters: &[ToolParam {
                name: "turns",
                param_type: ParamType::Integer,
                description: "How many turns",
                required: true,
            }],
        };
        let action = Action::new(&spec, [("turns", json!(3))], None).unwrap();
        assert_eq!(action.argument("turns"), Some("3"));

        assert!(Action::new(&spec, [("turns", json!("three"))], None).is_err());
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = MOVE_TOOL.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["from_position"]["type"], "string");
        assert_eq!(schema["required"], json!(["from_position", "to_position"]));
    }

    #[test]
    fn test_describe_lists_parameters() {
        let text = MOVE_TOOL.describe();
        assert!(text.starts_with("- move: "));
        assert!(text.contains("from_position (string)"));
        assert!(text.contains("to_position (string)"));
    }
}

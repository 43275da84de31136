//! Inline JSON tool-call objects.
//!
//! Every balanced `{...}` fragment that mentions `"name"` is decoded on its
//! own, so one broken fragment never hides the ones after it.

use serde_json::{Map, Value};
use tracing::debug;

use super::text_call_id;
use crate::provider::types::{find_spec, Action, ToolSpec};

/// Keys models use for the argument bundle.
const ARGUMENT_KEYS: &[&str] = &["arguments", "parameters"];

pub fn parse(text: &str, tools: &[ToolSpec]) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        match balanced_end(text, start) {
            Some(end) => {
                let fragment = &text[start..end];
                if let Some(action) = parse_fragment(fragment, tools, actions.len()) {
                    actions.push(action);
                    cursor = end;
                    continue;
                }
            }
            None => debug!(offset = start, "Unterminated JSON fragment, skipping"),
        }
        // Not a call: nested objects may still hold one.
        cursor = start + 1;
    }

    actions
}

/// Byte index one past the brace closing the object opened at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_fragment(fragment: &str, tools: &[ToolSpec], index: usize) -> Option<Action> {
    if !fragment.contains("\"name\"") {
        return None;
    }

    let value: Value = match serde_json::from_str(fragment) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Candidate JSON fragment did not parse, skipping");
            return None;
        }
    };

    let name = value.get("name")?.as_str()?;
    let spec = find_spec(tools, name)?;

    let args = ARGUMENT_KEYS.iter().find_map(|k| value.get(*k))?;
    let args: Map<String, Value> = match args {
        Value::Object(map) => map.clone(),
        Value::String(s) => serde_json::from_str(s).ok()?,
        _ => return None,
    };

    match Action::new(spec, args, text_call_id(index)) {
        Ok(action) => Some(action),
        Err(e) => {
            debug!(tool = name, error = %e, "JSON fragment arguments rejected, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::movement::MOVE_TOOL;

    #[test]
    fn test_broken_fragment_does_not_stop_scan() {
        let text = r#"
            Attempt: {"name": "move", "arguments": {"from_position": "C3", "to_position": }
            Fixed:   {"name": "move", "arguments": {"from_position": "C3", "to_position": "D4"}}
        "#;
        let actions = parse(text, &[MOVE_TOOL]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].argument("to_position"), Some("D4"));
    }

    #[test]
    fn test_nested_call_object() {
        let text = r#"{"tool_call": {"name": "move", "arguments": {"from_position": "A3", "to_position": "B4"}}}"#;
        let actions = parse(text, &[MOVE_TOOL]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].argument("from_position"), Some("A3"));
    }

    #[test]
    fn test_string_encoded_arguments_and_braces_in_strings() {
        let text = r#"{"name": "move", "note": "use {braces} freely", "arguments": "{\"from_position\": \"E3\", \"to_position\": \"D4\"}"}"#;
        let actions = parse(text, &[MOVE_TOOL]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].argument("from_position"), Some("E3"));
        assert_eq!(actions[0].argument("to_position"), Some("D4"));
    }

    #[test]
    fn test_unknown_tool_and_missing_arguments_ignored() {
        let text = r#"{"name": "resign", "arguments": {}} {"name": "move"} {"name": "move", "arguments": {"from_position": "C3"}}"#;
        assert!(parse(text, &[MOVE_TOOL]).is_empty());
    }

    #[test]
    fn test_parameters_key_and_order() {
        let text = r#"
            {"name": "move", "parameters": {"from_position": "C3", "to_position": "D4"}}
            {"name": "move", "arguments": {"from_position": "D4", "to_position": "E5"}}
        "#;
        let actions = parse(text, &[MOVE_TOOL]);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].argument("to_position"), Some("D4"));
        assert_eq!(actions[1].argument("to_position"), Some("E5"));
        assert_eq!(actions[1].origin_id(), Some("text_call_1"));
    }

    #[test]
    fn test_unterminated_fragment() {
        assert!(parse(r#"{"name": "move", "arguments": {"from_position": "C3""#, &[MOVE_TOOL]).is_empty());
    }
}

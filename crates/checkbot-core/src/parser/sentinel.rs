//! `TOOL_CALL:<name>:<arg1>:<arg2>` lines.
//!
//! The sentinel may sit anywhere in a line. A call ends at the first
//! whitespace that does not directly follow a `:`, so `TOOL_CALL: move: G3: H4`
//! still reads as one call while trailing prose never supplies a field.
//! Positional arguments map onto the tool's parameters in declaration order.

use tracing::debug;

use super::{clean_token, text_call_id};
use crate::provider::types::{find_spec, Action, ToolSpec};
use serde_json::Value;

pub const SENTINEL: &str = "TOOL_CALL:";

/// Minimum colon-delimited fields: sentinel, tool name, two arguments.
const MIN_FIELDS: usize = 4;

pub fn parse(text: &str, tools: &[ToolSpec]) -> Vec<Action> {
    let mut actions = Vec::new();

    for line in text.lines().map(str::trim) {
        for (start, _) in line.match_indices(SENTINEL) {
            if let Some(action) = parse_call(&line[start..], tools, actions.len()) {
                actions.push(action);
            }
        }
    }

    actions
}

fn parse_call(call: &str, tools: &[ToolSpec], index: usize) -> Option<Action> {
    let call = call_token(call);
    let fields: Vec<&str> = call.split(':').collect();
    if fields.len() < MIN_FIELDS {
        debug!(line = %call, "Sentinel with too few fields, skipping");
        return None;
    }

    let name = clean_token(fields[1]);
    let spec = match find_spec(tools, name) {
        Some(spec) => spec,
        None => {
            debug!(tool = name, "Sentinel names an unknown tool, skipping");
            return None;
        }
    };

    let args = spec
        .parameters
        .iter()
        .zip(fields[2..].iter())
        .map(|(param, raw)| (param.name, Value::String(clean_token(raw).to_string())));

    match Action::new(spec, args, text_call_id(index)) {
        Ok(action) => Some(action),
        Err(e) => {
            debug!(tool = name, error = %e, "Sentinel arguments rejected, skipping");
            None
        }
    }
}

/// The call text up to its first whitespace, with whitespace after each
/// `:` dropped.
fn call_token(call: &str) -> String {
    let mut token = String::new();
    let mut after_colon = false;
    for c in call.chars() {
        if c.is_whitespace() {
            if after_colon {
                continue;
            }
            break;
        }
        after_colon = c == ':';
        token.push(c);
    }
    token
}

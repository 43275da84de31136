//! Function-call syntax and loose key/value blocks.
//!
//! Catches the shapes the stricter strategies miss:
//!
//! - `move(from_position="C3", to_position="D4")`, also with single quotes,
//!   reordered keywords or bare positional values;
//! - `"name": "move" ... "from_position": "C3" ... "to_position": "D4"` in
//!   declared field order or reversed, as produced by half-formed JSON.
//!
//! Matches are reported in the order they appear in the text.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::{clean_token, text_call_id};
use crate::provider::types::{Action, ToolSpec};

pub fn parse(text: &str, tools: &[ToolSpec]) -> Vec<Action> {
    let mut found: Vec<(usize, &ToolSpec, Vec<(String, Value)>)> = Vec::new();

    for spec in tools {
        found.extend(
            call_matches(text, spec)
                .into_iter()
                .map(|(pos, args)| (pos, spec, args)),
        );
        found.extend(
            key_value_matches(text, spec)
                .into_iter()
                .map(|(pos, args)| (pos, spec, args)),
        );
    }

    found.sort_by_key(|(pos, _, _)| *pos);

    let mut actions = Vec::new();
    for (_, spec, args) in found {
        match Action::new(spec, args, text_call_id(actions.len())) {
            Ok(action) => actions.push(action),
            Err(e) => debug!(tool = spec.name, error = %e, "Call-syntax arguments rejected, skipping"),
        }
    }
    actions
}

/// `name(arg, key="value", ...)` occurrences.
///
/// Bare positional values (neither keyed nor quoted) count only in a tight
/// `name(` call and only as single tokens. `move (quickly, carefully)` is
/// prose.
fn call_matches(text: &str, spec: &ToolSpec) -> Vec<(usize, Vec<(String, Value)>)> {
    let pattern = format!(r"\b{}(\s*)\(([^()]*)\)", regex::escape(spec.name));
    let Ok(call_re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let Ok(arg_re) = Regex::new(r#"^\s*(?:(\w+)\s*[=:]\s*)?(.*?)\s*$"#) else {
        return Vec::new();
    };

    call_re
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tight = caps.get(1)?.as_str().is_empty();
            let inner = caps.get(2)?.as_str();
            if inner.trim().is_empty() {
                return None;
            }

            let mut args = Vec::new();
            for (i, piece) in inner.split(',').enumerate() {
                let arg = arg_re.captures(piece)?;
                let raw = arg.get(2)?.as_str();
                let key = match arg.get(1) {
                    Some(k) => k.as_str().to_string(),
                    None if is_quoted(raw) => spec.parameters.get(i)?.name.to_string(),
                    None if tight && !raw.contains(char::is_whitespace) => {
                        spec.parameters.get(i)?.name.to_string()
                    }
                    None => return None,
                };
                args.push((key, Value::String(clean_token(raw).to_string())));
            }
            Some((whole.start(), args))
        })
        .collect()
}

fn is_quoted(raw: &str) -> bool {
    let raw = raw.trim();
    raw.len() >= 2
        && ['"', '\'', '`']
            .iter()
            .any(|&q| raw.starts_with(q) && raw.ends_with(q))
}

/// `"name": "<tool>"` followed by every parameter as a `"key": "value"`
/// pair, in declared order or reversed.
fn key_value_matches(text: &str, spec: &ToolSpec) -> Vec<(usize, Vec<(String, Value)>)> {
    if spec.parameters.is_empty() {
        return Vec::new();
    }

    let declared: Vec<&str> = spec.parameters.iter().map(|p| p.name).collect();
    let reversed: Vec<&str> = declared.iter().rev().copied().collect();
    let orders = if declared.len() > 1 {
        vec![declared, reversed]
    } else {
        vec![declared]
    };

    let mut out = Vec::new();
    for order in orders {
        let mut pattern = format!(r#""name"\s*:\s*"{}""#, regex::escape(spec.name));
        for key in &order {
            pattern.push_str(&format!(r#"[^}}]*?"{}"\s*:\s*"([^"]*)""#, regex::escape(key)));
        }
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };

        for caps in re.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let args = order
                .iter()
                .enumerate()
                .filter_map(|(i, key)| {
                    caps.get(i + 1)
                        .map(|m| (key.to_string(), Value::String(m.as_str().to_string())))
                })
                .collect();
            out.push((whole.start(), args));
        }
    }
    out
}

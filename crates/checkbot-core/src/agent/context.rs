//! Prompt rendering for move prediction.
//!
//! Turns a game client's board snapshot into the system message and user
//! prompt handed to a provider. The snapshot is plain JSON; every field is
//! optional and rendered with a placeholder when absent.

use serde_json::Value;

/// Renders prompt text from a board snapshot.
pub trait PromptRenderer: Send + Sync {
    fn system_message(&self) -> String;
    fn user_prompt(&self, board_state: &Value) -> String;
}

/// American checkers (English draughts) prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckersPrompt;

const SYSTEM_MESSAGE: &str = "\
You are a competitive checkers-playing AI following official American Checkers \
(English Draughts) rules. Your only objective is to win.

You have access to the following tool:
move: Execute your chosen move using algebraic notation.
Format: move(from_position, to_position)

Rules summary:
- Play happens on dark squares of an 8x8 board.
- Regular pieces move diagonally forward one square; kings move diagonally in any direction.
- Jumps are mandatory, and multi-jumps must be completed.
- Pieces reaching the far row become kings.
- A player with no pieces or no legal moves loses.

CRITICAL: You MUST call the move tool with exact notation taken from the available moves list.";

impl PromptRenderer for CheckersPrompt {
    fn system_message(&self) -> String {
        SYSTEM_MESSAGE.to_string()
    }

    fn user_prompt(&self, board_state: &Value) -> String {
        let player = str_field(board_state, "currentPlayer").unwrap_or("unknown");
        let mut out = String::new();

        out.push_str(&format!("Analyze this checkers position for {player} player:\n\n"));

        out.push_str("CURRENT BOARD STATE:\n");
        out.push_str(&format!("- Current Player: {player}\n"));
        out.push_str(&format!(
            "- Game Phase: {}\n",
            str_field(board_state, "gamePhase").unwrap_or("unknown")
        ));
        out.push_str(&format!("- Turn Number: {}\n", scalar(board_state.get("turnNumber"), "?")));
        out.push_str(&format!(
            "- Must Jump: {}\n\n",
            board_state.get("mustJump").and_then(Value::as_bool).unwrap_or(false)
        ));

        out.push_str("PIECE COUNT:\n");
        for color in ["red", "white"] {
            let counts = board_state.get("pieceCount").and_then(|c| c.get(color));
            out.push_str(&format!(
                "- {}: {} pieces ({} kings)\n",
                capitalize(color),
                scalar(counts.and_then(|c| c.get("total")), "?"),
                scalar(counts.and_then(|c| c.get("kings")), "0"),
            ));
        }

        out.push_str("\nBOARD LAYOUT:\n");
        out.push_str(
            str_field(board_state, "boardString").unwrap_or("Board representation not available"),
        );
        out.push_str(
            "\n\nLegend: r=red piece, R=red king, w=white piece, W=white king, .=empty dark square\n\n",
        );

        out.push_str(&format!("AVAILABLE MOVES FOR {}:\n", player.to_uppercase()));
        out.push_str(&render_moves(board_state.get("availableMoves")));

        out.push_str("\n\nOPPONENT PIECES:\n");
        out.push_str(&render_pieces(board_state.get("opponentPieces")));

        out.push_str(
            "\n\nChoose the best move from the available options, call the move tool with \
             exact notation, then explain your reasoning.\n\
             Remember: you MUST call move(from_position=\"X\", to_position=\"Y\") with your final decision!",
        );

        out
    }
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str)
}

/// Display a JSON scalar without quotes, or `fallback` when absent.
fn scalar(v: Option<&Value>, fallback: &str) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

fn notation(v: Option<&Value>) -> Option<&str> {
    v.and_then(|p| p.get("notation")).and_then(Value::as_str)
}

fn render_moves(moves: Option<&Value>) -> String {
    let lines: Vec<String> = moves
        .and_then(Value::as_array)
        .map(|moves| {
            moves
                .iter()
                .filter_map(|m| {
                    let from = notation(m.get("from"))?;
                    let to = notation(m.get("to"))?;
                    let jump = if m.get("isJump").and_then(Value::as_bool).unwrap_or(false) {
                        " (JUMP - MANDATORY)"
                    } else {
                        ""
                    };
                    Some(format!("  • {from} → {to}{jump}"))
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        "  • No moves available".to_string()
    } else {
        lines.join("\n")
    }
}

fn render_pieces(pieces: Option<&Value>) -> String {
    let lines: Vec<String> = pieces
        .and_then(Value::as_array)
        .map(|pieces| {
            pieces
                .iter()
                .filter_map(|p| {
                    let at = notation(p.get("position"))?;
                    let color = str_field(p, "color").unwrap_or("unknown");
                    let kind = if p.get("isKing").and_then(Value::as_bool).unwrap_or(false) {
                        "king"
                    } else {
                        "piece"
                    };
                    Some(format!("  • {at}: {color} {kind}"))
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        "  • None listed".to_string()
    } else {
        lines.join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renders_snapshot_fields() {
        let state = json!({
            "currentPlayer": "red",
            "gamePhase": "opening",
            "turnNumber": 3,
            "mustJump": true,
            "pieceCount": {"red": {"total": 12, "kings": 0}, "white": {"total": 11, "kings": 1}},
            "boardString": " r r r r\nr r r r ",
            "availableMoves": [
                {"from": {"notation": "C3"}, "to": {"notation": "E5"}, "isJump": true},
                {"from": {"notation": "A3"}, "to": {"notation": "B4"}}
            ],
            "opponentPieces": [
                {"position": {"notation": "D4"}, "color": "white", "isKing": false},
                {"position": {"notation": "H8"}, "color": "white", "isKing": true}
            ]
        });

        let prompt = CheckersPrompt.user_prompt(&state);
        assert!(prompt.starts_with("Analyze this checkers position for red player:"));
        assert!(prompt.contains("- Turn Number: 3\n"));
        assert!(prompt.contains("- Must Jump: true\n"));
        assert!(prompt.contains("- White: 11 pieces (1 kings)"));
        assert!(prompt.contains("AVAILABLE MOVES FOR RED:"));
        assert!(prompt.contains("  • C3 → E5 (JUMP - MANDATORY)"));
        assert!(prompt.contains("  • A3 → B4\n"));
        assert!(prompt.contains("  • H8: white king"));
    }

    #[test]
    fn test_empty_snapshot_uses_placeholders() {
        let prompt = CheckersPrompt.user_prompt(&json!({}));
        assert!(prompt.contains("for unknown player"));
        assert!(prompt.contains("- Turn Number: ?"));
        assert!(prompt.contains("- Red: ? pieces (0 kings)"));
        assert!(prompt.contains("Board representation not available"));
        assert!(prompt.contains("  • No moves available"));
    }

    #[test]
    fn test_system_message_names_move_tool() {
        assert!(CheckersPrompt.system_message().contains("move(from_position, to_position)"));
    }
}

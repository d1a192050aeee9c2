//! Final answer composition.

use capstone_core::chart::ChartPayload;
use capstone_core::message::{Message, Role};

/// Build the response text for a finished turn.
///
/// `turn` is the slice of the thread appended during this turn, starting
/// with the triggering user message. The answer is the content of its last
/// message. If a `tool` message in the turn parses as a chart, the most
/// recent one is appended as a fenced `json` block, unless the answer
/// already contains that JSON verbatim.
pub fn compose_response(turn: &[Message]) -> String {
    let Some(last) = turn.last() else {
        return String::new();
    };
    let answer = last.content.as_str();

    let chart = turn
        .iter()
        .rev()
        .take_while(|m| m.role != Role::User)
        .filter(|m| m.role == Role::Tool)
        .find_map(|m| ChartPayload::detect(&m.content).map(|(_, body)| body));

    match chart {
        Some(body) if !answer.contains(body) => format!("{answer}\n\n```json\n{body}\n```"),
        _ => answer.to_string(),
    }
}

//! Context building for grounded answers.

use crate::vector_store::Passage;

/// Join passages verbatim, one per line, for the grounding prompt.
pub fn format_context_for_prompt(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `max_chars` characters of `content`, with "..." appended when truncated.
pub fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Round a distance to 3 decimal places.
pub fn round_distance(distance: f32) -> f64 {
    (f64::from(distance) * 1000.0).round() / 1000.0
}

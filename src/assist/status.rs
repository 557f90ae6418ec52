//! Status-bar text for assist requests.

/// Longest error detail shown after the status prefix.
pub const MAX_ERROR_DETAIL: usize = 70;
/// Longest preflight (model check) detail.
pub const MAX_PREFLIGHT_DETAIL: usize = 80;
/// Preview length once a response is complete.
pub const FINAL_PREVIEW_LEN: usize = 60;
/// Preview length while streaming.
pub const STREAM_PREVIEW_LEN: usize = 50;

/// Cut `s` to at most `max` chars, ending in `...` when shortened.
/// Never splits a multi-byte char.
pub fn truncate_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Single-line, trimmed preview of a response.
pub fn preview(response: &str, max: usize) -> String {
    let flat = response.replace('\r', "").replace('\n', " ");
    truncate_display(flat.trim(), max)
}

/// Lines in a response, counting a trailing partial line.
pub fn response_lines(response: &str) -> usize {
    response.matches('\n').count() + 1
}

pub fn ready_message(response: &str, streaming: bool) -> String {
    let mut shown = preview(response, FINAL_PREVIEW_LEN);
    if shown.is_empty() {
        shown = "[Response ready]".to_string();
    }
    let head = if streaming { "Stream complete" } else { "AI response ready" };
    format!(
        "{head} ({} lines). Preview: {shown} | :insert-ai to insert",
        response_lines(response)
    )
}

pub fn streaming_message(response: &str) -> String {
    format!("Streaming: {}", preview(response, STREAM_PREVIEW_LEN))
}

pub fn preflight_message(detail: &str) -> String {
    format!("Model error: {}", truncate_display(detail, MAX_PREFLIGHT_DETAIL))
}

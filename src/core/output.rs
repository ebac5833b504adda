//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps command result output bounded and readable while preserving signal.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render an optional free-text field as a bounded preview, or a dash.
pub fn compact_opt(input: Option<&str>, max_chars: usize) -> String {
    match input {
        Some(s) if !s.trim().is_empty() => compact_line(s, max_chars),
        _ => "-".to_string(),
    }
}

//! CLI commands implementation

pub mod graph;
pub mod import;
pub mod init;
pub mod query;
pub mod status;

pub use graph::*;
pub use import::*;
pub use init::*;
pub use query::*;
pub use status::*;

/// Cut `text` to `max_chars` characters, appending `...` when shortened
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Format a count with thousands separators (`12,345`)
pub fn format_count(count: i64) -> String {
    let digits = count.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if count < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

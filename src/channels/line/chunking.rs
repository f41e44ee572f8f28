//! Splitting replies to fit LINE's message limits
//!
//! A text message holds at most 5000 characters and one reply call carries at
//! most 5 messages.

/// Per-message character limit
pub const MAX_TEXT_CHARS: usize = 5000;

/// Messages allowed in one reply call
pub const MAX_MESSAGES_PER_REPLY: usize = 5;

/// Split `text` into at most `max_messages` chunks of at most `limit` characters.
///
/// Breaks on the last newline inside the window when there is one, otherwise
/// at the character limit. Text beyond the last allowed chunk is dropped.
/// Empty or whitespace-only input yields no chunks.
#[must_use]
pub fn chunk_reply(text: &str, limit: usize, max_messages: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() && chunks.len() < max_messages {
        let Some((window_end, _)) = rest.char_indices().nth(limit) else {
            chunks.push(rest.to_string());
            break;
        };

        let cut = rest[..window_end]
            .rfind('\n')
            .filter(|&i| i > 0)
            .unwrap_or(window_end);

        chunks.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() && chunks.len() == max_messages {
        tracing::warn!(
            dropped_chars = rest.chars().count(),
            "reply exceeds LINE message limits, truncating"
        );
    }

    chunks
}

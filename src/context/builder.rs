//! Prompt composer for the secretary persona
//!
//! Fragment order is fixed: instructions first, then the clock and history,
//! then the live question, then the behavioral directives.

use chrono::NaiveDateTime;

use crate::db::HistoryEntry;

/// Persona instruction, always the first fragment
pub const PERSONA: &str = "You are a secretary. Your job is to answer the user's questions based on \
your chat history with them.";

/// Introduces the history block
pub const HISTORY_HEADER: &str = "Here is the chat history so far, newest first:";

/// Introduces the live message
pub const UTTERANCE_HEADER: &str = "Given the chat history above, the user now says to you:";

/// Rendered in place of a history row that failed to decode
pub const UNDECODABLE_PLACEHOLDER: &str = "system: user sent a message but failed to decode";

/// Behavioral directives, always the last fragments
pub const DIRECTIVES: [&str; 7] = [
    "Give them a fitting reply. Do not use markdown syntax and keep the tone as natural as possible.",
    "Note: the question may or may not be related to the chat history; decide for yourself.",
    "Note: as a secretary, avoid drifting into pointless tangents with the user.",
    "Note: answer the user directly instead of saying things like \"based on our chat history, \
I should answer...\".",
    "Note: when the user asks about a photo, what you see is the photo already converted into a text \
description, but treat it as a \"photo\" rather than a \"photo description\", because to the user it \
feels like they uploaded a photo.",
    "Note: to sound natural, do not end with a period or add unnecessary emoji.",
    "Note: if they ask about \"this\", it means the most recent items in the chat history; the history \
is ordered by time, so \"this\" is whatever was sent to you most recently.",
];

/// Ordered text fragments for one model call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptContext {
    fragments: Vec<String>,
}

impl PromptContext {
    /// Context consisting of the user's message alone
    #[must_use]
    pub fn single(message: &str) -> Self {
        Self {
            fragments: vec![message.to_string()],
        }
    }

    /// Fragments in send order
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn push(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }
}

impl From<Vec<String>> for PromptContext {
    fn from(fragments: Vec<String>) -> Self {
        Self { fragments }
    }
}

/// Composes the secretary prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    /// Create a new composer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build the prompt for `message` given the user's history
    ///
    /// `history` is rendered in the order given, which is newest first when it
    /// comes from [`crate::db::HistoryRepo::fetch_history`]. The output only
    /// depends on the arguments.
    #[must_use]
    pub fn compose(&self, history: &[HistoryEntry], message: &str, now: NaiveDateTime) -> PromptContext {
        let mut ctx = PromptContext::default();

        ctx.push(PERSONA);
        ctx.push(format_clock(now));
        ctx.push(HISTORY_HEADER);

        for entry in history {
            ctx.push(format_entry(entry));
        }

        ctx.push(UTTERANCE_HEADER);
        ctx.push(message);

        for directive in DIRECTIVES {
            ctx.push(directive);
        }

        ctx
    }
}

fn format_clock(now: NaiveDateTime) -> String {
    format!(
        "The current time is {}, {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        now.format("%A")
    )
}

fn format_entry(entry: &HistoryEntry) -> String {
    match entry {
        HistoryEntry::Message(msg) => format!("{}: {}", msg.role, msg.content),
        HistoryEntry::Undecodable => UNDECODABLE_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::db::{MessageKind, MessageRole, StoredMessage};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(14, 3, 9)
            .unwrap()
    }

    fn entry(role: MessageRole, kind: MessageKind, content: &str) -> HistoryEntry {
        HistoryEntry::Message(StoredMessage {
            id: content.to_string(),
            user_id: "U1".to_string(),
            role,
            kind,
            content: content.to_string(),
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        })
    }

    #[test]
    fn empty_history_layout() {
        let ctx = PromptComposer::new().compose(&[], "Hello", now());
        let f = ctx.fragments();

        assert_eq!(f.len(), 5 + DIRECTIVES.len());
        assert_eq!(f[0], PERSONA);
        assert_eq!(f[1], "The current time is 2024-05-01 14:03:09, Wednesday");
        assert_eq!(f[2], HISTORY_HEADER);
        assert_eq!(f[3], UTTERANCE_HEADER);
        assert_eq!(f[4], "Hello");
        assert_eq!(&f[5..], DIRECTIVES.map(String::from).as_slice());
    }

    #[test]
    fn history_rendered_in_given_order() {
        let history = vec![
            entry(MessageRole::Bot, MessageKind::Text, "It is sunny"),
            entry(MessageRole::User, MessageKind::Image, "a receipt from a cafe"),
            HistoryEntry::Undecodable,
            entry(MessageRole::User, MessageKind::Text, "What's the weather?"),
        ];

        let ctx = PromptComposer::new().compose(&history, "And tomorrow?", now());
        let f = ctx.fragments();

        assert_eq!(f[2], HISTORY_HEADER);
        assert_eq!(f[3], "bot: It is sunny");
        assert_eq!(f[4], "user: a receipt from a cafe");
        assert_eq!(f[5], UNDECODABLE_PLACEHOLDER);
        assert_eq!(f[6], "user: What's the weather?");
        assert_eq!(f[7], UTTERANCE_HEADER);
        assert_eq!(f[8], "And tomorrow?");
    }

    #[test]
    fn deterministic() {
        let history = vec![entry(MessageRole::User, MessageKind::Text, "hi")];
        let composer = PromptComposer::new();

        let a = composer.compose(&history, "again", now());
        let b = composer.compose(&history, "again", now());
        assert_eq!(a, b);
    }

    #[test]
    fn message_is_verbatim() {
        let message = "  multi\nline <b>text</b> ";
        let ctx = PromptComposer::new().compose(&[], message, now());
        assert_eq!(ctx.fragments()[4], message);
    }

    #[test]
    fn single_context() {
        let ctx = PromptContext::single("Hello");
        assert_eq!(ctx.fragments(), ["Hello".to_string()]);
        assert_eq!(ctx.len(), 1);
    }
}

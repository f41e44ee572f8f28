//! LINE Messaging API wire types
//!
//! Only the fields the relay reads are modelled; unknown event and message
//! kinds decode to `Other` so a batch never fails on a kind we don't handle.

use serde::{Deserialize, Serialize};

/// Webhook delivery body
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRequest {
    /// Bot user ID the delivery is addressed to
    #[serde(default)]
    pub destination: String,

    /// Events in delivery order
    pub events: Vec<Event>,
}

/// A webhook event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// A user sent a message
    Message(MessageEvent),
    /// Any other event kind (follow, unfollow, postback, ...)
    #[serde(other)]
    Other,
}

/// Event fired when a user sends a message
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Single-use token for the reply API
    ///
    /// Absent for events delivered while the channel is in standby mode.
    #[serde(default)]
    pub reply_token: Option<String>,

    /// Who sent the message
    pub source: Source,

    /// Message payload
    pub message: MessageContent,

    /// Milliseconds since the epoch
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub webhook_event_id: Option<String>,
}

/// Event source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Source {
    /// One-on-one chat
    User { user_id: String },
    /// Group chat
    Group {
        group_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Multi-person chat
    Room {
        room_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
}

impl Source {
    /// Identifier history is kept under
    ///
    /// The sending user when known, otherwise the group or room.
    #[must_use]
    pub fn history_key(&self) -> &str {
        match self {
            Self::User { user_id } => user_id,
            Self::Group { group_id, user_id } => user_id.as_deref().unwrap_or(group_id),
            Self::Room { room_id, user_id } => user_id.as_deref().unwrap_or(room_id),
        }
    }
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { id: String, text: String },
    Image { id: String },
    /// Video, audio, file, location, sticker, ...
    #[serde(other)]
    Other,
}

/// Reply API request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessageRequest<'a> {
    pub reply_token: &'a str,
    pub messages: Vec<OutgoingMessage>,
}

/// Outgoing message payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Text { text: String },
}

/// Error body returned by the Messaging API
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub message: String,
}

//! Messaging channel adapters
//!
//! The relay talks to its chat platform only through the `Channel` trait, so
//! handlers can be driven by a recording fake in tests.

pub mod line;

use async_trait::async_trait;

pub use line::LineChannel;

use crate::Result;

/// Binary message content downloaded from a channel
#[derive(Debug, Clone)]
pub struct MessageContentData {
    /// Raw bytes
    pub data: Vec<u8>,

    /// MIME type reported by the platform
    pub mime_type: String,
}

/// Trait for messaging channel adapters
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Answer an inbound event using its single-use reply token
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;

    /// Download the binary content attached to a message
    async fn fetch_content(&self, message_id: &str) -> Result<MessageContentData>;
}

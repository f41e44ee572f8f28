//! Language model clients

pub mod gemini;

use std::time::Instant;

use async_trait::async_trait;

pub use gemini::GeminiClient;

use crate::{Error, Result};
use crate::context::PromptContext;

/// A generative language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Generate a reply for the ordered fragments
    async fn generate(&self, context: &PromptContext) -> Result<String>;

    /// Describe an image as text
    async fn describe_image(&self, data: &[u8], mime_type: &str) -> Result<String>;

    /// Generate a reply, turning any failure into the reply text
    ///
    /// A model error's message is returned as-is so the user sees it in chat;
    /// other errors use their display string.
    async fn ask(&self, context: &PromptContext) -> String {
        let start = Instant::now();
        match self.generate(context).await {
            Ok(reply) => {
                tracing::info!(
                    model = self.name(),
                    elapsed = ?start.elapsed(),
                    context_len = context.len(),
                    "model replied"
                );
                reply
            }
            Err(e) => {
                tracing::error!(model = self.name(), error = %e, "model call failed");
                match e {
                    Error::Model(message) => message,
                    other => other.to_string(),
                }
            }
        }
    }
}

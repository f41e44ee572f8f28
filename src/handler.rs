//! Event dispatch and the per-message relay flow
//!
//! Events are handled one after another in delivery order. Downstream
//! failures are logged and never abort the batch.

use std::sync::Arc;

use chrono::{Local, Utc};

use crate::channels::Channel;
use crate::channels::line::{Event, MessageContent, MessageEvent};
use crate::context::{PromptComposer, PromptContext};
use crate::db::{HistoryEntry, HistoryRepo, MessageKind, MessageRole};
use crate::model::LanguageModel;

/// Relays chat messages to the model and answers them
pub struct MessageHandler {
    channel: Arc<dyn Channel>,
    model: Arc<dyn LanguageModel>,
    history: Option<HistoryRepo>,
    composer: PromptComposer,
    describe_images: bool,
}

impl MessageHandler {
    /// Create a stateless handler: the prompt is the user's text alone
    #[must_use]
    pub fn new(channel: Arc<dyn Channel>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            channel,
            model,
            history: None,
            composer: PromptComposer::new(),
            describe_images: false,
        }
    }

    /// Keep per-user history and compose the full secretary prompt
    #[must_use]
    pub fn with_history(mut self, repo: HistoryRepo) -> Self {
        self.history = Some(repo);
        self
    }

    /// Describe photos and store them in history (requires history)
    #[must_use]
    pub fn describe_images(mut self, enabled: bool) -> Self {
        self.describe_images = enabled;
        self
    }

    /// Whether history is kept
    #[must_use]
    pub const fn has_history(&self) -> bool {
        self.history.is_some()
    }

    /// Handle a decoded batch in order
    ///
    /// Returns how many text messages were relayed.
    pub async fn dispatch(&self, events: &[Event]) -> usize {
        let mut relayed = 0;

        for event in events {
            let Event::Message(message_event) = event else {
                tracing::debug!("ignoring non-message event");
                continue;
            };
            let Some(reply_token) = message_event.reply_token.as_deref() else {
                tracing::debug!(
                    user_id = message_event.source.history_key(),
                    "ignoring message event without reply token"
                );
                continue;
            };

            match &message_event.message {
                MessageContent::Text { text, .. } => {
                    self.handle_text(message_event, reply_token, text).await;
                    relayed += 1;
                }
                MessageContent::Image { id } if self.describe_images => {
                    self.handle_image(message_event, id).await;
                }
                MessageContent::Image { .. } | MessageContent::Other => {
                    tracing::debug!("ignoring non-text message");
                }
            }
        }

        relayed
    }

    /// Relay one text message and send the reply
    pub async fn handle_text(&self, event: &MessageEvent, reply_token: &str, text: &str) {
        let user_id = event.source.history_key();
        tracing::info!(user_id, chars = text.chars().count(), "text message received");

        let context = match &self.history {
            Some(repo) => self.compose_with_history(repo, user_id, text),
            None => PromptContext::single(text),
        };

        let reply = self.model.ask(&context).await;

        if let Err(e) = self.channel.reply(reply_token, &reply).await {
            tracing::error!(channel = self.channel.name(), error = %e, "failed to send reply");
        }

        if reply.trim().is_empty() {
            tracing::warn!(user_id, "model returned an empty reply, not storing it");
            return;
        }

        if let Some(repo) = &self.history {
            if let Err(e) = repo.append(user_id, MessageRole::Bot, MessageKind::Text, &reply, Utc::now()) {
                tracing::warn!(user_id, error = %e, "failed to store bot reply");
            }
        }
    }

    /// Load history, record the new message, and build the prompt
    fn compose_with_history(&self, repo: &HistoryRepo, user_id: &str, text: &str) -> PromptContext {
        let history: Vec<HistoryEntry> = repo.fetch_history(user_id).unwrap_or_else(|e| {
            tracing::warn!(user_id, error = %e, "failed to load history, continuing without it");
            Vec::new()
        });

        if let Err(e) = repo.append(user_id, MessageRole::User, MessageKind::Text, text, Utc::now()) {
            tracing::error!(user_id, error = %e, "failed to store user message");
        }

        let context = self
            .composer
            .compose(&history, text, Local::now().naive_local());
        tracing::debug!(
            user_id,
            history_len = history.len(),
            context_len = context.len(),
            "built prompt context"
        );
        context
    }

    /// Describe a photo and keep the description in history
    async fn handle_image(&self, event: &MessageEvent, message_id: &str) {
        let Some(repo) = &self.history else {
            tracing::debug!("image description needs history, ignoring image");
            return;
        };
        let user_id = event.source.history_key();

        let content = match self.channel.fetch_content(message_id).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(user_id, message_id, error = %e, "failed to download image");
                return;
            }
        };

        let description = match self
            .model
            .describe_image(&content.data, &content.mime_type)
            .await
        {
            Ok(description) => description,
            Err(e) => {
                tracing::error!(user_id, message_id, error = %e, "failed to describe image");
                return;
            }
        };

        if let Err(e) = repo.append(
            user_id,
            MessageRole::User,
            MessageKind::Image,
            &description,
            Utc::now(),
        ) {
            tracing::error!(user_id, error = %e, "failed to store image description");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::channels::MessageContentData;
    use crate::channels::line::Source;
    use crate::db::init_memory;
    use crate::{Error, Result};

    #[derive(Default)]
    struct RecordingChannel {
        replies: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
            self.replies
                .lock()
                .unwrap()
                .push((reply_token.to_string(), text.to_string()));
            Ok(())
        }

        async fn fetch_content(&self, _message_id: &str) -> Result<MessageContentData> {
            Ok(MessageContentData {
                data: vec![0xFF, 0xD8],
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    struct FixedModel;

    #[async_trait]
    impl LanguageModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, context: &PromptContext) -> Result<String> {
            Ok(format!("{} fragments", context.len()))
        }

        async fn describe_image(&self, _data: &[u8], _mime_type: &str) -> Result<String> {
            Err(Error::Model("vision unavailable".to_string()))
        }
    }

    fn text_event(token: &str, text: &str) -> Event {
        Event::Message(MessageEvent {
            reply_token: Some(token.to_string()),
            source: Source::User {
                user_id: "U1".to_string(),
            },
            message: MessageContent::Text {
                id: "1".to_string(),
                text: text.to_string(),
            },
            timestamp: 0,
            webhook_event_id: None,
        })
    }

    #[tokio::test]
    async fn stateless_sends_message_alone() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = MessageHandler::new(channel.clone(), Arc::new(FixedModel));

        let relayed = handler.dispatch(&[text_event("r1", "Hello")]).await;

        assert_eq!(relayed, 1);
        assert_eq!(
            *channel.replies.lock().unwrap(),
            vec![("r1".to_string(), "1 fragments".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_image_description_stores_nothing() {
        let repo = HistoryRepo::new(init_memory().unwrap());
        let channel = Arc::new(RecordingChannel::default());
        let handler = MessageHandler::new(channel.clone(), Arc::new(FixedModel))
            .with_history(repo.clone())
            .describe_images(true);

        let image = Event::Message(MessageEvent {
            reply_token: Some("r1".to_string()),
            source: Source::User {
                user_id: "U1".to_string(),
            },
            message: MessageContent::Image { id: "9".to_string() },
            timestamp: 0,
            webhook_event_id: None,
        });

        assert_eq!(handler.dispatch(&[image]).await, 0);
        assert_eq!(repo.count_for_user("U1").unwrap(), 0);
        assert!(channel.replies.lock().unwrap().is_empty());
    }

    struct BlockedModel;

    #[async_trait]
    impl LanguageModel for BlockedModel {
        fn name(&self) -> &str {
            "blocked"
        }

        async fn generate(&self, _context: &PromptContext) -> Result<String> {
            Ok(String::new())
        }

        async fn describe_image(&self, _data: &[u8], _mime_type: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn empty_reply_is_not_stored() {
        let repo = HistoryRepo::new(init_memory().unwrap());
        let channel = Arc::new(RecordingChannel::default());
        let handler = MessageHandler::new(channel.clone(), Arc::new(BlockedModel)).with_history(repo.clone());

        assert_eq!(handler.dispatch(&[text_event("r1", "Hello")]).await, 1);

        let history = repo.fetch_history("U1").unwrap();
        assert_eq!(history.len(), 1);
        assert!(matches!(
            &history[0],
            HistoryEntry::Message(m) if m.role == MessageRole::User && m.content == "Hello"
        ));
    }

    #[tokio::test]
    async fn event_without_reply_token_is_skipped() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = MessageHandler::new(channel.clone(), Arc::new(FixedModel));

        let mut standby = text_event("unused", "seen elsewhere");
        if let Event::Message(m) = &mut standby {
            m.reply_token = None;
        }

        let relayed = handler.dispatch(&[standby, text_event("r2", "answer me")]).await;

        assert_eq!(relayed, 1);
        assert_eq!(
            *channel.replies.lock().unwrap(),
            vec![("r2".to_string(), "1 fragments".to_string())]
        );
    }
}

//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use line_relay::channels::MessageContentData;
use line_relay::channels::line::{SIGNATURE_HEADER, sign};
use line_relay::{
    ApiState, Channel, DbPool, Error, HistoryRepo, LanguageModel, MessageHandler, PromptContext, Result, db,
};
use secrecy::SecretString;

pub const CHANNEL_SECRET: &str = "test-channel-secret";

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Channel that records replies instead of sending them
#[derive(Default)]
pub struct RecordingChannel {
    pub replies: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingChannel {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
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
        if self.fail {
            return Err(Error::Channel("Invalid reply token".to_string()));
        }
        Ok(())
    }

    async fn fetch_content(&self, message_id: &str) -> Result<MessageContentData> {
        Ok(MessageContentData {
            data: message_id.as_bytes().to_vec(),
            mime_type: "image/jpeg".to_string(),
        })
    }
}

/// Model that answers with a fixed outcome and records every context
pub struct ScriptedModel {
    pub contexts: Mutex<Vec<Vec<String>>>,
    outcome: std::result::Result<String, String>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            contexts: Mutex::new(Vec::new()),
            outcome: Ok(reply.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            contexts: Mutex::new(Vec::new()),
            outcome: Err(message.to_string()),
        }
    }

    pub fn contexts(&self) -> Vec<Vec<String>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, context: &PromptContext) -> Result<String> {
        self.contexts.lock().unwrap().push(context.fragments().to_vec());
        self.outcome.clone().map_err(Error::Model)
    }

    async fn describe_image(&self, data: &[u8], _mime_type: &str) -> Result<String> {
        Ok(format!("a photo of {}", String::from_utf8_lossy(data)))
    }
}

/// Build the app router around the given fakes
pub fn build_router(
    channel: Arc<RecordingChannel>,
    model: Arc<ScriptedModel>,
    history: Option<HistoryRepo>,
) -> axum::Router {
    let mut handler = MessageHandler::new(channel, model);
    if let Some(repo) = history {
        handler = handler.with_history(repo).describe_images(true);
    }

    let state = ApiState {
        channel_secret: SecretString::from(CHANNEL_SECRET.to_string()),
        handler,
    };
    line_relay::api::router(Arc::new(state))
}

/// A text message event from `user_id`
pub fn text_event(reply_token: &str, user_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1_700_000_000_000_i64,
        "replyToken": reply_token,
        "source": {"type": "user", "userId": user_id},
        "message": {"type": "text", "id": "100", "text": text}
    })
}

/// Delivery body for `events`
pub fn delivery(events: Vec<serde_json::Value>) -> String {
    serde_json::json!({"destination": "Ubot", "events": events}).to_string()
}

/// A correctly signed webhook request
pub fn signed_request(body: &str) -> Request<Body> {
    let signature = sign(CHANNEL_SECRET, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/callback")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

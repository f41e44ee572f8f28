//! LINE channel adapter
//!
//! Receives deliveries through the `/callback` webhook and answers through the
//! Messaging API reply endpoint.

pub mod chunking;
pub mod signature;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::{Channel, MessageContentData};
use crate::{Error, Result};

pub use chunking::{MAX_MESSAGES_PER_REPLY, MAX_TEXT_CHARS, chunk_reply};
pub use signature::{SIGNATURE_HEADER, sign, verify_signature};
pub use types::{CallbackRequest, Event, MessageContent, MessageEvent, OutgoingMessage, Source};

/// Messaging API base
const API_BASE: &str = "https://api.line.me";

/// Content (binary data) API base
const DATA_API_BASE: &str = "https://api-data.line.me";

/// Verify and decode one webhook delivery
///
/// `signature` is the `x-line-signature` header value, if present.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] when the signature is missing or does
/// not match, and [`Error::Payload`] when the body is not a valid delivery.
pub fn parse_request(channel_secret: &str, signature: Option<&str>, body: &[u8]) -> Result<CallbackRequest> {
    let Some(signature) = signature else {
        return Err(Error::InvalidSignature);
    };
    if !verify_signature(channel_secret, body, signature) {
        return Err(Error::InvalidSignature);
    }

    serde_json::from_slice(body).map_err(|e| Error::Payload(e.to_string()))
}

/// LINE channel adapter
pub struct LineChannel {
    token: SecretString,
    client: Client,
    api_base: String,
    data_api_base: String,
}

impl LineChannel {
    /// Create a new LINE channel adapter
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            client: Client::new(),
            api_base: API_BASE.to_string(),
            data_api_base: DATA_API_BASE.to_string(),
        }
    }

    /// Point the adapter at different API hosts
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>, data_api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.data_api_base = data_api_base.into();
        self
    }

    /// Send messages through the reply API
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or LINE rejects it
    pub async fn reply_message(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let request = types::ReplyMessageRequest {
            reply_token,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("LINE reply error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<types::ApiErrorResponse>(&body)
                .map_or(body, |e| e.message);
            return Err(Error::Channel(format!("LINE reply error: {status} - {detail}")));
        }

        tracing::debug!(count = request.messages.len(), "LINE reply sent");
        Ok(())
    }

    /// Download the binary content of a message
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the content is unavailable
    pub async fn get_message_content(&self, message_id: &str) -> Result<MessageContentData> {
        let url = format!("{}/v2/bot/message/{message_id}/content", self.data_api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::Channel(format!("LINE content error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!("LINE content error: {status} - {body}")));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Channel(format!("LINE content read error: {e}")))?
            .to_vec();

        tracing::debug!(message_id, bytes = data.len(), %mime_type, "LINE content downloaded");
        Ok(MessageContentData { data, mime_type })
    }
}

#[async_trait]
impl Channel for LineChannel {
    fn name(&self) -> &'static str {
        "line"
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let messages: Vec<OutgoingMessage> = chunk_reply(text, MAX_TEXT_CHARS, MAX_MESSAGES_PER_REPLY)
            .into_iter()
            .map(|text| OutgoingMessage::Text { text })
            .collect();

        if messages.is_empty() {
            tracing::warn!("empty reply, nothing sent");
            return Ok(());
        }

        self.reply_message(reply_token, messages).await
    }

    async fn fetch_content(&self, message_id: &str) -> Result<MessageContentData> {
        self.get_message_content(message_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cret";

    #[test]
    fn parse_request_accepts_signed_body() {
        let body = br#"{"destination":"U0","events":[{"type":"unfollow","source":{"type":"user","userId":"U1"}}]}"#;
        let sig = sign(SECRET, body);

        let req = parse_request(SECRET, Some(&sig), body).unwrap();
        assert_eq!(req.destination, "U0");
        assert!(matches!(req.events[..], [Event::Other]));
    }

    #[test]
    fn parse_request_rejects_missing_signature() {
        let err = parse_request(SECRET, None, b"{}").unwrap_err();
        assert!(matches!(err, Error::InvalidSignature));
    }

    #[test]
    fn parse_request_checks_signature_before_decoding() {
        let err = parse_request(SECRET, Some("AAAA"), b"not json").unwrap_err();
        assert!(matches!(err, Error::InvalidSignature));
    }

    #[test]
    fn parse_request_reports_bad_payload() {
        let body = b"not json";
        let sig = sign(SECRET, body);
        let err = parse_request(SECRET, Some(&sig), body).unwrap_err();
        assert!(matches!(err, Error::Payload(_)));
    }
}

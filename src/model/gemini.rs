//! Gemini API client
//!
//! Speaks the `generateContent` REST endpoint directly. Each call starts a
//! fresh [`ChatSession`] that is consumed by its single send.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::LanguageModel;
use crate::context::PromptContext;
use crate::{Error, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Instruction sent alongside a photo
const DESCRIBE_IMAGE_PROMPT: &str = "Describe this photo in detail, including any visible text, \
so it can be referred to later in a conversation.";

/// Gemini client
pub struct GeminiClient {
    api_key: SecretString,
    model: String,
    api_base: String,
    client: Client,
}

/// A single request/response exchange with the model
///
/// Holds no state between calls; dropping it releases everything it owns.
pub struct ChatSession<'a> {
    client: &'a GeminiClient,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// `generateContent` response body
#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Join the text of every part of every candidate, in order, trimmed
    #[must_use]
    pub fn collect_text(&self) -> String {
        let joined: String = self
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        joined.trim().to_string()
    }
}

impl GeminiClient {
    /// Create a new Gemini client
    #[must_use]
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            api_base: GEMINI_API_BASE.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different API host
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Model identifier in use
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start a fresh session
    #[must_use]
    pub const fn start_chat(&self) -> ChatSession<'_> {
        ChatSession { client: self }
    }
}

impl ChatSession<'_> {
    /// Send `parts` as one user message and end the session
    async fn send_message(self, parts: Vec<Part>) -> Result<GenerateResponse> {
        let client = self.client;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            client.api_base, client.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        };

        let response = client
            .client
            .post(&url)
            .header("x-goog-api-key", client.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Model(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Model(format!("failed to read response: {e}")))?;

        tracing::debug!(%status, "Gemini response received");

        let parsed: GenerateResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::Model(format!("API error {status}: {body}")));
            }
            Err(e) => return Err(Error::Model(format!("failed to parse response: {e}"))),
        };

        if let Some(error) = parsed.error {
            return Err(Error::Model(format!("API error {status}: {}", error.message)));
        }
        if !status.is_success() {
            return Err(Error::Model(format!("API error {status}: {body}")));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, context: &PromptContext) -> Result<String> {
        let parts = context
            .fragments()
            .iter()
            .map(|f| Part::Text(f.clone()))
            .collect();

        let response = self.start_chat().send_message(parts).await?;
        Ok(response.collect_text())
    }

    async fn describe_image(&self, data: &[u8], mime_type: &str) -> Result<String> {
        let parts = vec![
            Part::InlineData(InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            Part::Text(DESCRIBE_IMAGE_PROMPT.to_string()),
        ];

        let response = self.start_chat().send_message(parts).await?;
        let description = response.collect_text();
        if description.is_empty() {
            return Err(Error::Model("empty image description".to_string()));
        }

        tracing::info!(bytes = data.len(), chars = description.chars().count(), "image described");
        Ok(description)
    }
}

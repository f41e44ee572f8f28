//! LINE Relay - a LINE webhook bot backed by Gemini
//!
//! Receives signed LINE webhook deliveries, relays text messages to Gemini
//! (optionally with the user's stored chat history), and answers through the
//! LINE reply API.
//!
//! # Architecture
//!
//! ```text
//! POST /callback
//!      │ verify signature, decode events
//!      ▼
//! MessageHandler ──► HistoryRepo (SQLite, optional)
//!      │ PromptComposer
//!      ▼
//! LanguageModel (Gemini) ──► Channel::reply (LINE)
//! ```

pub mod api;
pub mod channels;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod handler;
pub mod model;

pub use api::{ApiServer, ApiState};
pub use channels::{Channel, LineChannel};
pub use config::Config;
pub use context::{PromptComposer, PromptContext};
pub use db::{DbConn, DbPool, HistoryRepo};
pub use error::{Error, Result};
pub use handler::MessageHandler;
pub use model::{GeminiClient, LanguageModel};

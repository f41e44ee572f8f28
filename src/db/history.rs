//! Per-user conversation history
//!
//! An append-only log of exchanged messages. Rows are never updated or
//! deleted; reads are scoped to one user and come back newest first.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Row, params};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Bot,
}

impl MessageRole {
    /// Stored form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stored message holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Text the user or bot wrote
    Text,
    /// Model-generated description of a photo the user sent
    Image,
}

impl MessageKind {
    /// Stored form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// One persisted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: String,
    pub user_id: String,
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A decoded history row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    /// Fully decoded message
    Message(StoredMessage),
    /// Row of a known kind with missing or invalid fields
    Undecodable,
}

/// History repository
#[derive(Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    /// Create a new history repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetch every message for `user_id`, newest first
    ///
    /// Rows of an unknown kind are skipped. Rows of a known kind that fail to
    /// decode are returned as [`HistoryEntry::Undecodable`].
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    pub fn fetch_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, kind, role, content, created_at
             FROM messages WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map([user_id], |row| {
            Ok(RawRow {
                id: text_column(row, 0)?.unwrap_or_default(),
                kind: text_column(row, 1)?,
                role: text_column(row, 2)?,
                content: text_column(row, 3)?,
                created_at: text_column(row, 4)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            if let Some(entry) = row?.decode(user_id) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// Append one message to a user's history
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails
    pub fn append(
        &self,
        user_id: &str,
        role: MessageRole,
        kind: MessageKind,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<StoredMessage> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO messages (id, user_id, role, kind, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                user_id,
                role.as_str(),
                kind.as_str(),
                content,
                format_timestamp(now)
            ],
        )?;

        Ok(StoredMessage {
            id,
            user_id: user_id.to_string(),
            role,
            kind,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Count stored messages for a user
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    pub fn count_for_user(&self, user_id: &str) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Read a column as text, or `None` when it holds anything else
///
/// NULLs, blobs, numbers and invalid UTF-8 all come back as `None` so one
/// damaged row cannot fail the whole query.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(row.get_ref(idx)?.as_str().ok().map(str::to_string))
}

/// Columns as read, before validation
struct RawRow {
    id: String,
    kind: Option<String>,
    role: Option<String>,
    content: Option<String>,
    created_at: Option<String>,
}

impl RawRow {
    fn decode(self, user_id: &str) -> Option<HistoryEntry> {
        let kind = self.kind.as_deref().and_then(MessageKind::from_str)?;

        let role = self.role.as_deref().and_then(MessageRole::from_str);
        let created_at = self.created_at.as_deref().and_then(parse_timestamp);

        let (Some(role), Some(content), Some(created_at)) = (role, self.content, created_at) else {
            tracing::warn!(id = %self.id, user_id, kind = kind.as_str(), "failed to decode stored message");
            return Some(HistoryEntry::Undecodable);
        };

        Some(HistoryEntry::Message(StoredMessage {
            id: self.id,
            user_id: user_id.to_string(),
            role,
            kind,
            content,
            created_at,
        }))
    }
}

/// Fixed-width RFC 3339 so text order matches time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

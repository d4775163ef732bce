//! Wire records shared by the API clients, stores and the real-time channel.
//!
//! Field names follow the backend's camelCase JSON (`documentId`, `lastMessage`, `senderType`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque document id of a chat session.
pub type SessionId = String;

/// Reference to another record: either a bare id or an embedded record carrying `documentId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    #[serde(rename_all = "camelCase")]
    Record { document_id: String },
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Record { document_id } => document_id,
        }
    }
}

/// A chat session as listed in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub document_id: SessionId,
    #[serde(default)]
    pub last_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Who sent a message. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SenderType {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "SERVER")]
    Server,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "USER",
            SenderType::Server => "SERVER",
        }
    }
}

/// One message in a session thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub document_id: String,
    pub text: String,
    pub sender_type: SenderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Reference>,
    /// None for service-originated messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(Reference::id)
    }

    pub fn is_from_user(&self) -> bool {
        self.sender_type == SenderType::User
    }
}

/// User profile as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub document_id: String,
    pub email: String,
    pub username: String,
}

/// `meta.pagination` of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

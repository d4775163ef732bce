//! Uniform API failure shape and its normalization from response bodies.

use serde::{Deserialize, Serialize};

pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred.";
pub const UNEXPECTED_NAME: &str = "UnknownError";
pub const UNEXPECTED_STATUS: u16 = 500;

/// Error returned by every API call: `{ message, name, status }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub name: String,
    pub status: u16,
}

/// Result of every API call.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Status 401; the global sign-out policy has already run.
    Unauthorized,
    /// Structured error reported by the server.
    Server,
    /// Generic fallback: transport failures and unreadable bodies.
    Unexpected,
}

impl ApiError {
    /// The generic fallback error.
    pub fn unexpected() -> Self {
        Self {
            message: UNEXPECTED_MESSAGE.to_string(),
            name: UNEXPECTED_NAME.to_string(),
            status: UNEXPECTED_STATUS,
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        if self.status == 401 {
            ApiErrorKind::Unauthorized
        } else if self.name == UNEXPECTED_NAME {
            ApiErrorKind::Unexpected
        } else {
            ApiErrorKind::Server
        }
    }

    /// Build from a body's `error` object. None when the body has no such object.
    /// Missing or empty fields fall back individually to the generic values.
    pub fn from_error_body(body: &serde_json::Value) -> Option<Self> {
        let err = body.get("error").filter(|e| e.is_object())?;
        let text = |key: &str, default: &str| {
            err.get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let status = err
            .get("status")
            .and_then(|v| v.as_u64())
            .and_then(|s| u16::try_from(s).ok())
            .filter(|s| *s != 0)
            .unwrap_or(UNEXPECTED_STATUS);
        Some(Self {
            message: text("message", UNEXPECTED_MESSAGE),
            name: text("name", UNEXPECTED_NAME),
            status,
        })
    }

    /// Normalize a failure body: structured error if present, else the generic fallback.
    pub fn from_failure_bytes(bytes: &[u8]) -> Self {
        serde_json::from_slice::<serde_json::Value>(bytes)
            .ok()
            .and_then(|v| Self::from_error_body(&v))
            .unwrap_or_else(Self::unexpected)
    }
}

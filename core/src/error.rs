//! Error types for the forum client.
//!
//! # Design
//! `NotFound` and `Unauthorized` get dedicated variants because screens react
//! to them differently (empty listing, redirect to login). Every other non-2xx
//! response lands in `Http` with the raw status and body. A body that is valid
//! JSON but not the expected envelope is `MalformedResponse`, distinct from a
//! body that is not JSON at all.

use thiserror::Error;

use crate::session::SessionKey;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by `ForumClient` parsers and `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned 401 or 403.
    #[error("not authorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (connect, DNS, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body is not JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The response body is JSON but does not match the expected envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A protected operation was attempted without the required session value.
    #[error("missing session data: {0}")]
    MissingSession(SessionKey),

    #[error("session store: {0}")]
    Session(#[from] SessionError),

    /// The request was cancelled before it resolved.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// True when the only sensible reaction is sending the user to login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::MissingSession(_) | ApiError::Unauthorized { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("session lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required value: {0}")]
    Missing(String),
}

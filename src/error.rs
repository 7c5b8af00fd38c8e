use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// Gateway client error types
#[derive(Debug, Error)]
pub enum GowaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// `body` holds the response bytes exactly as received.
    #[error("Gateway returned HTTP {code}: {}", String::from_utf8_lossy(.body))]
    HttpStatus { code: u16, body: Bytes },

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Upload of {} failed: {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,
}

impl GowaError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        GowaError::Validation(message.into())
    }

    /// Returns `true` when retrying the same request may succeed.
    ///
    /// Only network-level failures qualify. Status errors from the gateway,
    /// undecodable payloads and local upload failures are final.
    pub fn is_transient(&self) -> bool {
        match self {
            GowaError::Transport(e) => !(e.is_builder() || e.is_redirect() || e.is_decode()),
            _ => false,
        }
    }

    /// Raw response body of an `HttpStatus` error.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            GowaError::HttpStatus { body, .. } => Some(&body[..]),
            _ => None,
        }
    }

    /// Response body of an `HttpStatus` error as text, invalid UTF-8 replaced.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body().map(String::from_utf8_lossy)
    }

    /// HTTP status code reported by the gateway, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GowaError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

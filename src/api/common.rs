//! Common API response primitives
//!
//! Every gateway response is wrapped in the same envelope:
//!
//! ```json
//! {"code": "SUCCESS", "message": "Success", "results": { ... }}
//! ```
//!
//! This module provides:
//!
//! - [`GatewayResponse`] for the envelope with operation-specific `results`
//! - [`Ack`] for endpoints whose `results` carry nothing of interest
//! - [`Pagination`] as reported by list endpoints
//!
//! ## Usage
//!
//! ```rust
//! use gowa_client::api::common::{GatewayResponse, SendResults};
//!
//! let json = r#"{"code":"SUCCESS","message":"ok","results":{"message_id":"abc","status":"sent"}}"#;
//! let resp: GatewayResponse<SendResults> = serde_json::from_str(json).unwrap();
//! assert_eq!(resp.results.message_id, "abc");
//! assert!(resp.is_success());
//! ```

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::GowaError;

/// `code` value the gateway uses for successful calls.
pub const SUCCESS_CODE: &str = "SUCCESS";

/// The `{code, message, results}` envelope of every gateway response.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayResponse<T> {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    pub results: T,
}

impl<T> GatewayResponse<T> {
    pub fn new(code: impl Into<String>, message: impl Into<String>, results: T) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            results,
        }
    }

    /// `true` when `code` is `SUCCESS`.
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Envelope whose `results` are not inspected.
pub type Ack = GatewayResponse<Option<serde_json::Value>>;

/// Results of every `/send/*` and `/message/*` call.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SendResults {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub status: String,
}

pub type SendResponse = GatewayResponse<SendResults>;

/// Paging metadata attached to list results.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
}

/// Characters escaped when a value becomes a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escape `value` so it stays one path segment (e.g. a JID or message id).
///
/// `.` and `..` are rejected: URL normalization collapses them even when
/// percent-encoded, which would send the call to a different endpoint.
pub(crate) fn path_segment(field: &str, value: &str) -> Result<String, GowaError> {
    require(field, value)?;
    if value == "." || value == ".." {
        return Err(GowaError::validation(format!(
            "{field} must not be \"{value}\""
        )));
    }
    Ok(utf8_percent_encode(value, PATH_SEGMENT).to_string())
}

/// Fail with `GowaError::Validation` when `value` is blank.
pub(crate) fn require(field: &str, value: &str) -> Result<(), GowaError> {
    if value.trim().is_empty() {
        return Err(GowaError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_parsing() {
        let json = r#"{"code":"SUCCESS","message":"ok","results":{"message_id":"abc","status":"sent"}}"#;
        let resp: SendResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.message, "ok");
        assert_eq!(resp.results.message_id, "abc");
        assert_eq!(resp.results.status, "sent");
    }

    #[test]
    fn test_ack_accepts_any_results() {
        for json in [
            r#"{"code":"SUCCESS","message":"Success logout","results":null}"#,
            r#"{"code":"SUCCESS","message":"ok","results":{"anything":[1,2]}}"#,
            r#"{"code":"SUCCESS","message":"ok"}"#,
        ] {
            let ack: Ack = serde_json::from_str(json).unwrap();
            assert!(ack.is_success(), "{json}");
        }
    }

    #[test]
    fn test_envelope_missing_results_fails_for_typed() {
        let json = r#"{"code":"SUCCESS","message":"ok"}"#;
        assert!(serde_json::from_str::<SendResponse>(json).is_err());
    }

    #[test]
    fn test_not_success_code() {
        let resp = GatewayResponse::new("INTERNAL_SERVER_ERROR", "boom", ());
        assert!(!resp.is_success());
    }

    #[test]
    fn test_path_segment_escapes_separators() {
        let segment = |value| path_segment("id", value).unwrap();
        assert_eq!(segment("5511999@s.whatsapp.net"), "5511999%40s.whatsapp.net");
        assert_eq!(segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(segment("3EB0-AB_12.x~"), "3EB0-AB_12.x~");
        assert_eq!(segment("..."), "...");
        assert_eq!(segment("../x"), "..%2Fx");
    }

    #[test]
    fn test_path_segment_rejects_dot_segments() {
        for value in [".", ".."] {
            match path_segment("message_id", value) {
                Err(GowaError::Validation(msg)) => {
                    assert_eq!(msg, format!("message_id must not be \"{value}\""))
                }
                other => panic!("Expected Validation error, got {:?}", other),
            }
        }
        assert!(matches!(
            path_segment("message_id", " "),
            Err(GowaError::Validation(_))
        ));
    }

    #[test]
    fn test_require() {
        assert!(require("phone", "123").is_ok());
        for blank in ["", "   ", "\t\n"] {
            match require("phone", blank) {
                Err(GowaError::Validation(msg)) => assert_eq!(msg, "phone is required"),
                other => panic!("Expected Validation error, got {:?}", other),
            }
        }
    }
}

//! Outbound request description
//!
//! An [`OutboundRequest`] is the transport-independent form of one gateway
//! call. It is cheap to clone so the retry layer can rebuild the HTTP request
//! for each attempt; multipart bodies are described, not materialized, and are
//! encoded afresh every time they are sent.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::GowaError;
use crate::middleware::RetryableRequest;

/// Body of an outbound request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Bytes),
    Multipart(MultipartForm),
}

/// Attachment part of a [`MultipartForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    field_name: String,
    path: PathBuf,
}

impl FilePart {
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Scalar fields plus at most one file, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    file: Option<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Append a text field only when `value` is present.
    pub fn text_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.text(name, value.to_string()),
            None => self,
        }
    }

    /// Attach a local file, streamed under `field_name`.
    ///
    /// A later call replaces the earlier attachment.
    pub fn file(mut self, field_name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.file = Some(FilePart {
            field_name: field_name.into(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn file_part(&self) -> Option<&FilePart> {
        self.file.as_ref()
    }
}

/// A single logical call to the gateway.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    headers: HeaderMap,
    cancel: Option<CancellationToken>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
            cancel: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append one query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append query parameters.
    pub fn query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Serialize `payload` as the JSON body.
    ///
    /// # Errors
    /// Returns `GowaError::Json` if the payload cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, payload: &B) -> Result<Self, GowaError> {
        self.body = RequestBody::Json(Bytes::from(serde_json::to_vec(payload)?));
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Override a default header for this request only.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Abort the request and any pending retry when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }
}

impl RetryableRequest for OutboundRequest {
    fn is_idempotent(&self) -> bool {
        !matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_form_keeps_insertion_order() {
        let form = MultipartForm::new()
            .text("phone", "1")
            .text("caption", "c")
            .text_opt("duration", Some(30))
            .text_opt("missing", None::<u32>)
            .text("compress", "false");

        let names: Vec<&str> = form.fields().map(|(k, _)| k).collect();
        assert_eq!(names, ["phone", "caption", "duration", "compress"]);
        assert!(form.file_part().is_none());
    }

    #[test]
    fn test_multipart_form_single_file() {
        let form = MultipartForm::new()
            .file("image", "/tmp/a.jpg")
            .file("video", "/tmp/b.mp4");

        let file = form.file_part().unwrap();
        assert_eq!(file.field_name(), "video");
        assert_eq!(file.path(), Path::new("/tmp/b.mp4"));
    }

    #[test]
    fn test_json_body_serialized_once() {
        let req = OutboundRequest::post("/send/message")
            .json(&serde_json::json!({"phone": "1", "message": "hi"}))
            .unwrap();

        match req.body() {
            RequestBody::Json(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(value["message"], "hi");
            }
            other => panic!("Expected JSON body, got {:?}", other),
        }
    }

    #[test]
    fn test_idempotency_by_method() {
        assert!(OutboundRequest::get("/chats").is_idempotent());
        assert!(!OutboundRequest::post("/send/message").is_idempotent());
        assert!(OutboundRequest::new(Method::DELETE, "/x").is_idempotent());
    }
}

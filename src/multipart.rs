//! Streaming `multipart/form-data` encoder
//!
//! Builds upload bodies without reading the attached file into memory. A
//! writer task emits the scalar fields, then the file's bytes, into a bounded
//! channel; the HTTP request body drains the other end concurrently. Memory use
//! is bounded by `CHANNEL_CAPACITY * CHUNK_SIZE` whatever the file size.
//!
//! If the file cannot be opened or read, the writer records an
//! [`GowaError::Upload`] and pushes an I/O error into the body stream, so the
//! request fails instead of sending a truncated body.
//!
//! ## Example
//!
//! ```ignore
//! use gowa_client::client::MultipartForm;
//! use gowa_client::multipart::StreamingMultipartEncoder;
//!
//! let form = MultipartForm::new()
//!     .text("phone", "5511999999999@s.whatsapp.net")
//!     .file("image", "/tmp/photo.jpg");
//! let body = StreamingMultipartEncoder::new(form).encode();
//! println!("{}", body.content_type());
//! ```

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::File;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

use crate::client::MultipartForm;
use crate::error::GowaError;

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_CAPACITY: usize = 4;
const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Encodes one [`MultipartForm`] into a streaming request body.
#[derive(Debug)]
pub struct StreamingMultipartEncoder {
    form: MultipartForm,
    boundary: String,
}

impl StreamingMultipartEncoder {
    /// Create an encoder with a fresh random boundary.
    pub fn new(form: MultipartForm) -> Self {
        Self::with_boundary(form, uuid::Uuid::new_v4().simple().to_string())
    }

    /// Create an encoder with a caller-chosen boundary.
    pub fn with_boundary(form: MultipartForm, boundary: impl Into<String>) -> Self {
        Self {
            form,
            boundary: boundary.into(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value matching this body's boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Start the writer task and return the reading side.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn encode(self) -> MultipartBody {
        let content_type = self.content_type();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let failure = UploadFailure::default();

        tokio::spawn(write_form(self.form, self.boundary, tx, failure.clone()));

        MultipartBody {
            rx,
            content_type,
            failure,
        }
    }
}

/// Reading side of an encoded multipart body.
///
/// Yields body chunks as the writer produces them. Dropping it stops the
/// writer and closes the source file.
#[derive(Debug)]
pub struct MultipartBody {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    content_type: String,
    failure: UploadFailure,
}

impl MultipartBody {
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Take the upload error recorded by the writer, if it failed.
    pub fn take_failure(&self) -> Option<GowaError> {
        self.failure.take()
    }

    pub(crate) fn into_request_body(self) -> (reqwest::Body, UploadFailure) {
        let failure = self.failure.clone();
        (reqwest::Body::wrap_stream(self), failure)
    }
}

impl Stream for MultipartBody {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Slot where the writer leaves its error for the request side.
#[derive(Debug, Clone, Default)]
pub(crate) struct UploadFailure(Arc<Mutex<Option<GowaError>>>);

impl UploadFailure {
    fn record(&self, error: GowaError) {
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert(error);
        }
    }

    pub(crate) fn take(&self) -> Option<GowaError> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

enum WriteError {
    /// The body reader was dropped; the request is gone.
    Closed,
    Io(io::Error),
}

async fn write_form(
    form: MultipartForm,
    boundary: String,
    tx: mpsc::Sender<io::Result<Bytes>>,
    failure: UploadFailure,
) {
    match write_parts(&form, &boundary, &tx).await {
        Ok(()) => {}
        Err(WriteError::Closed) => {
            log::debug!("[Gowa] multipart reader closed before the body was complete");
        }
        Err(WriteError::Io(source)) => {
            let relay = io::Error::new(source.kind(), source.to_string());
            let path = form
                .file_part()
                .map(|f| f.path().to_path_buf())
                .unwrap_or_default();
            log::warn!("[Gowa] multipart upload of {} failed: {}", path.display(), source);
            failure.record(GowaError::Upload { path, source });
            let _ = tx.send(Err(relay)).await;
        }
    }
}

async fn write_parts(
    form: &MultipartForm,
    boundary: &str,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> Result<(), WriteError> {
    for (name, value) in form.fields() {
        let part = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            boundary,
            escape_quotes(name),
            value
        );
        send(tx, Bytes::from(part)).await?;
    }

    if let Some(file_part) = form.file_part() {
        let file = File::open(file_part.path()).await.map_err(WriteError::Io)?;
        let header = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            boundary,
            escape_quotes(file_part.field_name()),
            escape_quotes(&file_name(file_part.path())),
            FILE_CONTENT_TYPE
        );
        send(tx, Bytes::from(header)).await?;

        let mut chunks = ReaderStream::with_capacity(file, CHUNK_SIZE);
        while let Some(chunk) = chunks.next().await {
            send(tx, chunk.map_err(WriteError::Io)?).await?;
        }
        send(tx, Bytes::from_static(b"\r\n")).await?;
    }

    send(tx, Bytes::from(format!("--{}--\r\n", boundary))).await
}

async fn send(tx: &mpsc::Sender<io::Result<Bytes>>, chunk: Bytes) -> Result<(), WriteError> {
    tx.send(Ok(chunk)).await.map_err(|_| WriteError::Closed)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

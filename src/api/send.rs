//! Outgoing messages
//!
//! Media calls take a [`MediaSource`]. A local file is streamed as
//! `multipart/form-data`; a URL is sent as JSON and fetched by the gateway.
//!
//! ```rust,no_run
//! use gowa_client::api::send::{ImageOptions, MediaSource, SendMessageOptions};
//! use gowa_client::Gowa;
//!
//! # async fn run() -> Result<(), gowa_client::GowaError> {
//! let gowa = Gowa::from_env()?;
//!
//! gowa.send()
//!     .message("6289685028129", "hello", &SendMessageOptions::default())
//!     .await?;
//!
//! let options = ImageOptions {
//!     caption: "holiday".into(),
//!     ..Default::default()
//! };
//! gowa.send()
//!     .image("6289685028129", &MediaSource::file("/tmp/beach.jpg"), &options)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::common::{require, SendResponse};
use crate::api::r#trait::{GowaApi, GowaContext};
use crate::client::MultipartForm;
use crate::error::GowaError;

/// Where the media of a send call comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Local file, uploaded by this client
    File(PathBuf),
    /// Public URL, downloaded by the gateway
    Url(String),
}

impl MediaSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

/// Extras for [`SendApi::message`]. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendMessageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_forwarded: Option<bool>,
    /// Disappearing-message timer in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub caption: String,
    pub view_once: bool,
    pub compress: bool,
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioOptions {
    pub is_forwarded: Option<bool>,
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoOptions {
    pub caption: String,
    pub view_once: bool,
    pub compress: bool,
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    pub caption: String,
    pub is_forwarded: Option<bool>,
    pub duration: Option<u32>,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    phone: &'a str,
    message: &'a str,
    #[serde(flatten)]
    options: &'a SendMessageOptions,
}

#[derive(Serialize)]
struct PresencePayload<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatPresencePayload<'a> {
    phone: &'a str,
    action: &'a str,
}

#[derive(Serialize)]
struct ContactPayload<'a> {
    phone: &'a str,
    contact_name: &'a str,
    contact_phone: &'a str,
}

#[derive(Serialize)]
struct LinkPayload<'a> {
    phone: &'a str,
    link: &'a str,
    caption: &'a str,
}

#[derive(Serialize)]
struct LocationPayload<'a> {
    phone: &'a str,
    latitude: &'a str,
    longitude: &'a str,
}

#[derive(Serialize)]
struct PollPayload<'a> {
    phone: &'a str,
    question: &'a str,
    options: &'a [String],
    max_answer: usize,
}

/// Ordered media fields, encoded either as form fields or as a JSON object.
struct MediaFields(Vec<(&'static str, Value)>);

impl MediaFields {
    fn new(phone: &str) -> Self {
        Self(vec![("phone", Value::from(phone))])
    }

    fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.0.push((name, value.into()));
        self
    }

    fn with_opt(self, name: &'static str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    fn into_form(self) -> MultipartForm {
        self.0
            .into_iter()
            .fold(MultipartForm::new(), |form, (name, value)| match value {
                Value::String(text) => form.text(name, text),
                other => form.text(name, other.to_string()),
            })
    }

    fn into_json(self) -> Value {
        let map: Map<String, Value> = self
            .0
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Value::Object(map)
    }
}

/// Send API
pub struct SendApi {
    context: Arc<GowaContext>,
}

impl SendApi {
    pub fn new(context: Arc<GowaContext>) -> Self {
        Self { context }
    }

    /// Send a text message
    ///
    /// POST /send/message
    ///
    /// # Errors
    /// Returns `GowaError::Validation` before any request if `phone` or
    /// `message` is blank.
    pub async fn message(
        &self,
        phone: &str,
        message: &str,
        options: &SendMessageOptions,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        require("message", message)?;
        let payload = MessagePayload {
            phone,
            message,
            options,
        };
        self.context.post_json("/send/message", &payload).await
    }

    /// Set the account presence, `available` or `unavailable`.
    ///
    /// POST /send/presence
    pub async fn presence(&self, kind: &str) -> Result<SendResponse, GowaError> {
        if kind != "available" && kind != "unavailable" {
            return Err(GowaError::validation(
                "presence type must be 'available' or 'unavailable'",
            ));
        }
        self.context
            .post_json("/send/presence", &PresencePayload { kind })
            .await
    }

    /// Start or stop the typing indicator in a chat.
    ///
    /// POST /send/chat-presence
    pub async fn chat_presence(&self, phone: &str, action: &str) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        if action != "start" && action != "stop" {
            return Err(GowaError::validation(
                "chat presence action must be 'start' or 'stop'",
            ));
        }
        self.context
            .post_json("/send/chat-presence", &ChatPresencePayload { phone, action })
            .await
    }

    /// POST /send/image
    pub async fn image(
        &self,
        phone: &str,
        source: &MediaSource,
        options: &ImageOptions,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        let fields = MediaFields::new(phone)
            .with("caption", options.caption.as_str())
            .with("view_once", options.view_once)
            .with("compress", options.compress)
            .with_opt("duration", options.duration);
        self.send_media("/send/image", "image", Some("image_url"), source, fields)
            .await
    }

    /// POST /send/audio
    pub async fn audio(
        &self,
        phone: &str,
        source: &MediaSource,
        options: &AudioOptions,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        let fields = MediaFields::new(phone)
            .with_opt("is_forwarded", options.is_forwarded)
            .with_opt("duration", options.duration);
        self.send_media("/send/audio", "audio", Some("audio_url"), source, fields)
            .await
    }

    /// POST /send/video
    pub async fn video(
        &self,
        phone: &str,
        source: &MediaSource,
        options: &VideoOptions,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        let fields = MediaFields::new(phone)
            .with("caption", options.caption.as_str())
            .with("view_once", options.view_once)
            .with("compress", options.compress)
            .with_opt("duration", options.duration);
        self.send_media("/send/video", "video", Some("video_url"), source, fields)
            .await
    }

    /// Send a document. Only local files are accepted.
    ///
    /// POST /send/file
    pub async fn file(
        &self,
        phone: &str,
        source: &MediaSource,
        options: &FileOptions,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        let fields = MediaFields::new(phone)
            .with("caption", options.caption.as_str())
            .with_opt("is_forwarded", options.is_forwarded)
            .with_opt("duration", options.duration);
        self.send_media("/send/file", "file", None, source, fields)
            .await
    }

    /// Share a contact card
    ///
    /// POST /send/contact
    pub async fn contact(
        &self,
        phone: &str,
        contact_name: &str,
        contact_phone: &str,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        require("contact_name", contact_name)?;
        require("contact_phone", contact_phone)?;
        let payload = ContactPayload {
            phone,
            contact_name,
            contact_phone,
        };
        self.context.post_json("/send/contact", &payload).await
    }

    /// POST /send/link
    pub async fn link(&self, phone: &str, link: &str, caption: &str) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        require("link", link)?;
        let payload = LinkPayload {
            phone,
            link,
            caption,
        };
        self.context.post_json("/send/link", &payload).await
    }

    /// Share a location. Coordinates are passed through as decimal strings.
    ///
    /// POST /send/location
    pub async fn location(
        &self,
        phone: &str,
        latitude: &str,
        longitude: &str,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        require("latitude", latitude)?;
        require("longitude", longitude)?;
        let payload = LocationPayload {
            phone,
            latitude,
            longitude,
        };
        self.context.post_json("/send/location", &payload).await
    }

    /// Create a poll
    ///
    /// POST /send/poll
    ///
    /// # Errors
    /// Returns `GowaError::Validation` unless there are at least two options
    /// and `1 <= max_answer <= options.len()`.
    pub async fn poll(
        &self,
        phone: &str,
        question: &str,
        options: &[String],
        max_answer: usize,
    ) -> Result<SendResponse, GowaError> {
        require("phone", phone)?;
        require("question", question)?;
        if options.len() < 2 {
            return Err(GowaError::validation("poll needs at least 2 options"));
        }
        if options.iter().any(|option| option.trim().is_empty()) {
            return Err(GowaError::validation("poll options must not be blank"));
        }
        if max_answer == 0 || max_answer > options.len() {
            return Err(GowaError::validation(format!(
                "max_answer must be between 1 and {}",
                options.len()
            )));
        }
        let payload = PollPayload {
            phone,
            question,
            options,
            max_answer,
        };
        self.context.post_json("/send/poll", &payload).await
    }

    async fn send_media(
        &self,
        endpoint: &str,
        file_field: &'static str,
        url_field: Option<&'static str>,
        source: &MediaSource,
        fields: MediaFields,
    ) -> Result<SendResponse, GowaError> {
        match source {
            MediaSource::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(GowaError::validation(format!("{file_field} path is required")));
                }
                let form = fields.into_form().file(file_field, path);
                self.context.post_multipart(endpoint, form).await
            }
            MediaSource::Url(url) => {
                let url_field = url_field.ok_or_else(|| {
                    GowaError::validation(format!("{file_field} must be a local file"))
                })?;
                require(url_field, url)?;
                let payload = fields.with(url_field, url.as_str()).into_json();
                self.context.post_json(endpoint, &payload).await
            }
        }
    }
}

impl GowaApi for SendApi {
    fn api_name(&self) -> &'static str {
        "send"
    }

    fn context(&self) -> &GowaContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GowaConfig, RequestExecutor};
    use wiremock::matchers::{body_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_context(base_url: &str) -> Arc<GowaContext> {
        let executor = RequestExecutor::new(GowaConfig::new(base_url)).unwrap();
        Arc::new(GowaContext::new(Arc::new(executor)))
    }

    fn sent() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "SUCCESS",
            "message": "Success",
            "results": {"message_id": "3EB0B430B6F8F1D0E053AC120E0A9E5C", "status": "sent"}
        }))
    }

    #[test]
    fn test_message_options_omitted_when_unset() {
        let options = SendMessageOptions::default();
        let payload = MessagePayload {
            phone: "1",
            message: "hi",
            options: &options,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"phone": "1", "message": "hi"})
        );

        let options = SendMessageOptions {
            reply_message_id: Some("3EB0".into()),
            duration: Some(3600),
            ..Default::default()
        };
        let payload = MessagePayload {
            phone: "1",
            message: "hi",
            options: &options,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"phone": "1", "message": "hi", "reply_message_id": "3EB0", "duration": 3600})
        );
    }

    #[test]
    fn test_media_fields_encodings() {
        let fields = || {
            MediaFields::new("1")
                .with("caption", "c")
                .with("view_once", true)
                .with_opt("duration", Some(30u32))
                .with_opt("is_forwarded", None::<bool>)
        };

        let form = fields().into_form();
        let pairs: Vec<(&str, &str)> = form.fields().collect();
        assert_eq!(
            pairs,
            [("phone", "1"), ("caption", "c"), ("view_once", "true"), ("duration", "30")]
        );

        assert_eq!(
            fields().into_json(),
            serde_json::json!({"phone": "1", "caption": "c", "view_once": true, "duration": 30})
        );
    }

    #[tokio::test]
    async fn test_send_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send/message"))
            .and(body_json(serde_json::json!({
                "phone": "6289685028129@s.whatsapp.net",
                "message": "selamat pagi",
                "is_forwarded": false
            })))
            .respond_with(sent())
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = SendApi::new(create_test_context(&mock_server.uri()));
        let options = SendMessageOptions {
            is_forwarded: Some(false),
            ..Default::default()
        };
        let response = api
            .message("6289685028129@s.whatsapp.net", "selamat pagi", &options)
            .await
            .unwrap();

        assert_eq!(response.results.status, "sent");
    }

    #[tokio::test]
    async fn test_image_url_is_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send/image"))
            .and(header_regex("content-type", "^application/json"))
            .and(body_json(serde_json::json!({
                "phone": "1",
                "caption": "",
                "view_once": false,
                "compress": true,
                "image_url": "https://example.com/a.png"
            })))
            .respond_with(sent())
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = SendApi::new(create_test_context(&mock_server.uri()));
        let options = ImageOptions {
            compress: true,
            ..Default::default()
        };
        api.image("1", &MediaSource::url("https://example.com/a.png"), &options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_image_file_is_multipart() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("beach.jpg");
        std::fs::write(&file, b"\xFF\xD8\xFFjpeg").unwrap();

        Mock::given(method("POST"))
            .and(path("/send/image"))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .respond_with(sent())
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = SendApi::new(create_test_context(&mock_server.uri()));
        api.image("1", &MediaSource::file(&file), &ImageOptions::default())
            .await
            .unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"image\"; filename=\"beach.jpg\""));
        assert!(body.contains("name=\"view_once\"\r\n\r\nfalse\r\n"));
    }

    #[tokio::test]
    async fn test_validation_sends_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sent())
            .expect(0)
            .mount(&mock_server)
            .await;

        let api = SendApi::new(create_test_context(&mock_server.uri()));
        let options = SendMessageOptions::default();
        let two = vec!["a".to_string(), "b".to_string()];

        let results = vec![
            api.message("", "hi", &options).await,
            api.message("1", "  ", &options).await,
            api.presence("busy").await,
            api.chat_presence("1", "pause").await,
            api.file("1", &MediaSource::url("https://example.com/a.pdf"), &FileOptions::default())
                .await,
            api.image("1", &MediaSource::url(""), &ImageOptions::default()).await,
            api.location("1", "", "106.8").await,
            api.poll("1", "q?", &two[..1], 1).await,
            api.poll("1", "q?", &two, 0).await,
            api.poll("1", "q?", &two, 3).await,
        ];

        for result in results {
            assert!(
                matches!(result, Err(GowaError::Validation(_))),
                "Expected Validation error, got {:?}",
                result
            );
        }
    }

    #[tokio::test]
    async fn test_poll_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send/poll"))
            .and(body_json(serde_json::json!({
                "phone": "1",
                "question": "Lunch?",
                "options": ["rice", "noodles", "bread"],
                "max_answer": 2
            })))
            .respond_with(sent())
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = SendApi::new(create_test_context(&mock_server.uri()));
        let options = ["rice", "noodles", "bread"].map(String::from);
        api.poll("1", "Lunch?", &options, 2).await.unwrap();
    }
}

//! Chat listing and history
//!
//! Query parameters are only sent when set: zero `limit`/`offset`, empty
//! strings and `None` flags are left out of the query string entirely.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::common::{path_segment, GatewayResponse, Pagination};
use crate::api::r#trait::{GowaApi, GowaContext};
use crate::error::GowaError;

/// Filters for `GET /chats`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListChatsParams {
    pub limit: u32,
    pub offset: u32,
    pub search: String,
    pub has_media: Option<bool>,
}

impl ListChatsParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if self.limit > 0 {
            query.push(("limit", self.limit.to_string()));
        }
        if self.offset > 0 {
            query.push(("offset", self.offset.to_string()));
        }
        if !self.search.is_empty() {
            query.push(("search", self.search.clone()));
        }
        if let Some(has_media) = self.has_media {
            query.push(("has_media", has_media.to_string()));
        }
        query
    }
}

/// Filters for `GET /chat/{jid}/messages`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessagesParams {
    pub limit: u32,
    pub offset: u32,
    /// RFC 3339 lower bound
    pub start_time: String,
    /// RFC 3339 upper bound
    pub end_time: String,
    pub media_only: Option<bool>,
    pub is_from_me: Option<bool>,
    pub search: String,
}

impl ChatMessagesParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if self.limit > 0 {
            query.push(("limit", self.limit.to_string()));
        }
        if self.offset > 0 {
            query.push(("offset", self.offset.to_string()));
        }
        if !self.start_time.is_empty() {
            query.push(("start_time", self.start_time.clone()));
        }
        if !self.end_time.is_empty() {
            query.push(("end_time", self.end_time.clone()));
        }
        if let Some(media_only) = self.media_only {
            query.push(("media_only", media_only.to_string()));
        }
        if let Some(is_from_me) = self.is_from_me {
            query.push(("is_from_me", is_from_me.to_string()));
        }
        if !self.search.is_empty() {
            query.push(("search", self.search.clone()));
        }
        query
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatSummary {
    #[serde(default)]
    pub jid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_message_time: String,
    /// Disappearing-message timer in seconds, 0 when off
    #[serde(default)]
    pub ephemeral_expiration: u32,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatListResults {
    #[serde(default)]
    pub data: Vec<ChatSummary>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

pub type ChatListResponse = GatewayResponse<ChatListResults>;

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub chat_jid: String,
    #[serde(default)]
    pub sender_jid: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub is_from_me: bool,
    /// `None` for plain text messages
    #[serde(default)]
    pub media_type: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatMessagesResults {
    #[serde(default)]
    pub data: Vec<ChatMessage>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

pub type ChatMessagesResponse = GatewayResponse<ChatMessagesResults>;

/// Chat API
pub struct ChatApi {
    context: Arc<GowaContext>,
}

impl ChatApi {
    pub fn new(context: Arc<GowaContext>) -> Self {
        Self { context }
    }

    /// List chats
    ///
    /// GET /chats
    pub async fn list(&self, params: &ListChatsParams) -> Result<ChatListResponse, GowaError> {
        self.context.get_json("/chats", &params.to_query()).await
    }

    /// Message history of one chat
    ///
    /// GET /chat/{jid}/messages
    ///
    /// # Errors
    /// Returns `GowaError::Validation` if `chat_jid` is blank, `.` or `..`.
    pub async fn messages(
        &self,
        chat_jid: &str,
        params: &ChatMessagesParams,
    ) -> Result<ChatMessagesResponse, GowaError> {
        let path = format!("/chat/{}/messages", path_segment("chat_jid", chat_jid)?);
        self.context.get_json(&path, &params.to_query()).await
    }
}

impl GowaApi for ChatApi {
    fn api_name(&self) -> &'static str {
        "chat"
    }

    fn context(&self) -> &GowaContext {
        &self.context
    }
}

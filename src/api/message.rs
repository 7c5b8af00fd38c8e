//! Actions on an already sent message
//!
//! Every action is `POST /message/{message_id}/{action}` with the chat phone
//! (and the action's own field, if any) as the JSON body.

use std::sync::Arc;

use serde::Serialize;

use crate::api::common::{path_segment, require, SendResponse};
use crate::api::r#trait::{GowaApi, GowaContext};
use crate::error::GowaError;

#[derive(Serialize)]
struct ActionPayload<'a> {
    phone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    emoji: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<'a> ActionPayload<'a> {
    fn phone(phone: &'a str) -> Self {
        Self {
            phone,
            emoji: None,
            message: None,
        }
    }
}

/// Message API
pub struct MessageApi {
    context: Arc<GowaContext>,
}

impl MessageApi {
    pub fn new(context: Arc<GowaContext>) -> Self {
        Self { context }
    }

    /// Delete for everyone
    pub async fn revoke(&self, message_id: &str, phone: &str) -> Result<SendResponse, GowaError> {
        self.act(message_id, "revoke", ActionPayload::phone(phone)).await
    }

    /// Delete for me
    pub async fn delete(&self, message_id: &str, phone: &str) -> Result<SendResponse, GowaError> {
        self.act(message_id, "delete", ActionPayload::phone(phone)).await
    }

    /// React with `emoji`
    pub async fn react(
        &self,
        message_id: &str,
        phone: &str,
        emoji: &str,
    ) -> Result<SendResponse, GowaError> {
        require("emoji", emoji)?;
        let payload = ActionPayload {
            emoji: Some(emoji),
            ..ActionPayload::phone(phone)
        };
        self.act(message_id, "reaction", payload).await
    }

    /// Edit the text of a sent message
    pub async fn update(
        &self,
        message_id: &str,
        phone: &str,
        message: &str,
    ) -> Result<SendResponse, GowaError> {
        require("message", message)?;
        let payload = ActionPayload {
            message: Some(message),
            ..ActionPayload::phone(phone)
        };
        self.act(message_id, "update", payload).await
    }

    /// Mark as read
    pub async fn read(&self, message_id: &str, phone: &str) -> Result<SendResponse, GowaError> {
        self.act(message_id, "read", ActionPayload::phone(phone)).await
    }

    pub async fn star(&self, message_id: &str, phone: &str) -> Result<SendResponse, GowaError> {
        self.act(message_id, "star", ActionPayload::phone(phone)).await
    }

    pub async fn unstar(&self, message_id: &str, phone: &str) -> Result<SendResponse, GowaError> {
        self.act(message_id, "unstar", ActionPayload::phone(phone)).await
    }

    async fn act(
        &self,
        message_id: &str,
        action: &str,
        payload: ActionPayload<'_>,
    ) -> Result<SendResponse, GowaError> {
        let message_id = path_segment("message_id", message_id)?;
        require("phone", payload.phone)?;
        let path = format!("/message/{}/{}", message_id, action);
        self.context.post_json(&path, &payload).await
    }
}

impl GowaApi for MessageApi {
    fn api_name(&self) -> &'static str {
        "message"
    }

    fn context(&self) -> &GowaContext {
        &self.context
    }
}

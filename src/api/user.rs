use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::common::{require, GatewayResponse};
use crate::api::r#trait::{GowaApi, GowaContext};
use crate::error::GowaError;

/// Profile details of a WhatsApp account
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserInfoResults {
    #[serde(default)]
    pub verified_name: String,
    /// About text
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub picture_id: String,
    #[serde(default)]
    pub devices: Vec<UserDevice>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserDevice {
    #[serde(default, rename = "User")]
    pub user: String,
    #[serde(default, rename = "Agent")]
    pub agent: u32,
    #[serde(default, rename = "Device")]
    pub device: String,
    #[serde(default, rename = "Server")]
    pub server: String,
    #[serde(default, rename = "AD")]
    pub ad: bool,
}

pub type UserInfoResponse = GatewayResponse<UserInfoResults>;

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AvatarResults {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

pub type AvatarResponse = GatewayResponse<AvatarResults>;

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckResults {
    #[serde(default)]
    pub is_on_whatsapp: bool,
}

pub type CheckResponse = GatewayResponse<CheckResults>;

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default)]
    pub jid: String,
    #[serde(default)]
    pub name: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactsResults {
    #[serde(default)]
    pub data: Vec<Contact>,
}

pub type ContactsResponse = GatewayResponse<ContactsResults>;

/// User API for account lookups
pub struct UserApi {
    context: Arc<GowaContext>,
}

impl UserApi {
    pub fn new(context: Arc<GowaContext>) -> Self {
        Self { context }
    }

    /// Get profile information
    ///
    /// GET /user/info?phone=PHONE
    ///
    /// # Arguments
    /// * `phone` - Phone number or JID, e.g. `6289685028129@s.whatsapp.net`
    pub async fn info(&self, phone: &str) -> Result<UserInfoResponse, GowaError> {
        require("phone", phone)?;
        self.context
            .get_json("/user/info", &[("phone", phone.to_string())])
            .await
    }

    /// Get the profile picture
    ///
    /// GET /user/avatar?phone=PHONE&is_preview=BOOL&is_community=BOOL
    pub async fn avatar(
        &self,
        phone: &str,
        is_preview: bool,
        is_community: bool,
    ) -> Result<AvatarResponse, GowaError> {
        require("phone", phone)?;
        self.context
            .get_json(
                "/user/avatar",
                &[
                    ("phone", phone.to_string()),
                    ("is_preview", is_preview.to_string()),
                    ("is_community", is_community.to_string()),
                ],
            )
            .await
    }

    /// Check whether `phone` is registered on WhatsApp
    ///
    /// GET /user/check?phone=PHONE
    pub async fn check(&self, phone: &str) -> Result<CheckResponse, GowaError> {
        require("phone", phone)?;
        self.context
            .get_json("/user/check", &[("phone", phone.to_string())])
            .await
    }

    /// GET /user/my/contacts
    pub async fn my_contacts(&self) -> Result<ContactsResponse, GowaError> {
        self.context.get_json("/user/my/contacts", &[]).await
    }
}

impl GowaApi for UserApi {
    fn api_name(&self) -> &'static str {
        "user"
    }

    fn context(&self) -> &GowaContext {
        &self.context
    }
}

//! Session pairing and connection management
//!
//! - `GET /app/login` - QR code pairing
//! - `GET /app/login-with-code` - pairing code for a phone number
//! - `GET /app/logout`, `GET /app/reconnect`
//! - `GET /app/devices`

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::common::{require, Ack, GatewayResponse};
use crate::api::r#trait::{GowaApi, GowaContext};
use crate::error::GowaError;

/// QR pairing payload
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginResults {
    /// Seconds before the QR code expires
    #[serde(default)]
    pub qr_duration: u32,
    /// Link to the QR code image
    #[serde(default)]
    pub qr_link: String,
}

pub type LoginResponse = GatewayResponse<LoginResults>;

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginWithCodeResults {
    /// Code to type on the phone under "Link with phone number"
    #[serde(default)]
    pub pair_code: String,
}

pub type LoginWithCodeResponse = GatewayResponse<LoginWithCodeResults>;

/// A device linked to the gateway session
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Device {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device: String,
}

pub type DevicesResponse = GatewayResponse<Vec<Device>>;

/// App API for pairing and connection state
pub struct AppApi {
    context: Arc<GowaContext>,
}

impl AppApi {
    pub fn new(context: Arc<GowaContext>) -> Self {
        Self { context }
    }

    /// Start QR pairing.
    ///
    /// GET /app/login
    pub async fn login(&self) -> Result<LoginResponse, GowaError> {
        self.context.get_json("/app/login", &[]).await
    }

    /// Request a pairing code for `phone`.
    ///
    /// GET /app/login-with-code?phone=PHONE
    ///
    /// # Errors
    /// Returns `GowaError::Validation` if `phone` is blank.
    pub async fn login_with_code(&self, phone: &str) -> Result<LoginWithCodeResponse, GowaError> {
        require("phone", phone)?;
        self.context
            .get_json("/app/login-with-code", &[("phone", phone.to_string())])
            .await
    }

    /// GET /app/logout
    pub async fn logout(&self) -> Result<Ack, GowaError> {
        self.context.get_json("/app/logout", &[]).await
    }

    /// GET /app/reconnect
    pub async fn reconnect(&self) -> Result<Ack, GowaError> {
        self.context.get_json("/app/reconnect", &[]).await
    }

    /// GET /app/devices
    pub async fn devices(&self) -> Result<DevicesResponse, GowaError> {
        self.context.get_json("/app/devices", &[]).await
    }
}

impl GowaApi for AppApi {
    fn api_name(&self) -> &'static str {
        "app"
    }

    fn context(&self) -> &GowaContext {
        &self.context
    }
}

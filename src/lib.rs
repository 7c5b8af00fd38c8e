//! Client for the GOWA WhatsApp HTTP gateway
//!
//! Builds authenticated JSON and multipart requests for the gateway's REST
//! API and decodes its `{code, message, results}` responses into typed
//! structs.
//!
//! ## API Coverage
//!
//! | Group | Calls |
//! |-------|-------|
//! | App (pairing, session) | login, login_with_code, logout, reconnect, devices |
//! | User | info, avatar, check, my_contacts |
//! | Chat | list, messages |
//! | Send | message, presence, chat_presence, image, audio, video, file, contact, link, location, poll |
//! | Message | revoke, delete, react, update, read, star, unstar |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gowa_client::Gowa;
//! use gowa_client::api::{ListChatsParams, SendMessageOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gowa = Gowa::builder()
//!         .base_url("http://localhost:3000")
//!         .credentials("admin", "admin")
//!         .build()?;
//!
//!     let qr = gowa.app().login().await?;
//!     println!("Scan {} within {}s", qr.results.qr_link, qr.results.qr_duration);
//!
//!     let chats = gowa.chat().list(&ListChatsParams::default()).await?;
//!     for chat in &chats.results.data {
//!         println!("{} {}", chat.jid, chat.name);
//!     }
//!
//!     gowa.send()
//!         .message("6289685028129", "hello", &SendMessageOptions::default())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Endpoint groups and response types
//! - [`client`] - Request executor, configuration, facade and builder
//! - [`error`] - Error types
//! - [`middleware`] - Retry and logging tower layers
//! - [`multipart`] - Streaming `multipart/form-data` encoder
//!
//! ## Error Handling
//!
//! Every call returns [`GowaError`]:
//!
//! ```rust,ignore
//! use gowa_client::GowaError;
//!
//! match result {
//!     Ok(response) => { /* handle success */ }
//!     Err(GowaError::HttpStatus { code, body }) => {
//!         eprintln!("gateway returned {}: {}", code, String::from_utf8_lossy(&body));
//!     }
//!     Err(GowaError::Validation(reason)) => {
//!         eprintln!("not sent: {}", reason);
//!     }
//!     Err(e) => {
//!         eprintln!("Other error: {}", e);
//!     }
//! }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod middleware;
pub mod multipart;
mod utils;

pub use client::{Gowa, GowaBuilder, GowaConfig, RequestExecutor};
pub use error::GowaError;

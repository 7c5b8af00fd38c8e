//! GOWA gateway API modules
//!
//! - [`common`] - Response envelope, send results and pagination
//! - [`app`] - QR and pairing-code login, logout, reconnect, devices
//! - [`user`] - Profile info, avatar, registration check, contacts
//! - [`chat`] - Chat list and message history
//! - [`send`] - Text, presence, media, contact, link, location and poll messages
//! - [`message`] - Revoke, delete, react, edit, read and star sent messages
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gowa_client::{Gowa, api::ListChatsParams};
//!
//! let gowa = Gowa::builder().base_url("http://localhost:3000").build()?;
//! let chats = gowa.chat().list(&ListChatsParams::default()).await?;
//! ```

pub mod app;
pub mod chat;
pub mod common;
pub mod message;
pub mod send;
pub mod r#trait;
pub mod user;

pub use app::{
    AppApi, Device, DevicesResponse, LoginResponse, LoginResults, LoginWithCodeResponse,
    LoginWithCodeResults,
};
pub use chat::{
    ChatApi, ChatListResponse, ChatListResults, ChatMessage, ChatMessagesParams,
    ChatMessagesResponse, ChatMessagesResults, ChatSummary, ListChatsParams,
};
pub use common::{Ack, GatewayResponse, Pagination, SendResponse, SendResults, SUCCESS_CODE};
pub use message::MessageApi;
pub use r#trait::{GowaApi, GowaContext};
pub use send::{
    AudioOptions, FileOptions, ImageOptions, MediaSource, SendApi, SendMessageOptions,
    VideoOptions,
};
pub use user::{
    AvatarResponse, AvatarResults, CheckResponse, CheckResults, Contact, ContactsResponse,
    ContactsResults, UserApi, UserDevice, UserInfoResponse, UserInfoResults,
};

//! GOWA HTTP client module
//!
//! This module contains the request executor, its configuration and the
//! [`Gowa`] facade with its builder.

mod config;
pub use config::{GowaConfig, ENV_BASE_URL, ENV_PASS, ENV_TIMEOUT_SECS, ENV_USER};

mod request;
pub use request::{FilePart, MultipartForm, OutboundRequest, RequestBody};

mod executor;
pub use executor::{HttpTransport, RequestExecutor};

mod gowa;
pub use gowa::Gowa;

mod builder;
pub use builder::GowaBuilder;

//! Middleware components for the gateway client.
//!
//! Two seams use Tower layers:
//!
//! - [`RetryMiddleware`] wraps request dispatch and re-sends requests that
//!   failed at the network level, following a [`RetryPolicy`].
//! - Transport middleware (for example [`LoggingMiddleware`]) wraps the raw
//!   HTTP transport and sees every attempt, including retries. Install it with
//!   [`GowaBuilder::with_middleware`](crate::client::GowaBuilder::with_middleware).
//!
//! ## Usage
//!
//! ```ignore
//! use gowa_client::Gowa;
//! use gowa_client::middleware::LoggingMiddleware;
//!
//! let gowa = Gowa::builder()
//!     .base_url("http://localhost:3000")
//!     .with_middleware(LoggingMiddleware::new())
//!     .build()?;
//! ```

pub use tower::{Layer, Service, ServiceBuilder};

mod logging;
mod retry;

pub use logging::{LoggingMiddleware, LoggingMiddlewareService};
pub use retry::{RetryMiddleware, RetryMiddlewareService, RetryPolicy, RetryableRequest};

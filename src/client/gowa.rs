//! Unified GOWA gateway client

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{AppApi, ChatApi, GowaContext, MessageApi, SendApi, UserApi};
use crate::error::GowaError;

use super::builder::GowaBuilder;
use super::config::GowaConfig;
use super::RequestExecutor;

/// Unified GOWA client
///
/// Cheap to clone; clones share one connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use gowa_client::Gowa;
/// use gowa_client::api::SendMessageOptions;
///
/// # async fn run() -> Result<(), gowa_client::GowaError> {
/// let gowa = Gowa::builder()
///     .base_url("http://localhost:3000")
///     .credentials("admin", "admin")
///     .build()?;
///
/// let sent = gowa
///     .send()
///     .message("6289685028129", "hello", &SendMessageOptions::default())
///     .await?;
/// println!("sent {}", sent.results.message_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Gowa {
    context: Arc<GowaContext>,
}

impl Gowa {
    pub fn builder() -> GowaBuilder {
        GowaBuilder::default()
    }

    /// # Errors
    /// Returns `GowaError::Config` for an invalid base address.
    pub fn from_config(config: GowaConfig) -> Result<Self, GowaError> {
        Self::builder().config(config).build()
    }

    /// Build from `GOWA_BASE_URL`, `GOWA_USER`, `GOWA_PASS` and `GOWA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, GowaError> {
        Self::from_config(GowaConfig::from_env()?)
    }

    pub(crate) fn from_executor(executor: Arc<RequestExecutor>) -> Self {
        Self {
            context: Arc::new(GowaContext::new(executor)),
        }
    }

    /// A handle whose calls abort when `token` is cancelled.
    ///
    /// Cancelling stops the in-flight attempt and any pending retry. Effects
    /// already applied by the gateway are not undone.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            context: Arc::new(self.context.with_cancellation(token)),
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        self.context.executor()
    }

    pub fn app(&self) -> AppApi {
        AppApi::new(Arc::clone(&self.context))
    }

    pub fn user(&self) -> UserApi {
        UserApi::new(Arc::clone(&self.context))
    }

    pub fn chat(&self) -> ChatApi {
        ChatApi::new(Arc::clone(&self.context))
    }

    pub fn send(&self) -> SendApi {
        SendApi::new(Arc::clone(&self.context))
    }

    pub fn message(&self) -> MessageApi {
        MessageApi::new(Arc::clone(&self.context))
    }
}

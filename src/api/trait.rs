//! Gateway API trait and context
//!
//! Provides the shared context every endpoint group calls through.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::{MultipartForm, OutboundRequest, RequestExecutor};
use crate::error::GowaError;

/// Context holding shared resources for endpoint groups.
///
/// Wraps the request executor and an optional cancellation token that is
/// attached to every request sent through this context.
#[derive(Clone)]
pub struct GowaContext {
    pub(crate) executor: Arc<RequestExecutor>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for GowaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GowaContext")
            .field("executor", &self.executor)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl GowaContext {
    /// Create a new GowaContext
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            cancel: None,
        }
    }

    /// A copy of this context whose requests observe `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            cancel: Some(token),
        }
    }

    /// Get a reference to the request executor.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn attach(&self, request: OutboundRequest) -> OutboundRequest {
        match &self.cancel {
            Some(token) => request.with_cancellation(token.clone()),
            None => request,
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GowaError> {
        let request = OutboundRequest::get(path).query_pairs(query.iter().cloned());
        self.executor.send_json(self.attach(request)).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, GowaError> {
        let request = OutboundRequest::post(path).json(payload)?;
        self.executor.send_json(self.attach(request)).await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> Result<T, GowaError> {
        let request = OutboundRequest::post(path).multipart(form);
        self.executor.send_json(self.attach(request)).await
    }
}

/// Trait for gateway endpoint groups.
pub trait GowaApi: Send + Sync {
    /// Get a reference to the shared context
    fn context(&self) -> &GowaContext;

    /// Name of this endpoint group for logging and error context.
    fn api_name(&self) -> &'static str {
        "unknown"
    }
}

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request as ReqwestRequest, Response as ReqwestResponse};
use tower::{Layer, Service};

use crate::error::GowaError;
use crate::middleware::RetryPolicy;

use super::config::GowaConfig;
use super::executor::{build_http_client, HttpTransport, TransportExecutor};
use super::{Gowa, RequestExecutor};

/// Builder for [`Gowa`].
///
/// Starts from [`GowaConfig::default`]; every setter overrides one field.
/// A tower layer given to [`with_middleware`](Self::with_middleware) wraps
/// each HTTP attempt, inside the retry loop.
#[must_use]
#[derive(Default)]
pub struct GowaBuilder<M = ()> {
    config: GowaConfig,
    middleware: Option<M>,
}

impl<M> std::fmt::Debug for GowaBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GowaBuilder")
            .field("config", &self.config)
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish()
    }
}

impl<M> GowaBuilder<M> {
    /// Replace all settings at once.
    pub fn config(mut self, config: GowaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Basic-Auth credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Deadline for a whole call, retries included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Reuse an existing HTTP client and its connection pool.
    ///
    /// The client's own timeouts apply; `connect_timeout` is ignored.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn with_middleware<M2>(self, middleware: M2) -> GowaBuilder<M2>
    where
        M2: Layer<HttpTransport> + Clone + Send + Sync + 'static,
    {
        GowaBuilder {
            config: self.config,
            middleware: Some(middleware),
        }
    }

    /// # Errors
    /// Returns `GowaError::Config` for an invalid base address or credentials.
    pub fn build(self) -> Result<Gowa, GowaError>
    where
        M: Layer<HttpTransport> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let transport = HttpTransport::new(build_http_client(&self.config)?);

        let executor = match self.middleware {
            Some(middleware) => make_transport_executor(middleware.layer(transport)),
            None => make_transport_executor(transport),
        };

        let executor = RequestExecutor::with_transport(self.config, executor)?;
        Ok(Gowa::from_executor(Arc::new(executor)))
    }
}

fn make_transport_executor<S>(service: S) -> TransportExecutor
where
    S: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);

    Arc::new(move |request: ReqwestRequest| {
        let mut service = (*service).clone();
        Box::pin(async move { service.call(request).await })
    })
}

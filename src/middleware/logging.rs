use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use log::{debug, info};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Request, Response};
use tower::{Layer, Service};

/// Logs every HTTP exchange that goes through the gateway transport.
#[derive(Clone)]
pub struct LoggingMiddleware {
    verbose: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Log at `debug` level and include request headers.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for LoggingMiddleware
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Service = LoggingMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddlewareService {
            inner,
            verbose: self.verbose,
        }
    }
}

#[derive(Clone)]
pub struct LoggingMiddlewareService<S> {
    inner: S,
    verbose: bool,
}

const SENSITIVE_FIELDS: &[&str] = &["password", "pass", "token", "secret", "authorization"];

const REDACTED: &str = "[REDACTED]";

impl<S> LoggingMiddlewareService<S> {
    fn is_sensitive(key: &str) -> bool {
        SENSITIVE_FIELDS.iter().any(|s| key.eq_ignore_ascii_case(s))
    }

    fn redact_url(url: &str) -> String {
        let Some((base, query)) = url.split_once('?') else {
            return url.to_string();
        };
        let redacted_query = query
            .split('&')
            .map(|param| match param.split_once('=') {
                Some((key, _)) if Self::is_sensitive(key) => format!("{key}={REDACTED}"),
                _ => param.to_string(),
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{base}?{redacted_query}")
    }

    fn redact_headers(headers: &HeaderMap) -> String {
        headers
            .iter()
            .map(|(name, value)| {
                if name == AUTHORIZATION || Self::is_sensitive(name.as_str()) {
                    format!("{}: {}", name, REDACTED)
                } else {
                    format!("{}: {}", name, value.to_str().unwrap_or("<binary>"))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn log_request(method: &str, url: &str, headers: &HeaderMap, verbose: bool) {
        let safe_url = Self::redact_url(url);
        if verbose {
            debug!(
                "[Gowa] >>> {} {} [{}]",
                method,
                safe_url,
                Self::redact_headers(headers)
            );
        } else {
            info!("[Gowa] {} {}", method, safe_url);
        }
    }

    fn log_response(status: reqwest::StatusCode, duration: std::time::Duration, verbose: bool) {
        if verbose {
            debug!(
                "[Gowa] <<< {} - {} ({:?})",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                duration
            );
        } else {
            info!("[Gowa] {} ({:?})", status.as_u16(), duration);
        }
    }
}

impl<S, Error> Service<Request> for LoggingMiddlewareService<S>
where
    S: Service<Request, Response = Response, Error = Error> + Send + Clone + 'static,
    S::Future: Send,
    Error: std::fmt::Display + Send + 'static,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let verbose = self.verbose;
        Self::log_request(req.method().as_str(), req.url().as_str(), req.headers(), verbose);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let start = Instant::now();
            match inner.call(req).await {
                Ok(response) => {
                    Self::log_response(response.status(), start.elapsed(), verbose);
                    Ok(response)
                }
                Err(e) => {
                    info!("[Gowa] transport failure after {:?}: {}", start.elapsed(), e);
                    Err(e)
                }
            }
        })
    }
}

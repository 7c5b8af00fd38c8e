//! Gateway request executor
//!
//! Turns an [`OutboundRequest`] into an HTTP exchange: joins the path onto the
//! base address, merges default and per-call headers, encodes the body, sends
//! it through the retry pipeline and maps failures into [`GowaError`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower::{Layer, Service};

use crate::error::GowaError;
use crate::middleware::{RetryMiddleware, RetryMiddlewareService, RetryPolicy};
use crate::multipart::{StreamingMultipartEncoder, UploadFailure};

use super::config::GowaConfig;
use super::request::{MultipartForm, OutboundRequest, RequestBody};

const JSON: &str = "application/json";

pub(crate) type TransportFuture =
    Pin<Box<dyn Future<Output = Result<reqwest::Response, reqwest::Error>> + Send>>;
pub(crate) type TransportExecutor = Arc<dyn Fn(reqwest::Request) -> TransportFuture + Send + Sync>;

/// The innermost transport: one HTTP attempt through a shared [`reqwest::Client`].
///
/// Transport middleware installed with
/// [`GowaBuilder::with_middleware`](super::GowaBuilder::with_middleware)
/// wraps this service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Returns the underlying [`reqwest::Client`].
    pub fn http(&self) -> &Client {
        &self.http
    }
}

impl Service<reqwest::Request> for HttpTransport {
    type Response = reqwest::Response;
    type Error = reqwest::Error;
    type Future = TransportFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: reqwest::Request) -> Self::Future {
        let client = self.http.clone();
        Box::pin(async move { client.execute(req).await })
    }
}

pub(crate) fn build_http_client(config: &GowaConfig) -> Result<Client, GowaError> {
    if let Some(client) = &config.http_client {
        return Ok(client.clone());
    }
    Ok(Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()?)
}

/// Resolve `relative` under the base path with exactly one `/` between them.
pub(crate) fn join_url(base: &Url, relative: &str) -> Url {
    let base_path = base.path().trim_end_matches('/');
    let relative = relative.trim_start_matches('/');

    let joined = match (base_path.is_empty(), relative.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => base_path.to_string(),
        _ => format!("{base_path}/{relative}"),
    };

    let mut url = base.clone();
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);
    url
}

struct Shared {
    base_url: Url,
    default_headers: HeaderMap,
    transport: TransportExecutor,
}

impl Shared {
    fn build_request(
        &self,
        req: &OutboundRequest,
    ) -> Result<(reqwest::Request, Option<UploadFailure>), GowaError> {
        let mut url = join_url(&self.base_url, req.path());
        if !req.query_params().is_empty() {
            url.query_pairs_mut().extend_pairs(req.query_params());
        }

        let mut headers = self.default_headers.clone();
        for (name, value) in req.headers() {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = reqwest::Request::new(req.method().clone(), url);
        let upload = match req.body() {
            RequestBody::Empty => None,
            RequestBody::Json(bytes) => {
                *request.body_mut() = Some(bytes.clone().into());
                None
            }
            RequestBody::Multipart(form) => {
                let body = StreamingMultipartEncoder::new(form.clone()).encode();
                let content_type = HeaderValue::from_str(body.content_type())
                    .map_err(|e| GowaError::Config(format!("invalid multipart header: {e}")))?;
                headers.insert(CONTENT_TYPE, content_type);
                let (body, failure) = body.into_request_body();
                *request.body_mut() = Some(body);
                Some(failure)
            }
        };
        *request.headers_mut() = headers;

        Ok((request, upload))
    }

    async fn dispatch(&self, req: OutboundRequest) -> Result<reqwest::Response, GowaError> {
        if let RequestBody::Multipart(form) = req.body() {
            ensure_file_readable(form).await?;
        }
        let (request, upload) = self.build_request(&req)?;
        log::debug!("[Gowa] {} {}", request.method(), request.url());

        let result = (self.transport)(request).await;

        // A writer failure invalidates the exchange even if the gateway answered.
        if let Some(err) = upload.as_ref().and_then(UploadFailure::take) {
            return Err(err);
        }

        check_status(result?).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GowaError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let body = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("[Gowa] failed to read error body: {}", e);
            Bytes::new()
        }
    };
    log::debug!(
        "[Gowa] gateway returned {}: {}",
        status,
        String::from_utf8_lossy(&body)
    );

    Err(GowaError::HttpStatus {
        code: status.as_u16(),
        body,
    })
}

/// Open the form's file before the attempt so a missing or unreadable file is
/// reported as `Upload` no matter how the connection itself fares.
async fn ensure_file_readable(form: &MultipartForm) -> Result<(), GowaError> {
    let Some(file) = form.file_part() else {
        return Ok(());
    };
    tokio::fs::File::open(file.path())
        .await
        .map(drop)
        .map_err(|source| GowaError::Upload {
            path: file.path().to_path_buf(),
            source,
        })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GowaError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| GowaError::Decode(e.to_string()))
}

/// Builds one HTTP attempt for the retry layer.
#[derive(Clone)]
pub(crate) struct Dispatch {
    shared: Arc<Shared>,
}

impl Service<OutboundRequest> for Dispatch {
    type Response = reqwest::Response;
    type Error = GowaError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: OutboundRequest) -> Self::Future {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move { shared.dispatch(req).await })
    }
}

/// Executes gateway calls for one base address.
///
/// Holds only immutable state and a pooled HTTP client, so a single instance
/// should be shared by all callers.
#[derive(Clone)]
pub struct RequestExecutor {
    shared: Arc<Shared>,
    pipeline: RetryMiddlewareService<Dispatch>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.shared.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor that talks to the gateway directly.
    ///
    /// # Errors
    /// Returns `GowaError::Config` for an invalid base address, or
    /// `GowaError::Transport` if the HTTP client cannot be built.
    pub fn new(config: GowaConfig) -> Result<Self, GowaError> {
        let transport = HttpTransport::new(build_http_client(&config)?);
        let executor: TransportExecutor = Arc::new(move |request: reqwest::Request| {
            let mut transport = transport.clone();
            transport.call(request)
        });
        Self::with_transport(config, executor)
    }

    pub(crate) fn with_transport(
        config: GowaConfig,
        transport: TransportExecutor,
    ) -> Result<Self, GowaError> {
        let base_url = config.parsed_base_url()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        if let Some(auth) = config.basic_auth_header()? {
            default_headers.insert(AUTHORIZATION, auth);
        }

        let shared = Arc::new(Shared {
            base_url,
            default_headers,
            transport,
        });
        let pipeline = RetryMiddleware::new(config.retry).layer(Dispatch {
            shared: Arc::clone(&shared),
        });

        Ok(Self {
            shared,
            pipeline,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.shared.base_url
    }

    /// Headers sent with every request unless overridden per call.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.shared.default_headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Resolve `relative` against the base address, keeping its path prefix.
    ///
    /// `http://host/api` + `/send/message` gives `http://host/api/send/message`.
    pub fn build_url(&self, relative: &str) -> Url {
        join_url(&self.shared.base_url, relative)
    }

    /// Send a request and return the open response for any status below 400.
    ///
    /// # Errors
    /// - `GowaError::HttpStatus` for status >= 400, carrying the raw body bytes
    /// - `GowaError::Transport` once retries are exhausted
    /// - `GowaError::Upload` if a multipart file could not be streamed
    /// - `GowaError::Timeout` / `GowaError::Cancelled`
    pub async fn execute(&self, request: OutboundRequest) -> Result<reqwest::Response, GowaError> {
        let cancel = request.cancellation().cloned();
        let mut pipeline = self.pipeline.clone();
        self.bounded(cancel, pipeline.call(request)).await
    }

    /// Send a request and decode the JSON response into `T`.
    ///
    /// # Errors
    /// As [`execute`](Self::execute), plus `GowaError::Decode` when the body
    /// is not valid JSON for `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: OutboundRequest,
    ) -> Result<T, GowaError> {
        let cancel = request.cancellation().cloned();
        let mut pipeline = self.pipeline.clone();
        self.bounded(cancel, async move {
            let response = pipeline.call(request).await?;
            decode(response).await
        })
        .await
    }

    /// GET `path` with `query` and decode the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GowaError> {
        let request = OutboundRequest::get(path).query_pairs(query.iter().cloned());
        self.send_json(request).await
    }

    /// POST `payload` as JSON to `path` and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, GowaError> {
        self.send_json(OutboundRequest::post(path).json(payload)?)
            .await
    }

    /// POST with an empty body and decode the JSON response.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, GowaError> {
        self.send_json(OutboundRequest::post(path)).await
    }

    /// POST a streamed multipart form to `path` and decode the JSON response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> Result<T, GowaError> {
        self.send_json(OutboundRequest::post(path).multipart(form))
            .await
    }

    /// Apply the exchange deadline and the caller's cancellation token.
    async fn bounded<T>(
        &self,
        cancel: Option<CancellationToken>,
        exchange: impl Future<Output = Result<T, GowaError>>,
    ) -> Result<T, GowaError> {
        let timed = tokio::time::timeout(self.timeout, exchange);
        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(GowaError::Cancelled),
                    outcome = timed => outcome,
                }
            }
            None => timed.await,
        };
        outcome.map_err(|_| GowaError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_join_url_separator_combinations() {
        let bases = ["http://host/api", "http://host/api/", "http://host/api//"];
        let paths = ["send/message", "/send/message", "//send/message"];
        for base in bases {
            for path in paths {
                assert_eq!(
                    join_url(&url(base), path).as_str(),
                    "http://host/api/send/message",
                    "base={base} path={path}"
                );
            }
        }
    }

    #[test]
    fn test_join_url_root_base() {
        assert_eq!(
            join_url(&url("http://localhost:3000"), "/app/login").as_str(),
            "http://localhost:3000/app/login"
        );
        assert_eq!(
            join_url(&url("http://localhost:3000/"), "app/login").as_str(),
            "http://localhost:3000/app/login"
        );
    }

    #[test]
    fn test_join_url_empty_relative() {
        assert_eq!(join_url(&url("http://h"), "").as_str(), "http://h/");
        assert_eq!(join_url(&url("http://h/api/"), "/").as_str(), "http://h/api");
    }

    #[test]
    fn test_join_url_drops_base_query() {
        assert_eq!(
            join_url(&url("http://h/api?x=1#frag"), "chats").as_str(),
            "http://h/api/chats"
        );
    }

    #[test]
    fn test_join_url_keeps_escaped_segment() {
        let joined = join_url(&url("http://h"), "/chat/123%40s.whatsapp.net/messages");
        assert_eq!(joined.path(), "/chat/123%40s.whatsapp.net/messages");
    }

    #[test]
    fn test_default_headers_with_credentials() {
        let executor =
            RequestExecutor::new(GowaConfig::new("http://h").with_credentials("user", "pass"))
                .unwrap();
        let headers = executor.default_headers();
        assert_eq!(headers[ACCEPT], JSON);
        assert_eq!(headers[CONTENT_TYPE], JSON);
        assert_eq!(headers[AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_default_headers_without_credentials() {
        let executor = RequestExecutor::new(GowaConfig::new("http://h")).unwrap();
        assert!(executor.default_headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_base_url_fails_construction() {
        let result = RequestExecutor::new(GowaConfig::new("::not-a-url::"));
        assert!(matches!(result, Err(GowaError::Config(_))));
    }

    #[tokio::test]
    async fn test_per_call_headers_override_defaults() {
        let executor = RequestExecutor::new(GowaConfig::new("http://h/api")).unwrap();
        let req = OutboundRequest::get("/chats")
            .query("limit", "5")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let (request, upload) = executor.shared.build_request(&req).unwrap();

        assert_eq!(request.url().as_str(), "http://h/api/chats?limit=5");
        assert_eq!(request.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(request.headers()[ACCEPT], JSON);
        assert!(upload.is_none());
    }

    #[tokio::test]
    async fn test_multipart_content_type_replaces_json_default() {
        let executor = RequestExecutor::new(GowaConfig::new("http://h")).unwrap();
        let req = OutboundRequest::post("/send/file")
            .multipart(MultipartForm::new().text("phone", "1"));

        let (request, upload) = executor.shared.build_request(&req).unwrap();

        let content_type = request.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert!(upload.is_some());
    }
}

//! Retry, timeout and cancellation behavior through the full client.
//!
//! A flaky transport layer redirects the first N attempts to a closed port so
//! they fail with real connection errors, then lets the rest through.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use gowa_client::api::{ListChatsParams, SendMessageOptions};
use gowa_client::client::HttpTransport;
use gowa_client::middleware::{Layer, RetryPolicy, Service};
use gowa_client::{Gowa, GowaError};
use reqwest::{Request, Response, Url};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone)]
struct FlakyLayer {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl FlakyLayer {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Layer<HttpTransport> for FlakyLayer {
    type Service = FlakyService;

    fn layer(&self, inner: HttpTransport) -> Self::Service {
        FlakyService {
            inner,
            failures: self.failures,
            calls: Arc::clone(&self.calls),
        }
    }
}

#[derive(Clone)]
struct FlakyService {
    inner: HttpTransport,
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl Service<Request> for FlakyService {
    type Response = Response;
    type Error = reqwest::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, reqwest::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            *req.url_mut() = Url::parse("http://127.0.0.1:1/").unwrap();
        }
        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_min_wait(Duration::from_millis(1))
        .with_max_wait(Duration::from_millis(5))
}

fn devices_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "code": "SUCCESS",
        "message": "Fetch device success",
        "results": [{"name": "Chrome", "device": "1@s.whatsapp.net"}]
    }))
}

#[tokio::test]
async fn test_fail_twice_then_succeed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/devices"))
        .respond_with(devices_ok())
        .expect(1)
        .mount(&mock_server)
        .await;

    let flaky = FlakyLayer::new(2);
    let gowa = Gowa::builder()
        .base_url(mock_server.uri())
        .retry_policy(fast_retry())
        .with_middleware(flaky.clone())
        .build()
        .unwrap();

    let devices = gowa.app().devices().await.unwrap();

    assert_eq!(devices.results[0].name, "Chrome");
    assert_eq!(flaky.calls(), 3);
}

#[tokio::test]
async fn test_retry_budget_exhaustion_returns_transport_error() {
    let flaky = FlakyLayer::new(usize::MAX);
    let gowa = Gowa::builder()
        .base_url("http://127.0.0.1:1")
        .retry_policy(fast_retry().with_max_retries(2))
        .with_middleware(flaky.clone())
        .build()
        .unwrap();

    let result = gowa.app().devices().await;

    assert!(
        matches!(result, Err(GowaError::Transport(_))),
        "Expected Transport error, got {:?}",
        result
    );
    assert_eq!(flaky.calls(), 3);
}

#[tokio::test]
async fn test_post_retried_by_default() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "SUCCESS",
            "message": "ok",
            "results": {"message_id": "abc", "status": "sent"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let flaky = FlakyLayer::new(1);
    let gowa = Gowa::builder()
        .base_url(mock_server.uri())
        .retry_policy(fast_retry())
        .with_middleware(flaky.clone())
        .build()
        .unwrap();

    gowa.send()
        .message("1", "hi", &SendMessageOptions::default())
        .await
        .unwrap();
    assert_eq!(flaky.calls(), 2);
}

#[tokio::test]
async fn test_post_sent_once_when_non_idempotent_retry_disabled() {
    let flaky = FlakyLayer::new(1);
    let gowa = Gowa::builder()
        .base_url("http://127.0.0.1:1")
        .retry_policy(fast_retry().with_retry_non_idempotent(false))
        .with_middleware(flaky.clone())
        .build()
        .unwrap();

    let result = gowa
        .send()
        .message("1", "hi", &SendMessageOptions::default())
        .await;

    assert!(matches!(result, Err(GowaError::Transport(_))));
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test]
async fn test_validation_failure_never_reaches_transport() {
    let spy = FlakyLayer::new(0);
    let gowa = Gowa::builder()
        .base_url("http://127.0.0.1:1")
        .with_middleware(spy.clone())
        .build()
        .unwrap();

    let options = SendMessageOptions::default();
    assert!(matches!(
        gowa.send().message("", "hi", &options).await,
        Err(GowaError::Validation(_))
    ));
    assert!(matches!(
        gowa.send().message("1", "", &options).await,
        Err(GowaError::Validation(_))
    ));
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_list_chats_has_media_query() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "SUCCESS",
            "message": "ok",
            "results": {"data": []}
        })))
        .mount(&mock_server)
        .await;

    let gowa = Gowa::builder().base_url(mock_server.uri()).build().unwrap();
    let with_media = ListChatsParams {
        has_media: Some(true),
        ..Default::default()
    };
    gowa.chat().list(&with_media).await.unwrap();
    gowa.chat().list(&ListChatsParams::default()).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0]
        .url
        .query()
        .unwrap_or_default()
        .contains("has_media=true"));
    assert!(!requests[1]
        .url
        .query()
        .unwrap_or_default()
        .contains("has_media"));
}

#[tokio::test]
async fn test_timeout_covers_whole_exchange() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/login"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let gowa = Gowa::builder()
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let started = Instant::now();
    let result = gowa.app().login().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(
        matches!(result, Err(GowaError::Timeout(_))),
        "Expected Timeout, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_cancel_aborts_pending_retry() {
    let flaky = FlakyLayer::new(usize::MAX);
    let gowa = Gowa::builder()
        .base_url("http://127.0.0.1:1")
        .retry_policy(
            RetryPolicy::new()
                .with_min_wait(Duration::from_secs(10))
                .with_max_wait(Duration::from_secs(10)),
        )
        .with_middleware(flaky.clone())
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let handle = gowa.with_cancellation(token.clone());
    let call = tokio::spawn(async move { handle.app().devices().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();

    let result = call.await.unwrap();
    assert!(matches!(result, Err(GowaError::Cancelled)));
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_client() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/devices"))
        .respond_with(devices_ok())
        .expect(16)
        .mount(&mock_server)
        .await;

    let counter = FlakyLayer::new(0);
    let gowa = Gowa::builder()
        .base_url(mock_server.uri())
        .with_middleware(counter.clone())
        .build()
        .unwrap();

    let calls = (0..16).map(|_| {
        let gowa = gowa.clone();
        async move { gowa.app().devices().await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(counter.calls(), 16);
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use stashbox::{
    CacheKey, CachePolicy, CacheableRequest, CacheableResponse, CachedResponse,
    ResponseCachePolicy, Upstream,
};

#[derive(Debug, Clone)]
pub struct MockRequest {
    method: &'static str,
    uri: String,
}

impl MockRequest {
    pub fn new(method: &'static str, uri: impl Into<String>) -> Self {
        MockRequest {
            method,
            uri: uri.into(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }
}

impl CacheableRequest for MockRequest {
    fn method(&self) -> &str {
        self.method
    }

    fn uri(&self) -> String {
        self.uri.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: Bytes,
    /// Rebuilt from a stored entry.
    pub from_cache: bool,
    /// `into_cached` refuses this response.
    pub uncacheable: bool,
}

impl MockResponse {
    pub fn new(status: u16, body: &'static str) -> Self {
        MockResponse {
            status,
            body: Bytes::from_static(body.as_bytes()),
            from_cache: false,
            uncacheable: false,
        }
    }

    pub fn cached(status: u16, body: &'static str) -> CachedResponse {
        CachedResponse::new(status).with_body(Bytes::from_static(body.as_bytes()))
    }
}

impl CacheableResponse for MockResponse {
    fn status(&self) -> u16 {
        self.status
    }

    async fn into_cached(self) -> ResponseCachePolicy<Self> {
        if self.uncacheable {
            return CachePolicy::NonCacheable(self);
        }
        CachePolicy::Cacheable(CachedResponse::new(self.status).with_body(self.body))
    }

    fn from_cached(cached: CachedResponse, _key: &CacheKey) -> Self {
        MockResponse {
            status: cached.status,
            body: cached.body,
            from_cache: true,
            uncacheable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError(pub &'static str);

/// Upstream answering every call with the same response after `delay`.
#[derive(Clone)]
pub struct MockUpstream {
    calls: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    delay: Duration,
    response: Result<MockResponse, UpstreamError>,
}

impl MockUpstream {
    pub fn new(response: MockResponse) -> Self {
        MockUpstream {
            calls: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            response: Ok(response),
        }
    }

    pub fn ok(status: u16, body: &'static str) -> Self {
        Self::new(MockResponse::new(status, body))
    }

    pub fn failing() -> Self {
        MockUpstream {
            response: Err(UpstreamError("connection reset")),
            ..Self::ok(200, "")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that produced their response.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Upstream<MockRequest> for MockUpstream {
    type Response = Result<MockResponse, UpstreamError>;
    type Future = BoxFuture<'static, Self::Response>;

    fn call(&mut self, _req: MockRequest) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let completed = self.completed.clone();
        let delay = self.delay;
        let response = self.response.clone();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            completed.fetch_add(1, Ordering::SeqCst);
            response
        })
    }
}

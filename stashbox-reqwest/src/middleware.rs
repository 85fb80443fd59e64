//! Cache middlewares for reqwest-middleware.

use async_trait::async_trait;
use http::{Extensions, HeaderName};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use stashbox::{FallbackRace, Handler};
use stashbox_backend::Backend;
use stashbox_core::CacheStatus;
use stashbox_http::{CacheableHttpRequest, CacheableHttpResponse, DEFAULT_CACHE_STATUS_HEADER};
use tracing::debug;

use crate::upstream::{ClientUpstream, NextUpstream, buffered_body_to_reqwest, into_cacheable_request};

fn into_reqwest_response(
    response: Result<CacheableHttpResponse<reqwest::Body>>,
    status: CacheStatus,
    status_header: Option<&HeaderName>,
) -> Result<Response> {
    let mut response = response?;
    if let Some(header) = status_header {
        response.set_cache_status(status, header);
    }
    let (parts, body) = response.into_response().into_parts();
    let response = http::Response::from_parts(parts, buffered_body_to_reqwest(body));
    Ok(response.into())
}

/// Cache middleware running a handler in front of the rest of the chain.
///
/// Works with any handler that accepts a borrowed upstream, such as
/// [`CacheAside`](stashbox::CacheAside):
///
/// ```no_run
/// use reqwest_middleware::ClientBuilder;
/// use stashbox::CacheAside;
/// use stashbox_moka::MokaBackend;
/// use stashbox_reqwest::CacheMiddleware;
///
/// let handler = CacheAside::builder()
///     .backend(MokaBackend::builder().max_entries(1_000).build())
///     .build()
///     .unwrap();
///
/// let client = ClientBuilder::new(reqwest::Client::new())
///     .with(CacheMiddleware::new(handler).with_status_header())
///     .build();
/// ```
#[derive(Clone)]
pub struct CacheMiddleware<H> {
    handler: H,
    status_header: Option<HeaderName>,
}

impl<H> CacheMiddleware<H> {
    /// Creates a middleware that adds no status header.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            status_header: None,
        }
    }

    /// Adds the cache status to responses under `x-cache-status`.
    pub fn with_status_header(self) -> Self {
        self.status_header(DEFAULT_CACHE_STATUS_HEADER)
    }

    /// Adds the cache status to responses under `header`.
    pub fn status_header(mut self, header: HeaderName) -> Self {
        self.status_header = Some(header);
        self
    }

    /// Handler this middleware runs.
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

#[async_trait]
impl<H> Middleware for CacheMiddleware<H>
where
    H: for<'a> Handler<CacheableHttpRequest<reqwest::Body>, NextUpstream<'a>>
        + Send
        + Sync
        + 'static,
{
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let request = into_cacheable_request(req)?;
        let upstream = NextUpstream::new(next, extensions.clone());

        let (response, status) = self.handler.handle(request, upstream).await;
        debug!(status = status.as_str(), "Cache middleware finished");
        into_reqwest_response(response, status, self.status_header.as_ref())
    }
}

/// Middleware serving the last stored response when upstream is slow or
/// failing.
///
/// Requests are sent through `client`, not through the rest of the chain:
/// after a fallback has been served the live call keeps running in the
/// background and must not borrow from the request.
///
/// ```no_run
/// use std::time::Duration;
/// use reqwest_middleware::ClientBuilder;
/// use stashbox::FallbackRace;
/// use stashbox_moka::MokaBackend;
/// use stashbox_reqwest::FallbackMiddleware;
///
/// let handler = FallbackRace::builder()
///     .backend(MokaBackend::builder().max_entries(1_000).build())
///     .max_timeout(Duration::from_millis(300))
///     .build()
///     .unwrap();
///
/// let inner = reqwest::Client::new();
/// let client = ClientBuilder::new(inner.clone())
///     .with(FallbackMiddleware::new(handler, inner))
///     .build();
/// ```
pub struct FallbackMiddleware<B> {
    handler: FallbackRace<B>,
    upstream: ClientUpstream,
    status_header: Option<HeaderName>,
}

impl<B> Clone for FallbackMiddleware<B> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            upstream: self.upstream.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<B> FallbackMiddleware<B> {
    /// Creates a middleware sending live requests through `client`.
    ///
    /// Adds no status header.
    pub fn new(
        handler: FallbackRace<B>,
        client: impl Into<reqwest_middleware::ClientWithMiddleware>,
    ) -> Self {
        Self {
            handler,
            upstream: ClientUpstream::new(client),
            status_header: None,
        }
    }

    /// Adds the cache status to responses under `x-cache-status`.
    pub fn with_status_header(self) -> Self {
        self.status_header(DEFAULT_CACHE_STATUS_HEADER)
    }

    /// Adds the cache status to responses under `header`.
    pub fn status_header(mut self, header: HeaderName) -> Self {
        self.status_header = Some(header);
        self
    }

    /// Handler this middleware runs, e.g. for its stats or invalidation.
    pub fn handler(&self) -> &FallbackRace<B> {
        &self.handler
    }
}

#[async_trait]
impl<B> Middleware for FallbackMiddleware<B>
where
    B: Backend + 'static,
{
    async fn handle(
        &self,
        req: Request,
        _extensions: &mut Extensions,
        _next: Next<'_>,
    ) -> Result<Response> {
        let request = into_cacheable_request(req)?;

        let (response, status) = self
            .handler
            .handle(request, self.upstream.clone())
            .await;
        debug!(status = status.as_str(), "Fallback middleware finished");
        into_reqwest_response(response, status, self.status_header.as_ref())
    }
}

//! Upstream adapter for tower services.
//!
//! [`TowerUpstream`] lets a handler call the wrapped service on a miss. It
//! is created by [`CacheService`](crate::service::CacheService) for every
//! request.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::ready;
use http::{Request, Response};
use hyper::body::Body as HttpBody;
use pin_project::pin_project;
use stashbox_core::Upstream;
use stashbox_http::{BufferedBody, CacheableHttpRequest, CacheableHttpResponse};
use tower::Service;

/// Future returned by [`TowerUpstream::call`].
///
/// Wraps the service future and turns its response into a
/// [`CacheableHttpResponse`].
#[pin_project]
pub struct TowerUpstreamFuture<F, ResBody, E> {
    #[pin]
    inner: F,
    _phantom: PhantomData<fn() -> (ResBody, E)>,
}

impl<F, ResBody, E> TowerUpstreamFuture<F, ResBody, E> {
    /// Wraps a service future.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            _phantom: PhantomData,
        }
    }
}

impl<F, ResBody, E> Future for TowerUpstreamFuture<F, ResBody, E>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: HttpBody,
{
    type Output = Result<CacheableHttpResponse<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let response = ready!(this.inner.poll(cx))?;
        let (parts, body) = response.into_parts();
        let buffered = Response::from_parts(parts, BufferedBody::passthrough(body));
        Poll::Ready(Ok(CacheableHttpResponse::from_response(buffered)))
    }
}

/// [`Upstream`] backed by a tower [`Service`].
///
/// The service must already be ready when the adapter is created.
pub struct TowerUpstream<S, ReqBody, ResBody> {
    service: S,
    _phantom: PhantomData<fn() -> (ReqBody, ResBody)>,
}

impl<S, ReqBody, ResBody> TowerUpstream<S, ReqBody, ResBody> {
    /// Wraps a service that is ready to be called.
    pub fn new(service: S) -> Self {
        Self {
            service,
            _phantom: PhantomData,
        }
    }
}

impl<S, ReqBody, ResBody> Upstream<CacheableHttpRequest<ReqBody>>
    for TowerUpstream<S, ReqBody, ResBody>
where
    S: Service<Request<BufferedBody<ReqBody>>, Response = Response<ResBody>>,
    S::Future: Send,
    ReqBody: HttpBody,
    ResBody: HttpBody,
{
    type Response = Result<CacheableHttpResponse<ResBody>, S::Error>;
    type Future = TowerUpstreamFuture<S::Future, ResBody, S::Error>;

    fn call(&mut self, req: CacheableHttpRequest<ReqBody>) -> Self::Future {
        TowerUpstreamFuture::new(self.service.call(req.into_request()))
    }
}

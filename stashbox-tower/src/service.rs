use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{HeaderName, Request, Response};
use hyper::body::Body as HttpBody;
use stashbox::Handler;
use stashbox_http::{BufferedBody, CacheableHttpRequest};
use tower::Service;
use tracing::debug;

use crate::upstream::TowerUpstream;

/// Future returned by [`CacheService`].
pub type CacheServiceFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Service produced by the [`Cache`](crate::Cache) layer.
pub struct CacheService<S, H> {
    upstream: S,
    handler: H,
    status_header: Option<HeaderName>,
}

impl<S, H> CacheService<S, H> {
    /// Puts `handler` in front of `upstream`.
    ///
    /// With a `status_header`, every response carries its cache status
    /// under that name.
    pub fn new(upstream: S, handler: H, status_header: Option<HeaderName>) -> Self {
        CacheService {
            upstream,
            handler,
            status_header,
        }
    }

    /// Handler this service runs.
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<S, H> Clone for CacheService<S, H>
where
    S: Clone,
    H: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            handler: self.handler.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<S, H, ReqBody, ResBody> Service<Request<ReqBody>> for CacheService<S, H>
where
    S: Service<Request<BufferedBody<ReqBody>>, Response = Response<ResBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    H: Handler<CacheableHttpRequest<ReqBody>, TowerUpstream<S, ReqBody, ResBody>>
        + Clone
        + Send
        + Sync
        + 'static,
    ReqBody: HttpBody + Send + 'static,
    ReqBody::Error: Send,
    ResBody: HttpBody + Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<BufferedBody<ResBody>>;
    type Error = S::Error;
    type Future = CacheServiceFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (parts, body) = req.into_parts();
        let request =
            CacheableHttpRequest::from_request(Request::from_parts(parts, BufferedBody::passthrough(body)));

        // The ready service goes to this request, the clone stays for the next one.
        let ready = self.upstream.clone();
        let ready = std::mem::replace(&mut self.upstream, ready);
        let upstream = TowerUpstream::new(ready);

        let handler = self.handler.clone();
        let status_header = self.status_header.clone();
        Box::pin(async move {
            let (response, status) = handler.handle(request, upstream).await;
            debug!(status = status.as_str(), "Cache service finished");
            let mut response = response?;
            if let Some(header) = &status_header {
                response.set_cache_status(status, header);
            }
            Ok(response.into_response())
        })
    }
}

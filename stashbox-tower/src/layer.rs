use http::HeaderName;
use stashbox_http::DEFAULT_CACHE_STATUS_HEADER;
use tower::Layer;

use crate::service::CacheService;

/// Tower layer putting a stashbox handler in front of a service.
///
/// Works with [`CacheAside`](stashbox::CacheAside) and
/// [`FallbackRace`](stashbox::FallbackRace): tower futures own their
/// service, so the live call can outlive the request.
#[derive(Clone)]
pub struct Cache<H> {
    handler: H,
    status_header: Option<HeaderName>,
}

impl<H> Cache<H> {
    /// Creates a layer that adds no status header.
    pub fn new(handler: H) -> Self {
        Cache {
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
}

impl<S, H> Layer<S> for Cache<H>
where
    H: Clone,
{
    type Service = CacheService<S, H>;

    fn layer(&self, upstream: S) -> Self::Service {
        CacheService::new(upstream, self.handler.clone(), self.status_header.clone())
    }
}

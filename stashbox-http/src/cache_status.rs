//! Cache status response header.

use http::{HeaderValue, header::HeaderName};
use hyper::body::Body as HttpBody;
use stashbox_core::CacheStatus;

use crate::CacheableHttpResponse;

/// Default header name for the cache status (HIT/MISS/BYPASS).
///
/// The value is `x-cache-status`. Middlewares take a custom name through
/// their `status_header` builder method.
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

impl<ResBody> CacheableHttpResponse<ResBody>
where
    ResBody: HttpBody,
{
    /// Sets `header` to the upper-case cache status, replacing any value.
    pub fn set_cache_status(&mut self, status: CacheStatus, header: &HeaderName) {
        self.parts.headers.insert(
            header.clone(),
            HeaderValue::from_static(status.as_header_value()),
        );
    }
}

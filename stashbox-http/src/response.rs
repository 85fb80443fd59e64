use std::future::Future;

use http::{Method, Response, StatusCode, Uri, Version, response::Parts};
use hyper::body::Body as HttpBody;
use hyper::ext::ReasonPhrase;
use stashbox_core::{
    CacheKey, CachePolicy, CacheableResponse, CachedResponse, HttpVersion, ResponseCachePolicy,
};
use tracing::{debug, warn};

use crate::body::BufferedBody;
use crate::headers;

/// Request a response was produced for.
///
/// Stored entries carry no request data, so responses rebuilt from the cache
/// get this extension attached instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Request method.
    pub method: Method,
    /// Request URI, as it appeared in the cache key.
    pub uri: Uri,
}

/// `http::Response` that can be stored in and rebuilt from the cache.
#[derive(Debug)]
pub struct CacheableHttpResponse<ResBody>
where
    ResBody: HttpBody,
{
    /// Status line, headers and extensions.
    pub parts: Parts,
    /// Body, read in full only when the response is stored.
    pub body: BufferedBody<ResBody>,
}

impl<ResBody> CacheableHttpResponse<ResBody>
where
    ResBody: HttpBody,
{
    /// Wraps a response.
    pub fn from_response(response: Response<BufferedBody<ResBody>>) -> Self {
        let (parts, body) = response.into_parts();
        CacheableHttpResponse { parts, body }
    }

    /// Unwraps the response.
    pub fn into_response(self) -> Response<BufferedBody<ResBody>> {
        Response::from_parts(self.parts, self.body)
    }

    /// Request this response was rebuilt for, if it came from the cache.
    pub fn origin(&self) -> Option<&RequestOrigin> {
        self.parts.extensions.get::<RequestOrigin>()
    }
}

fn reason_phrase(parts: &Parts) -> String {
    parts
        .extensions
        .get::<ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| parts.status.canonical_reason())
        .unwrap_or_default()
        .to_owned()
}

fn to_http_version(version: Version) -> HttpVersion {
    match version {
        Version::HTTP_09 => HttpVersion::new(0, 9),
        Version::HTTP_10 => HttpVersion::HTTP_10,
        Version::HTTP_2 => HttpVersion::HTTP_2,
        Version::HTTP_3 => HttpVersion::HTTP_3,
        _ => HttpVersion::HTTP_11,
    }
}

fn from_http_version(version: HttpVersion) -> Version {
    match (version.major, version.minor) {
        (0, 9) => Version::HTTP_09,
        (1, 0) => Version::HTTP_10,
        (2, _) => Version::HTTP_2,
        (3, _) => Version::HTTP_3,
        _ => Version::HTTP_11,
    }
}

impl<ResBody> CacheableResponse for CacheableHttpResponse<ResBody>
where
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Send,
{
    fn status(&self) -> u16 {
        self.parts.status.as_u16()
    }

    fn into_cached(self) -> impl Future<Output = ResponseCachePolicy<Self>> + Send {
        async move {
            let body = match self.body.collect().await {
                Ok(body) => body,
                Err(body) => {
                    debug!(status = %self.parts.status, "Response body failed, not caching");
                    return CachePolicy::NonCacheable(CacheableHttpResponse {
                        parts: self.parts,
                        body,
                    });
                }
            };

            let (transport, content) = headers::split(&self.parts.headers);
            let mut cached = CachedResponse::new(self.parts.status.as_u16())
                .with_reason(reason_phrase(&self.parts))
                .with_version(to_http_version(self.parts.version))
                .with_body(body);
            cached.headers = transport;
            cached.content_headers = content;
            CachePolicy::Cacheable(cached)
        }
    }

    fn from_cached(cached: CachedResponse, key: &CacheKey) -> Self {
        let status = StatusCode::from_u16(cached.status).unwrap_or_else(|_| {
            warn!(status = cached.status, key = %key, "Stored status code is invalid");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut response = Response::new(BufferedBody::complete(cached.body));
        *response.status_mut() = status;
        *response.version_mut() = from_http_version(cached.version);
        headers::extend(response.headers_mut(), &cached.headers);
        headers::extend(response.headers_mut(), &cached.content_headers);

        if !cached.reason.is_empty() && status.canonical_reason() != Some(cached.reason.as_str()) {
            match ReasonPhrase::try_from(cached.reason.into_bytes()) {
                Ok(reason) => {
                    response.extensions_mut().insert(reason);
                }
                Err(_) => debug!(key = %key, "Stored reason phrase is invalid"),
            }
        }

        if let (Ok(method), Ok(uri)) = (
            Method::from_bytes(key.method().as_bytes()),
            key.uri().parse::<Uri>(),
        ) {
            response.extensions_mut().insert(RequestOrigin { method, uri });
        }

        CacheableHttpResponse::from_response(response)
    }
}

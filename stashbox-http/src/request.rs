use http::{Request, request::Parts};
use hyper::body::Body as HttpBody;
use stashbox_core::CacheableRequest;

use crate::body::BufferedBody;

/// `http::Request` that can be looked up in the cache.
///
/// The key is the method followed by the request URI as given, so client
/// requests should carry an absolute URI.
#[derive(Debug)]
pub struct CacheableHttpRequest<ReqBody>
where
    ReqBody: HttpBody,
{
    parts: Parts,
    body: BufferedBody<ReqBody>,
}

impl<ReqBody> CacheableHttpRequest<ReqBody>
where
    ReqBody: HttpBody,
{
    /// Wraps a request.
    pub fn from_request(request: Request<BufferedBody<ReqBody>>) -> Self {
        let (parts, body) = request.into_parts();
        Self { parts, body }
    }

    /// Unwraps the request.
    pub fn into_request(self) -> Request<BufferedBody<ReqBody>> {
        Request::from_parts(self.parts, self.body)
    }

    /// Method, URI, headers and extensions of the request.
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Splits the request into its head and body.
    pub fn into_parts(self) -> (Parts, BufferedBody<ReqBody>) {
        (self.parts, self.body)
    }
}

impl<ReqBody> CacheableRequest for CacheableHttpRequest<ReqBody>
where
    ReqBody: HttpBody,
{
    fn method(&self) -> &str {
        self.parts.method.as_str()
    }

    fn uri(&self) -> String {
        self.parts.uri.to_string()
    }
}

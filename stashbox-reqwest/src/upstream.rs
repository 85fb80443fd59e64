//! Upstreams that send a cacheable request on with reqwest.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::Extensions;
use reqwest_middleware::{ClientWithMiddleware, Next, Result};
use stashbox_core::Upstream;
use stashbox_http::{BufferedBody, CacheableHttpRequest, CacheableHttpResponse};

type Request = CacheableHttpRequest<reqwest::Body>;
type Response = Result<CacheableHttpResponse<reqwest::Body>>;

/// Upstream that runs the rest of the middleware chain.
///
/// The returned future borrows the chain, so it cannot outlive the
/// request. Use it with handlers that never detach the upstream call.
pub struct NextUpstream<'a> {
    next: Next<'a>,
    extensions: Extensions,
}

impl<'a> NextUpstream<'a> {
    /// Runs `next` with the request's `extensions` on each call.
    pub fn new(next: Next<'a>, extensions: Extensions) -> Self {
        Self { next, extensions }
    }
}

impl<'a> Upstream<Request> for NextUpstream<'a> {
    type Response = Response;
    type Future = Pin<Box<dyn Future<Output = Response> + Send + 'a>>;

    fn call(&mut self, req: Request) -> Self::Future {
        let next = self.next.clone();
        let mut extensions = std::mem::take(&mut self.extensions);

        Box::pin(async move {
            let request = into_reqwest_request(req)?;
            let response = next.run(request, &mut extensions).await?;
            Ok(from_reqwest_response(response))
        })
    }
}

/// Upstream that sends requests through its own client.
///
/// The futures it returns own everything they need, so the call can keep
/// running after the request that started it has been answered.
#[derive(Clone, Debug)]
pub struct ClientUpstream {
    client: ClientWithMiddleware,
}

impl ClientUpstream {
    /// Sends every request through `client`.
    pub fn new(client: impl Into<ClientWithMiddleware>) -> Self {
        Self {
            client: client.into(),
        }
    }
}

impl Upstream<Request> for ClientUpstream {
    type Response = Response;
    type Future = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

    fn call(&mut self, req: Request) -> Self::Future {
        let client = self.client.clone();

        Box::pin(async move {
            let request = into_reqwest_request(req)?;
            let response = client.execute(request).await?;
            Ok(from_reqwest_response(response))
        })
    }
}

pub(crate) fn into_cacheable_request(request: reqwest::Request) -> Result<Request> {
    let request: http::Request<reqwest::Body> = request
        .try_into()
        .map_err(reqwest_middleware::Error::Reqwest)?;
    let (parts, body) = request.into_parts();
    Ok(CacheableHttpRequest::from_request(http::Request::from_parts(
        parts,
        BufferedBody::passthrough(body),
    )))
}

fn into_reqwest_request(req: Request) -> Result<reqwest::Request> {
    let (parts, body) = req.into_parts();
    let request = http::Request::from_parts(parts, buffered_body_to_reqwest(body));
    request
        .try_into()
        .map_err(reqwest_middleware::Error::Reqwest)
}

fn from_reqwest_response(response: reqwest::Response) -> CacheableHttpResponse<reqwest::Body> {
    let response: http::Response<reqwest::Body> = response.into();
    let (parts, body) = response.into_parts();
    CacheableHttpResponse::from_response(http::Response::from_parts(
        parts,
        BufferedBody::passthrough(body),
    ))
}

/// Converts a [`BufferedBody`] back to a `reqwest::Body`.
///
/// A passthrough body is unwrapped as is. A failed body is wrapped so that
/// the reader still sees the original error.
pub fn buffered_body_to_reqwest(buffered: BufferedBody<reqwest::Body>) -> reqwest::Body {
    match buffered {
        BufferedBody::Passthrough(body) => body,
        BufferedBody::Complete(Some(bytes)) => reqwest::Body::from(bytes),
        BufferedBody::Complete(None) => reqwest::Body::from(Bytes::new()),
        failed @ BufferedBody::Failed(_) => reqwest::Body::wrap(failed),
    }
}

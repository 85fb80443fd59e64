//! Inner transport abstraction.

use std::future::Future;

/// The inner transport a cache handler forwards requests to.
///
/// Adapters implement it for the rest of a middleware chain or for a tower
/// service. Origin failures travel inside `Response` (usually a `Result`),
/// never as panics.
///
/// # Examples
///
/// ```
/// use stashbox_core::Upstream;
/// use std::future::{Ready, ready};
///
/// struct Echo;
///
/// impl Upstream<String> for Echo {
///     type Response = Result<String, std::io::Error>;
///     type Future = Ready<Self::Response>;
///
///     fn call(&mut self, req: String) -> Self::Future {
///         ready(Ok(req))
///     }
/// }
/// ```
pub trait Upstream<Req> {
    /// The response type returned by the upstream service
    type Response;

    /// The future that resolves to the response
    type Future: Future<Output = Self::Response> + Send;

    /// Call the upstream service with the given request
    fn call(&mut self, req: Req) -> Self::Future;
}

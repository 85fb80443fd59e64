//! Cacheable response trait.
//!
//! The [`CacheableResponse`] trait converts a protocol response to its
//! [`CachedResponse`] snapshot and back. Conversion to the snapshot may need
//! to read the whole body, so it is asynchronous; rebuilding is not.

use std::future::Future;

use crate::{CacheKey, CachePolicy, CachedResponse};

/// Cache decision for a response.
///
/// - `Cacheable` carries the snapshot to store
/// - `NonCacheable` carries the original response, untouched
pub type ResponseCachePolicy<R> = CachePolicy<CachedResponse, R>;

/// Response types that can be stored in and rebuilt from the cache.
///
/// # Example Implementation
///
/// ```
/// use std::future::{Future, Ready, ready};
/// use stashbox_core::{CacheKey, CachePolicy, CachedResponse, CacheableResponse};
///
/// struct Plain {
///     status: u16,
///     body: String,
/// }
///
/// impl CacheableResponse for Plain {
///     fn status(&self) -> u16 {
///         self.status
///     }
///
///     fn into_cached(self) -> impl Future<Output = CachePolicy<CachedResponse, Self>> + Send {
///         ready(CachePolicy::Cacheable(
///             CachedResponse::new(self.status).with_body(self.body),
///         ))
///     }
///
///     fn from_cached(cached: CachedResponse, _key: &CacheKey) -> Self {
///         Plain {
///             status: cached.status,
///             body: String::from_utf8_lossy(&cached.body).into_owned(),
///         }
///     }
/// }
/// ```
pub trait CacheableResponse
where
    Self: Sized + Send,
{
    /// Status code used for TTL lookup and statistics.
    fn status(&self) -> u16;

    /// Convert this response to its cached representation.
    ///
    /// Returns `NonCacheable` with the response if the snapshot cannot be
    /// taken, for example when reading the body fails.
    fn into_cached(self) -> impl Future<Output = ResponseCachePolicy<Self>> + Send;

    /// Rebuild a live response from a snapshot.
    ///
    /// `key` identifies the request the snapshot is served for, so that
    /// implementations can reattach request information.
    fn from_cached(cached: CachedResponse, key: &CacheKey) -> Self;
}

//! Cacheable request trait.
//!
//! - [`CacheableRequest`] - what a handler needs to know about a request
//! - [`CacheablePolicyData`] - a cacheable request bundled with its key
//! - [`RequestCachePolicy`] - the outcome of [`CacheableRequest::cache_policy`]
//!
//! Only `GET` and `HEAD` requests take part in caching. Every other method
//! goes straight to the upstream and never touches the store.

use crate::{CacheKey, CachePolicy};

/// Methods whose responses may be cached.
pub const CACHEABLE_METHODS: [&str; 2] = ["GET", "HEAD"];

/// A cacheable request bundled with its cache key.
pub struct CacheablePolicyData<T> {
    /// Key the request is looked up and stored under.
    pub key: CacheKey,
    /// The original request.
    pub request: T,
}

impl<T> CacheablePolicyData<T> {
    /// Creates a new cacheable policy data with the given key and request.
    pub fn new(key: CacheKey, request: T) -> Self {
        CacheablePolicyData { key, request }
    }
}

/// Cache decision for a request.
///
/// - `Cacheable` carries the request together with its key
/// - `NonCacheable` carries the untouched request
pub type RequestCachePolicy<T> = CachePolicy<CacheablePolicyData<T>, T>;

/// Request types that can participate in caching.
pub trait CacheableRequest: Sized {
    /// HTTP method, upper case as sent on the wire.
    fn method(&self) -> &str;

    /// Absolute request URI.
    fn uri(&self) -> String;

    /// Returns `true` for `GET` and `HEAD`.
    fn is_cacheable(&self) -> bool {
        CACHEABLE_METHODS.contains(&self.method())
    }

    /// Key for this request, optionally namespaced with `prefix`.
    fn cache_key(&self, prefix: Option<&str>) -> CacheKey {
        match prefix {
            Some(prefix) => CacheKey::with_prefix(prefix, self.method(), self.uri()),
            None => CacheKey::new(self.method(), self.uri()),
        }
    }

    /// Decides whether the request is cached and derives its key.
    fn cache_policy(self, prefix: Option<&str>) -> RequestCachePolicy<Self> {
        if self.is_cacheable() {
            let key = self.cache_key(prefix);
            CachePolicy::Cacheable(CacheablePolicyData::new(key, self))
        } else {
            CachePolicy::NonCacheable(self)
        }
    }
}

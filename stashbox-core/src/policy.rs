//! Cache decision type.

/// Result of a cache decision.
///
/// Represents whether an entity should be cached or passed through without
/// caching. Both variants preserve the entity, just wrapped differently.
///
/// # Type Parameters
///
/// * `C` - Type of the cacheable entity (usually the cached representation)
/// * `N` - Type of the non-cacheable entity (usually the original value)
///
/// # Example
///
/// ```
/// use stashbox_core::CachePolicy;
///
/// fn decide(status: u16, body: String) -> CachePolicy<String, String> {
///     if status < 500 {
///         CachePolicy::Cacheable(body)
///     } else {
///         CachePolicy::NonCacheable(body)
///     }
/// }
///
/// assert!(decide(200, "OK".to_owned()).is_cacheable());
/// ```
#[derive(Debug)]
pub enum CachePolicy<C, N> {
    /// Entity should be cached.
    Cacheable(C),
    /// Entity should not be cached; pass through directly.
    NonCacheable(N),
}

impl<C, N> CachePolicy<C, N> {
    /// Returns `true` for [`CachePolicy::Cacheable`].
    pub fn is_cacheable(&self) -> bool {
        matches!(self, CachePolicy::Cacheable(_))
    }
}

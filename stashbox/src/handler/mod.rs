//! Caching strategies.
//!
//! A [`Handler`] sits between a caller and an [`Upstream`]: it decides
//! whether a request touches the store, calls upstream when it must, and
//! reports how the response was obtained as a [`CacheStatus`].
//!
//! * [`CacheAside`] checks the store first and writes upstream responses
//!   back with a TTL taken from an [`ExpirationTable`](crate::ExpirationTable).
//! * [`FallbackRace`] prefers upstream but serves the stored answer when
//!   upstream is slower than a deadline or fails.

use std::future::Future;

use smol_str::SmolStr;
use stashbox_backend::{Backend, DeleteStatus};
use stashbox_core::{CACHEABLE_METHODS, CacheKey, CacheStatus, Upstream};
use tracing::{debug, warn};

use crate::error::InvalidateError;

mod cache_aside;
mod fallback;

pub use cache_aside::{CacheAside, CacheAsideBuilder};
pub use fallback::{FallbackRace, FallbackRaceBuilder};

/// A caching strategy applied to one request at a time.
///
/// Implementations are shared by all concurrent requests, hence `&self`.
pub trait Handler<Req, U>
where
    U: Upstream<Req>,
{
    /// Produces the response for `req`, calling `upstream` only when needed.
    fn handle(
        &self,
        req: Req,
        upstream: U,
    ) -> impl Future<Output = (U::Response, CacheStatus)> + Send;
}

/// Marker type for a builder field that has not been set yet.
///
/// When you see `NotSet` in a compiler error, the builder is missing a
/// backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

pub(crate) fn cache_key(prefix: Option<&SmolStr>, method: &str, uri: &str) -> CacheKey {
    match prefix {
        Some(prefix) => CacheKey::with_prefix(prefix.clone(), method, uri),
        None => CacheKey::new(method, uri),
    }
}

/// Removes stored entries for `uri`.
///
/// With a method, exactly that entry is removed and a store failure is
/// returned. Without one, every cacheable method is removed and failures
/// are logged and skipped.
pub(crate) async fn invalidate<B>(
    backend: &B,
    prefix: Option<&SmolStr>,
    uri: &str,
    method: Option<&str>,
) -> Result<u32, InvalidateError>
where
    B: Backend + ?Sized,
{
    if let Some(method) = method {
        let key = cache_key(prefix, method, uri);
        return match backend.remove(&key).await {
            Ok(status) => {
                debug!(%key, ?status, "Invalidated cache entry");
                Ok(removed(status))
            }
            Err(source) => Err(InvalidateError { key, source }),
        };
    }

    let mut total = 0;
    for method in CACHEABLE_METHODS {
        let key = cache_key(prefix, method, uri);
        match backend.remove(&key).await {
            Ok(status) => {
                debug!(%key, ?status, "Invalidated cache entry");
                total += removed(status);
            }
            Err(error) => warn!(%key, %error, "Failed to invalidate cache entry"),
        }
    }
    Ok(total)
}

fn removed(status: DeleteStatus) -> u32 {
    match status {
        DeleteStatus::Deleted(count) => count,
        DeleteStatus::Missing => 0,
    }
}

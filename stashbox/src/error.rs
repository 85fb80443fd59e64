use stashbox_backend::BackendError;
use stashbox_core::CacheKey;
use thiserror::Error;

/// Invalid handler configuration, reported when a handler is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration that bounds waiting was set to zero.
    #[error("`{0}` must be greater than zero")]
    ZeroDuration(&'static str),

    /// An expiration entry is keyed by something that is not a status code.
    #[error("invalid status code {0} in expiration table (expected 100..=999)")]
    InvalidStatusCode(u16),
}

/// Explicit invalidation of a single entry failed.
#[derive(Debug, Error)]
#[error("failed to invalidate cache entry {key}")]
pub struct InvalidateError {
    /// Key that could not be removed.
    pub key: CacheKey,
    /// Store failure.
    #[source]
    pub source: BackendError,
}

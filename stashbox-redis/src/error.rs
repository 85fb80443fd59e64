//! Error types for Redis backend operations.
//!
//! All errors convert to [`BackendError`]: network failures become
//! [`BackendError::ConnectionError`], everything else
//! [`BackendError::InternalError`].
//!
//! [`BackendError`]: stashbox_backend::BackendError
//! [`BackendError::ConnectionError`]: stashbox_backend::BackendError::ConnectionError
//! [`BackendError::InternalError`]: stashbox_backend::BackendError::InternalError

use redis::RedisError;
use stashbox_backend::BackendError;

/// Error type for Redis backend operations.
///
/// Returned directly by [`RedisBackendBuilder::build`] for an invalid
/// connection URL. Failures at request time (the server is unreachable, a
/// command fails) reach callers as [`BackendError`].
///
/// ```
/// use stashbox_redis::{Error, RedisBackend};
///
/// let result = RedisBackend::builder().server("not a url").build();
/// assert!(matches!(result, Err(Error::Redis(_))));
/// ```
///
/// [`RedisBackendBuilder::build`]: crate::RedisBackendBuilder::build
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the underlying Redis client.
    #[error("Redis backend error: {0}")]
    Redis(#[from] RedisError),
}

impl Error {
    fn is_connection(&self) -> bool {
        match self {
            Error::Redis(e) => e.is_io_error() || e.is_connection_refusal() || e.is_timeout(),
        }
    }
}

impl From<Error> for BackendError {
    fn from(error: Error) -> Self {
        if error.is_connection() {
            Self::ConnectionError(Box::new(error))
        } else {
            Self::InternalError(Box::new(error))
        }
    }
}

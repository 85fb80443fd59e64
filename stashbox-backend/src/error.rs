//! Error types for backend operations.

use std::time::Duration;

use crate::format::FormatError;
use thiserror::Error;

/// Error type for backend operations.
///
/// Handlers never surface these to callers: a failed read is treated as a
/// miss and a failed write as a no-op. They are still typed so that direct
/// users of a backend (and invalidation) can tell the groups apart.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send>),

    /// Network interaction error.
    ///
    /// Errors occurring during communication with remote backends (e.g., Redis).
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send>),

    /// Serialization or deserialization error.
    #[error(transparent)]
    FormatError(#[from] FormatError),

    /// The operation did not finish within its time bound.
    #[error("backend operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Status of deleting result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}

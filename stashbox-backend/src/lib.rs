#![warn(missing_docs)]
//! Storage contract for stashbox.
//!
//! A store only has to implement [`Backend`]: read, write with TTL and
//! remove raw bytes by key. [`CacheBackend`] layers the response codec from
//! [`format`] on top of it and is implemented for every backend.
//!
//! Store failures are typed as [`BackendError`] so that callers can log
//! them, but cache handlers treat every one of them as a miss or a no-op.
mod backend;
mod error;
pub mod format;
pub mod metrics;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use error::{BackendError, DeleteStatus};
pub use format::{BinaryFormat, Format, FormatError, FormatTypeId, JsonFormat};

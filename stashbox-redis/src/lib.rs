#![warn(missing_docs)]
//! Redis cache store for stashbox.
//!
//! Entries are plain string values written with `SET key value PX ttl`, so
//! Redis itself expires them. The connection is opened lazily on first use
//! and shared through a [`redis::aio::ConnectionManager`], which reconnects
//! on its own after failures.

pub mod backend;
pub mod error;

#[doc(inline)]
pub use crate::backend::{RedisBackend, RedisBackendBuilder};
#[doc(inline)]
pub use crate::error::Error;

#![warn(missing_docs)]
//! In-process cache store for stashbox backed by [moka].
//!
//! Every entry carries its own TTL, taken from the expiration policy of the
//! handler that wrote it.
//!
//! ```
//! use stashbox_moka::MokaBackend;
//!
//! let backend = MokaBackend::builder().max_entries(10_000).build();
//! ```

mod backend;
mod builder;
pub mod metrics;

pub use backend::MokaBackend;
pub use builder::{ByteCapacity, EntryCapacity, MokaBackendBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;

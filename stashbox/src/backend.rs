//! Storage contract re-exports.
//!
//! | Backend | Crate | Use case |
//! |---------|-------|----------|
//! | Moka | [`stashbox-moka`] | in-process, single instance |
//! | Redis | [`stashbox-redis`] | shared between instances |
//!
//! See [`stashbox-backend`] for implementing a custom store.
//!
//! [`stashbox-backend`]: https://docs.rs/stashbox-backend
//! [`stashbox-moka`]: https://docs.rs/stashbox-moka
//! [`stashbox-redis`]: https://docs.rs/stashbox-redis

pub use stashbox_backend::{
    Backend, BackendError, BackendResult, BinaryFormat, CacheBackend, DeleteStatus, Format,
    FormatError, JsonFormat,
};

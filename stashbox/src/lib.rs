#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! HTTP response caching handlers.
//!
//! Two strategies share one storage contract:
//!
//! * [`CacheAside`] serves stored responses and stores upstream responses
//!   with a TTL per status code ([`ExpirationTable`]).
//! * [`FallbackRace`] bounds latency: when upstream is slower than a
//!   deadline, or fails, the last stored response is served instead.
//!
//! Both are protocol agnostic. `stashbox-http` makes `http` requests and
//! responses cacheable, `stashbox-reqwest` and `stashbox-tower` plug the
//! handlers into client pipelines.

pub mod backend;

/// Handler settings that can be loaded from configuration files.
pub mod config;

/// Error types for handler construction and invalidation.
pub mod error;

/// Caching strategies.
pub mod handler;

/// Metrics collection.
///
/// With the `metrics` feature the handlers record hit, miss, bypass and
/// fallback counters plus write-behind task metrics through the `metrics`
/// facade.
pub mod metrics;

/// Background tasks that outlive a request.
pub mod offload;

/// Time-to-live per response status code.
pub mod policy;

pub mod stats;

pub use config::{CacheAsideConfig, FallbackConfig};
pub use error::{ConfigError, InvalidateError};
pub use handler::{CacheAside, FallbackRace, Handler, NotSet};
pub use offload::OffloadManager;
pub use policy::{DEFAULT_TTL, ExpirationTable};
pub use stats::{StatsRecorder, StatsSnapshot, StatsValue};

pub use stashbox_core::{
    BackendLabel, CacheKey, CachePolicy, CacheStatus, CacheablePolicyData, CacheableRequest,
    CacheableResponse, CachedResponse, HeaderList, HttpVersion, Raw, RequestCachePolicy,
    ResponseCachePolicy, Upstream,
};

/// The `stashbox` prelude.
///
/// ```rust
/// use stashbox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CacheableRequest, CacheableResponse, Handler, Upstream};
}

#![warn(missing_docs)]
//! # stashbox-reqwest
//!
//! Stashbox caching for [reqwest](https://docs.rs/reqwest) clients, built on
//! [reqwest-middleware](https://docs.rs/reqwest-middleware).
//!
//! - [`CacheMiddleware`] runs a cache-aside handler in front of the rest of
//!   the middleware chain
//! - [`FallbackMiddleware`] races an inner client against the stored
//!   response
//!
//! Neither middleware adds a status header unless asked to with
//! `with_status_header()`.

mod middleware;
mod upstream;

pub use middleware::{CacheMiddleware, FallbackMiddleware};
pub use upstream::{ClientUpstream, NextUpstream, buffered_body_to_reqwest};

pub use stashbox_http::{
    BufferedBody, CacheableHttpRequest, CacheableHttpResponse, DEFAULT_CACHE_STATUS_HEADER,
    RequestOrigin,
};

/// Re-export of the reqwest body type for type annotations.
pub use reqwest::Body as ReqwestBody;

#![warn(missing_docs)]
//! # stashbox-http
//!
//! Cacheable wrappers around `http` requests and responses.
//!
//! Client adapters wrap outgoing requests in [`CacheableHttpRequest`] and
//! upstream responses in [`CacheableHttpResponse`], which lets the stashbox
//! handlers key, store and rebuild them:
//!
//! - the key is the method followed by the absolute request URI
//! - the body is read in full before storing ([`BufferedBody`])
//! - headers are stored in two lists, see [`headers`]
//! - a rebuilt response carries a [`RequestOrigin`] extension

pub mod body;
mod cache_status;
pub mod headers;
mod request;
mod response;

pub use body::BufferedBody;
pub use cache_status::DEFAULT_CACHE_STATUS_HEADER;
pub use request::CacheableHttpRequest;
pub use response::{CacheableHttpResponse, RequestOrigin};

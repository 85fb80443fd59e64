#![warn(missing_docs)]
//! # stashbox-core
//!
//! Protocol-agnostic types shared by every stashbox crate.
//!
//! Handlers in `stashbox` only see requests and responses through the
//! traits defined here, which keeps them independent of the HTTP client
//! they are plugged into:
//!
//! - **Key** requests by method and URI ([`CacheKey`], [`CacheableRequest`])
//! - **Snapshot** responses for storage ([`CachedResponse`], [`CacheableResponse`])
//! - **Call** the inner transport ([`Upstream`])
//! - **Report** how a response was produced ([`CacheStatus`])

pub mod key;
pub mod label;
pub mod policy;
pub mod request;
pub mod response;
pub mod status;
pub mod upstream;
pub mod value;

pub use key::CacheKey;
pub use label::BackendLabel;
pub use policy::CachePolicy;
pub use request::{CACHEABLE_METHODS, CacheablePolicyData, CacheableRequest, RequestCachePolicy};
pub use response::{CacheableResponse, ResponseCachePolicy};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use status::CacheStatus;
pub use upstream::Upstream;
pub use value::{CachedResponse, HeaderList, HttpVersion};

/// Raw byte data type used for serialized cache values.
pub type Raw = bytes::Bytes;

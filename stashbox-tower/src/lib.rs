#![warn(missing_docs)]
//! # stashbox-tower
//!
//! Stashbox caching for [tower](https://docs.rs/tower) HTTP services, such
//! as a hyper-util client.
//!
//! ```
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use stashbox::FallbackRace;
//! use stashbox_moka::MokaBackend;
//! use stashbox_tower::{BufferedBody, Cache};
//! use tower::{ServiceBuilder, service_fn};
//!
//! let handler = FallbackRace::builder()
//!     .backend(MokaBackend::builder().max_entries(1_000).build())
//!     .max_timeout(Duration::from_millis(300))
//!     .build()
//!     .unwrap();
//!
//! let service = ServiceBuilder::new()
//!     .layer(Cache::new(handler).with_status_header())
//!     .service(service_fn(|_req: Request<BufferedBody<Full<Bytes>>>| async {
//!         Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"rates"))))
//!     }));
//! # drop(service);
//! ```

/// Tower layer.
pub mod layer;
/// Tower service running the handler.
pub mod service;
/// Upstream adapter for tower services.
pub mod upstream;

pub use layer::Cache;
pub use service::{CacheService, CacheServiceFuture};
pub use stashbox_http::{BufferedBody, DEFAULT_CACHE_STATUS_HEADER};
pub use upstream::TowerUpstream;

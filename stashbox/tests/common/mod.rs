//! Test doubles shared by the handler tests.
#![allow(dead_code)]

mod backend;
mod upstream;

pub use backend::{ErrorBackend, SlowBackend, TestBackend};
pub use upstream::{MockRequest, MockResponse, MockUpstream, UpstreamError};

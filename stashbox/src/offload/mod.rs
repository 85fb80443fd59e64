//! Detached background work.
//!
//! When a fallback answer has been served, the live call that lost the race
//! keeps running here and writes its result behind the caller's back. The
//! [`OffloadManager`] tracks those tasks so that an application (or a test)
//! can wait for them before shutting down.
//!
//! ```
//! use std::time::Duration;
//! use stashbox::offload::{OffloadConfig, OffloadManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = OffloadManager::new(
//!     OffloadConfig::builder()
//!         .max_concurrent_tasks(128)
//!         .timeout(Duration::from_secs(30))
//!         .build(),
//! );
//!
//! manager.spawn("write_behind", async {
//!     // store the late origin response
//! });
//! manager.wait_all().await;
//! assert_eq!(manager.active_task_count(), 0);
//! # }
//! ```

mod manager;
mod policy;

pub use manager::{OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder, TimeoutPolicy};

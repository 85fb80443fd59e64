//! Offload task policies and configuration.

use std::time::Duration;

/// What happens to a background task that runs for too long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Task runs until completion.
    #[default]
    None,
    /// Task is dropped after the duration.
    Cancel(Duration),
    /// A warning is logged when the task finishes later than the duration.
    Warn(Duration),
}

/// Configuration for the [`OffloadManager`](super::OffloadManager).
#[derive(Debug, Clone, Default)]
pub struct OffloadConfig {
    /// Upper bound on tasks in flight. When reached, new tasks are skipped.
    /// `None` means unlimited.
    pub max_concurrent_tasks: Option<usize>,
    /// Timeout policy applied to every task.
    pub timeout_policy: TimeoutPolicy,
}

impl OffloadConfig {
    /// Create a new builder for OffloadConfig.
    pub fn builder() -> OffloadConfigBuilder {
        OffloadConfigBuilder::default()
    }
}

/// Builder for [`OffloadConfig`].
#[derive(Debug, Clone, Default)]
pub struct OffloadConfigBuilder {
    config: OffloadConfig,
}

impl OffloadConfigBuilder {
    /// Set maximum concurrent tasks.
    pub fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.config.max_concurrent_tasks = Some(max);
        self
    }

    /// Set timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.config.timeout_policy = policy;
        self
    }

    /// Shorthand for [`TimeoutPolicy::Cancel`].
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }

    /// Build the OffloadConfig.
    pub fn build(self) -> OffloadConfig {
        self.config
    }
}

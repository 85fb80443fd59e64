//! OffloadManager implementation for background task execution.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};
use crate::metrics;

/// Identifies one spawned task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey {
    kind: SmolStr,
    id: u64,
}

impl OffloadKey {
    /// Kind given at spawn time, used for metrics labels and spans.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Sequence number, unique per manager.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for OffloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<OffloadKey, JoinHandle<()>>,
    key_counter: AtomicU64,
}

/// Runs detached tasks on the tokio runtime and keeps track of them.
///
/// Clones share the same set of tasks.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Create a new OffloadManager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                key_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Unlimited tasks without timeout.
    pub fn with_defaults() -> Self {
        Self::new(OffloadConfig::default())
    }

    fn next_key(&self, kind: SmolStr) -> OffloadKey {
        let id = self.inner.key_counter.fetch_add(1, Ordering::Relaxed);
        OffloadKey { kind, id }
    }

    /// Spawns `task` in the background.
    ///
    /// Returns `None` without running the task when
    /// [`max_concurrent_tasks`](OffloadConfig::max_concurrent_tasks) are
    /// already in flight. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> Option<OffloadKey>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let kind = kind.into();
        if let Some(max) = self.inner.config.max_concurrent_tasks
            && self.inner.tasks.len() >= max
        {
            warn!(%kind, max, "Offload task skipped, too many tasks in flight");
            metrics::record_offload_skipped(&kind);
            return None;
        }

        let key = self.next_key(kind);
        metrics::record_offload_spawned(key.kind());
        let handle = self.spawn_inner(key.clone(), task);
        self.inner.tasks.insert(key.clone(), handle);
        // The task may have completed before its handle was tracked.
        self.inner.tasks.remove_if(&key, |_, handle| handle.is_finished());
        Some(key)
    }

    /// Number of tasks still running.
    pub fn active_task_count(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|entry| !entry.is_finished())
            .count()
    }

    /// Whether the task behind `key` is still running.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.inner
            .tasks
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Aborts every running task.
    pub fn cancel_all(&self) {
        for entry in self.inner.tasks.iter() {
            entry.abort();
        }
    }

    /// Waits until every tracked task, including ones spawned while waiting,
    /// has finished.
    pub async fn wait_all(&self) {
        loop {
            let keys: Vec<OffloadKey> = self
                .inner
                .tasks
                .iter()
                .map(|entry| entry.key().clone())
                .collect();
            if keys.is_empty() {
                break;
            }
            for key in keys {
                if let Some((_, handle)) = self.inner.tasks.remove(&key)
                    && let Err(err) = handle.await
                    && err.is_panic()
                {
                    warn!(%key, "Offload task panicked");
                }
            }
        }
    }

    /// [`wait_all`](Self::wait_all) bounded by `timeout`.
    ///
    /// Returns `false` if tasks were still running when the timeout elapsed.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(&self, key: OffloadKey, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let timeout_policy = self.inner.config.timeout_policy;
        let inner = self.inner.clone();
        let span = info_span!("offload_task", kind = %key.kind, id = key.id);

        tokio::spawn(
            async move {
                let start = Instant::now();
                let timed_out = match timeout_policy {
                    TimeoutPolicy::None => {
                        task.await;
                        false
                    }
                    TimeoutPolicy::Cancel(duration) => {
                        if tokio::time::timeout(duration, task).await.is_err() {
                            warn!(timeout = ?duration, "Offload task cancelled due to timeout");
                            true
                        } else {
                            false
                        }
                    }
                    TimeoutPolicy::Warn(duration) => {
                        task.await;
                        let elapsed = start.elapsed();
                        if elapsed > duration {
                            warn!(
                                elapsed_ms = elapsed.as_millis(),
                                threshold_ms = duration.as_millis(),
                                "Offload task exceeded timeout threshold"
                            );
                        }
                        false
                    }
                };
                debug!("Offload task finished");
                metrics::record_offload_finished(&key.kind, start.elapsed(), timed_out);
                inner.tasks.remove(&key);
            }
            .instrument(span),
        )
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test]
    async fn wait_all_awaits_spawned_tasks() {
        let manager = OffloadManager::default();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let done = done.clone();
            manager.spawn("test", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_policy_drops_slow_tasks() {
        let manager = OffloadManager::new(
            OffloadConfig::builder()
                .timeout(Duration::from_millis(10))
                .build(),
        );
        let done = Arc::new(AtomicUsize::new(0));
        let flag = done.clone();
        manager.spawn("slow", async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flag.fetch_add(1, Ordering::SeqCst);
        });
        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn limit_skips_extra_tasks() {
        let manager = OffloadManager::new(OffloadConfig::builder().max_concurrent_tasks(1).build());
        let first = manager.spawn("slow", tokio::time::sleep(Duration::from_secs(1)));
        let second = manager.spawn("slow", async {});
        assert!(first.is_some());
        assert!(second.is_none());
        assert!(manager.is_in_flight(first.as_ref().unwrap()));

        manager.wait_all().await;
        assert!(!manager.is_in_flight(first.as_ref().unwrap()));
        assert!(manager.spawn("slow", async {}).is_some());
        manager.wait_all().await;
    }

    #[test]
    fn keys_are_sequential_per_kind_label() {
        let manager = OffloadManager::default();
        let a = manager.next_key("write_behind".into());
        let b = manager.next_key("write_behind".into());
        assert_eq!(a.kind(), "write_behind");
        assert_eq!(b.id(), a.id() + 1);
        assert_eq!(a.to_string(), "write_behind#0");
    }
}

//! Metrics declaration and initialization.
//!
//! Every `record_*` function is a no-op unless the `metrics` feature is on.

use std::time::Duration;

use stashbox_core::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache status metrics

    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stashbox_cache_hit_total",
            "Total number of responses served from the cache."
        );
        "stashbox_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stashbox_cache_miss_total",
            "Total number of responses fetched from upstream for cacheable requests."
        );
        "stashbox_cache_miss_total"
    };
    /// Track number of requests that never touched the cache.
    pub static ref CACHE_BYPASS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stashbox_cache_bypass_total",
            "Total number of non-cacheable requests passed straight to upstream."
        );
        "stashbox_cache_bypass_total"
    };
    /// Track number of stale answers served because upstream was too slow.
    pub static ref FALLBACK_SERVED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stashbox_fallback_served_total",
            "Total number of cached answers served after the upstream deadline passed."
        );
        "stashbox_fallback_served_total"
    };

    // Offload manager metrics

    /// Track number of offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "stashbox_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "stashbox_offload_tasks_spawned_total"
    };
    /// Track number of offload tasks completed.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "stashbox_offload_tasks_completed_total",
            "Total number of offload tasks completed."
        );
        "stashbox_offload_tasks_completed_total"
    };
    /// Track number of offload tasks that timed out.
    pub static ref OFFLOAD_TASKS_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "stashbox_offload_tasks_timeout_total",
            "Total number of offload tasks cancelled by their timeout."
        );
        "stashbox_offload_tasks_timeout_total"
    };
    /// Track number of offload tasks skipped because of the concurrency limit.
    pub static ref OFFLOAD_TASKS_SKIPPED: &'static str = {
        metrics::describe_counter!(
            "stashbox_offload_tasks_skipped_total",
            "Total number of offload tasks not started because too many were in flight."
        );
        "stashbox_offload_tasks_skipped_total"
    };
    /// Gauge of currently active offload tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "stashbox_offload_tasks_active",
            "Number of currently active offload tasks."
        );
        "stashbox_offload_tasks_active"
    };
    /// Histogram of offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "stashbox_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "stashbox_offload_task_duration_seconds"
    };
}

/// Record the outcome of one handled request.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_status(handler: &'static str, status: CacheStatus) {
    let counter = match status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Bypass => *CACHE_BYPASS_COUNTER,
    };
    metrics::counter!(counter, "handler" => handler).increment(1);
}

/// Record a cached answer served after the upstream deadline.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fallback_served(backend: &str) {
    metrics::counter!(*FALLBACK_SERVED_COUNTER, "backend" => backend.to_string()).increment(1);
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_offload_spawned(kind: &str) {
    metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => kind.to_string()).increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_string()).increment(1.0);
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_offload_skipped(kind: &str) {
    metrics::counter!(*OFFLOAD_TASKS_SKIPPED, "kind" => kind.to_string()).increment(1);
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_offload_finished(kind: &str, duration: Duration, timed_out: bool) {
    let counter = if timed_out {
        *OFFLOAD_TASKS_TIMEOUT
    } else {
        *OFFLOAD_TASKS_COMPLETED
    };
    metrics::counter!(counter, "kind" => kind.to_string()).increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_string()).decrement(1.0);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_string())
        .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_status(_handler: &'static str, _status: CacheStatus) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fallback_served(_backend: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_offload_spawned(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_offload_skipped(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_offload_finished(_kind: &str, _duration: Duration, _timed_out: bool) {}

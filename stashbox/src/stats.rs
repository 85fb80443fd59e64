//! Hit/miss statistics per response status code.
//!
//! A [`StatsRecorder`] is shared by every request flowing through one
//! handler. Counters are created on first use of a status code and only
//! reset by creating a new recorder.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use smol_str::SmolStr;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Thread-safe hit/miss recorder.
#[derive(Debug)]
pub struct StatsRecorder {
    cache_type: SmolStr,
    created_at: DateTime<Utc>,
    buckets: DashMap<u16, Counters>,
}

impl StatsRecorder {
    /// Creates an empty recorder. `cache_type` names the caching strategy in
    /// snapshots (for example `"cache_aside"`).
    pub fn new(cache_type: impl Into<SmolStr>) -> Self {
        StatsRecorder {
            cache_type: cache_type.into(),
            created_at: Utc::now(),
            buckets: DashMap::new(),
        }
    }

    /// Records a response served from the cache.
    pub fn report_hit(&self, status: u16) {
        self.with_bucket(status, |c| c.hits.fetch_add(1, Ordering::Relaxed));
    }

    /// Records a response fetched from upstream.
    pub fn report_miss(&self, status: u16) {
        self.with_bucket(status, |c| c.misses.fetch_add(1, Ordering::Relaxed));
    }

    fn with_bucket(&self, status: u16, f: impl FnOnce(&Counters) -> u64) {
        if let Some(counters) = self.buckets.get(&status) {
            f(&counters);
            return;
        }
        // The entry guard holds the shard write lock, so a bucket created by
        // a concurrent caller is reused instead of replaced.
        f(&self.buckets.entry(status).or_default());
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let per_status_code: BTreeMap<u16, StatsValue> = self
            .buckets
            .iter()
            .map(|entry| {
                (
                    *entry.key(),
                    StatsValue {
                        hits: entry.hits.load(Ordering::Relaxed),
                        misses: entry.misses.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();
        let total = per_status_code
            .values()
            .fold(StatsValue::default(), |acc, v| StatsValue {
                hits: acc.hits + v.hits,
                misses: acc.misses + v.misses,
            });

        StatsSnapshot {
            cache_type: self.cache_type.clone(),
            created_at: self.created_at,
            per_status_code,
            total,
        }
    }
}

/// Hit and miss counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsValue {
    /// Responses served from the cache.
    pub hits: u64,
    /// Responses fetched from upstream.
    pub misses: u64,
}

impl StatsValue {
    /// `hits + misses`.
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of hits, `0.0` when nothing was recorded.
    pub fn hit_ratio(&self) -> f64 {
        ratio(self.hits, self.total())
    }

    /// Share of misses, `0.0` when nothing was recorded.
    pub fn miss_ratio(&self) -> f64 {
        ratio(self.misses, self.total())
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Immutable copy of a recorder's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Caching strategy the recorder belongs to.
    pub cache_type: SmolStr,
    /// When the recorder was created.
    pub created_at: DateTime<Utc>,
    /// Counters per status code.
    pub per_status_code: BTreeMap<u16, StatsValue>,
    /// Sum over all status codes.
    pub total: StatsValue,
}

impl StatsSnapshot {
    /// Sum over all status codes.
    pub fn total(&self) -> StatsValue {
        self.total
    }

    /// Counters for one status code, zero if never seen.
    pub fn status(&self, status: u16) -> StatsValue {
        self.per_status_code
            .get(&status)
            .copied()
            .unwrap_or_default()
    }
}

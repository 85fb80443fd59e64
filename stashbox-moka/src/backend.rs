//! Moka backend implementation.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use stashbox_backend::format::{BinaryFormat, Format};
use stashbox_backend::{Backend, BackendResult, DeleteStatus};
use stashbox_core::{BackendLabel, CacheKey, Raw};

use crate::builder::{MokaBackendBuilder, NoCapacity};
use crate::metrics;

/// Stored value: encoded response plus the TTL it was written with.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) data: Raw,
    pub(crate) ttl: Duration,
}

impl Entry {
    pub(crate) fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.data.len()
    }
}

/// In-memory cache backend powered by Moka.
///
/// Entries expire after the TTL passed to [`Backend::write`]; rewriting an
/// entry restarts its clock with the new TTL.
///
/// # Type Parameters
///
/// * `S` - Response codec. Default: [`BinaryFormat`].
///
/// # Caveats
///
/// - Data is **not persisted** and is lost on process restart
/// - Data is **not shared** across processes; use Redis for a shared store
/// - Expired entries are never returned, but are reclaimed lazily
#[derive(Clone)]
pub struct MokaBackend<S = BinaryFormat>
where
    S: Format,
{
    pub(crate) cache: Cache<CacheKey, Entry>,
    pub(crate) serializer: S,
    pub(crate) label: BackendLabel,
}

impl<S> std::fmt::Debug for MokaBackend<S>
where
    S: Format,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("label", &self.label)
            .field("entries", &self.cache.entry_count())
            .field("serializer", &self.serializer)
            .finish()
    }
}

impl MokaBackend<BinaryFormat> {
    /// Creates a new builder. Capacity must be set before `build()`.
    pub fn builder() -> MokaBackendBuilder<NoCapacity, BinaryFormat> {
        MokaBackendBuilder::new()
    }
}

impl<S> MokaBackend<S>
where
    S: Format,
{
    /// Flushes moka's pending maintenance (evictions, counters).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn record_occupancy(&self) {
        metrics::record_occupancy(
            self.label.as_str(),
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
    }
}

#[async_trait]
impl<S> Backend for MokaBackend<S>
where
    S: Format,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Ok(self.cache.get(key).await.map(|entry| entry.data))
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        self.cache
            .insert(key.clone(), Entry { data: value, ttl })
            .await;
        self.record_occupancy();
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let removed = self.cache.remove(key).await;
        self.record_occupancy();
        match removed {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn label(&self) -> BackendLabel {
        self.label.clone()
    }

    fn value_format(&self) -> &dyn Format {
        &self.serializer
    }
}

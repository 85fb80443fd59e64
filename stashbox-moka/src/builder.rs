//! Builder for configuring [`MokaBackend`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::{Cache, CacheBuilder};
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use stashbox_backend::format::{BinaryFormat, Format};
use stashbox_core::{BackendLabel, CacheKey};
use tracing::debug;

use crate::backend::{Entry, MokaBackend};
use crate::metrics;

/// Expires every entry after the TTL it was written with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, Entry> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // The default keeps the old deadline; a rewrite must use the new TTL.
        Some(value.ttl)
    }
}

/// Marker type: capacity has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: the store holds at most `n` entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: the store holds at most `n` bytes (approximate).
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for creating and configuring a [`MokaBackend`].
///
/// Capacity is mandatory and set exactly once, through
/// [`max_entries`](Self::max_entries) or [`max_bytes`](Self::max_bytes);
/// `build()` only exists afterwards.
///
/// ```
/// use stashbox_moka::MokaBackend;
/// use stashbox_backend::JsonFormat;
///
/// let backend = MokaBackend::builder()
///     .label("responses")
///     .max_bytes(64 * 1024 * 1024)
///     .value_format(JsonFormat)
///     .build();
/// ```
pub struct MokaBackendBuilder<Cap, S = BinaryFormat>
where
    S: Format,
{
    capacity: Cap,
    serializer: S,
    label: BackendLabel,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaBackendBuilder<NoCapacity, BinaryFormat> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            serializer: BinaryFormat,
            label: BackendLabel::new_static("moka"),
            eviction_policy: None,
        }
    }
}

impl Default for MokaBackendBuilder<NoCapacity, BinaryFormat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MokaBackendBuilder<NoCapacity, S>
where
    S: Format,
{
    /// Limits the store by entry count.
    pub fn max_entries(self, capacity: u64) -> MokaBackendBuilder<EntryCapacity, S> {
        MokaBackendBuilder {
            capacity: EntryCapacity(capacity),
            serializer: self.serializer,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Limits the store by approximate memory usage.
    ///
    /// An entry weighs its key plus its encoded response.
    pub fn max_bytes(self, bytes: u64) -> MokaBackendBuilder<ByteCapacity, S> {
        MokaBackendBuilder {
            capacity: ByteCapacity(bytes),
            serializer: self.serializer,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<Cap, S> MokaBackendBuilder<Cap, S>
where
    S: Format,
{
    /// Sets the label used in logs and metrics. Default: `"moka"`.
    pub fn label(mut self, label: impl Into<BackendLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the eviction policy.
    ///
    /// Defaults to TinyLFU for entry capacity and LRU for byte capacity.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Sets the response codec. Default: [`BinaryFormat`].
    pub fn value_format<NewS>(self, serializer: NewS) -> MokaBackendBuilder<Cap, NewS>
    where
        NewS: Format,
    {
        MokaBackendBuilder {
            capacity: self.capacity,
            serializer,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<S> MokaBackendBuilder<EntryCapacity, S>
where
    S: Format,
{
    /// Builds the [`MokaBackend`] with entry-count based capacity.
    pub fn build(self) -> MokaBackend<S> {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<CacheKey, Entry> = CacheBuilder::new(self.capacity.0)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .eviction_listener(removal_listener(self.label.clone()))
            .build();

        MokaBackend {
            cache,
            serializer: self.serializer,
            label: self.label,
        }
    }
}

impl<S> MokaBackendBuilder<ByteCapacity, S>
where
    S: Format,
{
    /// Builds the [`MokaBackend`] with byte-based capacity.
    ///
    /// TinyLFU may refuse to admit heavy entries, so LRU is the default here.
    pub fn build(self) -> MokaBackend<S> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<CacheKey, Entry> = CacheBuilder::new(self.capacity.0)
            .weigher(byte_weigher)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .eviction_listener(removal_listener(self.label.clone()))
            .build();

        MokaBackend {
            cache,
            serializer: self.serializer,
            label: self.label,
        }
    }
}

fn removal_listener(
    label: BackendLabel,
) -> impl Fn(Arc<CacheKey>, Entry, RemovalCause) + Send + Sync + 'static {
    move |key, entry, cause| {
        if cause.was_evicted() {
            debug!(
                backend = %label,
                key = %key,
                cause = metrics::cause_label(cause),
                bytes = entry.data.len(),
                "Entry evicted"
            );
        }
        metrics::record_removal(label.as_str(), cause);
    }
}

fn byte_weigher(key: &CacheKey, value: &Entry) -> u32 {
    (key.memory_size() + value.memory_size()).min(u32::MAX as usize) as u32
}

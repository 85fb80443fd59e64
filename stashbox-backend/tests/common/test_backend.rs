//! Simple in-memory test backend implementation using DashMap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use stashbox_backend::format::{BinaryFormat, Format, JsonFormat};
use stashbox_backend::{Backend, BackendResult, DeleteStatus};
use stashbox_core::{BackendLabel, CacheKey, Raw};

/// In-memory backend that remembers the TTL of every write.
#[derive(Clone, Default)]
pub struct TestBackend {
    store: Arc<DashMap<CacheKey, (Raw, Duration)>>,
    json: bool,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same store, JSON codec.
    pub fn json() -> Self {
        Self {
            json: true,
            ..Self::default()
        }
    }

    pub fn put_raw(&self, key: &CacheKey, raw: impl Into<Raw>) {
        self.store
            .insert(key.clone(), (raw.into(), Duration::from_secs(60)));
    }

    pub fn ttl_of(&self, key: &CacheKey) -> Option<Duration> {
        self.store.get(key).map(|entry| entry.1)
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Ok(self.store.get(key).map(|entry| entry.0.clone()))
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        self.store.insert(key.clone(), (value, ttl));
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(match self.store.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    fn label(&self) -> BackendLabel {
        BackendLabel::new_static("test")
    }

    fn value_format(&self) -> &dyn Format {
        if self.json {
            &JsonFormat
        } else {
            &BinaryFormat
        }
    }
}

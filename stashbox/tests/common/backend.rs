use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use stashbox::backend::{Backend, BackendError, BackendResult, CacheBackend, DeleteStatus};
use stashbox::{BackendLabel, CacheKey, CachedResponse, Raw};

/// In-memory backend that counts writes and remembers TTLs.
#[derive(Clone, Default)]
pub struct TestBackend {
    store: Arc<DashMap<CacheKey, (Raw, Duration)>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads work, every write fails.
    pub fn read_only() -> Self {
        let backend = Self::default();
        backend.fail_writes.store(true, Ordering::SeqCst);
        backend
    }

    /// Stores `cached` without counting the write.
    pub async fn put(&self, key: &CacheKey, cached: &CachedResponse) {
        let fail = self.fail_writes.swap(false, Ordering::SeqCst);
        self.set(key, cached, Duration::from_secs(60)).await.unwrap();
        self.fail_writes.store(fail, Ordering::SeqCst);
        self.writes.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn put_raw(&self, key: &CacheKey, raw: impl Into<Raw>) {
        self.store
            .insert(key.clone(), (raw.into(), Duration::from_secs(60)));
    }

    pub async fn cached(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.get(key).await.unwrap()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    pub fn ttl_of(&self, key: &CacheKey) -> Option<Duration> {
        self.store.get(key).map(|entry| entry.1)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Ok(self.store.get(key).map(|entry| entry.0.clone()))
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::InternalError(Box::new(io::Error::other("write refused"))));
        }
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
}

/// Backend failing every operation.
#[derive(Clone, Copy, Default)]
pub struct ErrorBackend;

fn unreachable_store() -> BackendError {
    BackendError::ConnectionError(Box::new(io::Error::from(
        io::ErrorKind::ConnectionRefused,
    )))
}

#[async_trait]
impl Backend for ErrorBackend {
    async fn read(&self, _key: &CacheKey) -> BackendResult<Option<Raw>> {
        Err(unreachable_store())
    }

    async fn write(&self, _key: &CacheKey, _value: Raw, _ttl: Duration) -> BackendResult<()> {
        Err(unreachable_store())
    }

    async fn remove(&self, _key: &CacheKey) -> BackendResult<DeleteStatus> {
        Err(unreachable_store())
    }
}

/// [`TestBackend`] with every read delayed.
#[derive(Clone)]
pub struct SlowBackend {
    pub inner: TestBackend,
    pub delay: Duration,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Self {
        SlowBackend {
            inner: TestBackend::new(),
            delay,
        }
    }
}

#[async_trait]
impl Backend for SlowBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        tokio::time::sleep(self.delay).await;
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        self.inner.write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        self.inner.remove(key).await
    }
}

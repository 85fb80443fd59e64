use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use stashbox_core::{BackendLabel, CacheKey, CachedResponse, Raw};
use tracing::debug;

use crate::{
    BackendError, DeleteStatus,
    format::{BinaryFormat, Format},
    metrics::{self, CodecOp, Outcome, Stopwatch, StoreOp},
};

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Raw key/value store with per-entry TTL.
///
/// Implementations only move bytes around. Encoding responses is the job
/// of [`CacheBackend`], which every `Backend` gets for free.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Read the bytes stored under `key`, `None` when absent or expired.
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>>;

    /// Store `value` under `key` for `ttl`.
    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()>;

    /// Remove the entry stored under `key`.
    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Label used in logs and metrics.
    fn label(&self) -> BackendLabel {
        BackendLabel::new_static("backend")
    }

    /// Codec used by [`CacheBackend`] for this store.
    fn value_format(&self) -> &dyn Format {
        &BinaryFormat
    }
}

#[async_trait]
impl<B> Backend for &B
where
    B: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn label(&self) -> BackendLabel {
        (**self).label()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl<B> Backend for Box<B>
where
    B: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn label(&self) -> BackendLabel {
        (**self).label()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl<B> Backend for Arc<B>
where
    B: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn label(&self) -> BackendLabel {
        (**self).label()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

/// High-level cache backend trait with typed operations.
///
/// `get`, `set` and `delete` run the backend's [`Format`] around the raw
/// operations and record backend metrics. Bytes that fail to decode come
/// back as [`BackendError::FormatError`].
pub trait CacheBackend: Backend {
    /// Read and decode the response stored under `key`.
    fn get(
        &self,
        key: &CacheKey,
    ) -> impl Future<Output = BackendResult<Option<CachedResponse>>> + Send {
        async move {
            let label = self.label();
            let backend = label.as_str();
            let watch = Stopwatch::start();
            let read_result = self.read(key).await;
            let elapsed = watch.stop();

            let raw = match read_result {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    metrics::record_store_op(backend, StoreOp::Read, Outcome::Absent, elapsed);
                    return Ok(None);
                }
                Err(e) => {
                    metrics::record_store_op(backend, StoreOp::Read, Outcome::Failed, elapsed);
                    return Err(e);
                }
            };
            metrics::record_store_op(backend, StoreOp::Read, Outcome::Done, elapsed);
            metrics::record_bytes(backend, StoreOp::Read, raw.len());

            let format = self.value_format();
            let watch = Stopwatch::start();
            let decoded = format.decode(&raw);
            metrics::record_codec(format.format_type_id(), CodecOp::Decode, watch.stop());

            decoded.map(Some).map_err(|error| {
                metrics::record_rejection(backend, format.format_type_id(), &error);
                debug!(
                    backend = %label,
                    key = %key,
                    format = metrics::format_label(format.format_type_id()),
                    reason = metrics::rejection_reason(&error),
                    bytes = raw.len(),
                    "Stored entry could not be decoded: {error}"
                );
                BackendError::from(error)
            })
        }
    }

    /// Encode `value` and store it under `key` for `ttl`.
    fn set(
        &self,
        key: &CacheKey,
        value: &CachedResponse,
        ttl: Duration,
    ) -> impl Future<Output = BackendResult<()>> + Send {
        async move {
            let label = self.label();
            let backend = label.as_str();
            let format = self.value_format();
            let watch = Stopwatch::start();
            let encoded = format.encode(value);
            metrics::record_codec(format.format_type_id(), CodecOp::Encode, watch.stop());
            let raw = encoded.inspect_err(|error| {
                metrics::record_rejection(backend, format.format_type_id(), error);
            })?;

            let bytes = raw.len();
            let watch = Stopwatch::start();
            let result = self.write(key, raw, ttl).await;
            let elapsed = watch.stop();
            match &result {
                Ok(()) => {
                    metrics::record_store_op(backend, StoreOp::Write, Outcome::Done, elapsed);
                    metrics::record_bytes(backend, StoreOp::Write, bytes);
                }
                Err(_) => metrics::record_store_op(backend, StoreOp::Write, Outcome::Failed, elapsed),
            }
            result
        }
    }

    /// Remove the entry stored under `key`.
    fn delete(&self, key: &CacheKey) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move {
            let watch = Stopwatch::start();
            let result = self.remove(key).await;
            let outcome = match &result {
                Ok(DeleteStatus::Deleted(_)) => Outcome::Done,
                Ok(DeleteStatus::Missing) => Outcome::Absent,
                Err(_) => Outcome::Failed,
            };
            metrics::record_store_op(self.label().as_str(), StoreOp::Remove, outcome, watch.stop());
            result
        }
    }
}

impl<B> CacheBackend for B where B: Backend + ?Sized {}

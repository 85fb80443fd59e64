//! Redis backend implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{Client, aio::ConnectionManager};
use stashbox_backend::{
    Backend, BackendError, BackendResult, DeleteStatus,
    format::{BinaryFormat, Format},
};
use stashbox_core::{BackendLabel, CacheKey, Raw};
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Error;

/// Redis cache backend based on redis-rs crate.
///
/// [`ConnectionManager`]: redis::aio::ConnectionManager
#[derive(Clone)]
pub struct RedisBackend<S = BinaryFormat>
where
    S: Format,
{
    client: Client,
    connection: OnceCell<ConnectionManager>,
    serializer: S,
    label: BackendLabel,
}

impl RedisBackend<BinaryFormat> {
    /// Backend for `redis://127.0.0.1/` with default settings.
    pub fn new() -> Result<Self, BackendError> {
        Ok(Self::builder().build()?)
    }

    /// Creates new RedisBackend builder with default settings.
    #[must_use]
    pub fn builder() -> RedisBackendBuilder<BinaryFormat> {
        RedisBackendBuilder::default()
    }
}

impl<S> RedisBackend<S>
where
    S: Format,
{
    /// Create lazy connection to redis via [`ConnectionManager`]
    pub async fn connection(&self) -> Result<&ConnectionManager, BackendError> {
        trace!("Get connection manager");
        let manager = self
            .connection
            .get_or_try_init(|| {
                trace!("Initialize new redis connection manager");
                self.client.get_connection_manager()
            })
            .await
            .map_err(Error::from)?;
        Ok(manager)
    }
}

/// Part of builder pattern implementation for RedisBackend.
pub struct RedisBackendBuilder<S = BinaryFormat>
where
    S: Format,
{
    connection_info: String,
    serializer: S,
    label: BackendLabel,
}

impl Default for RedisBackendBuilder<BinaryFormat> {
    fn default() -> Self {
        Self {
            connection_info: "redis://127.0.0.1/".to_owned(),
            serializer: BinaryFormat,
            label: BackendLabel::new_static("redis"),
        }
    }
}

impl<S> RedisBackendBuilder<S>
where
    S: Format,
{
    /// Set connection info (host, port, database, etc.) for RedisBackend.
    pub fn server(mut self, connection_info: impl Into<String>) -> Self {
        self.connection_info = connection_info.into();
        self
    }

    /// Set the response codec.
    pub fn value_format<NewS>(self, serializer: NewS) -> RedisBackendBuilder<NewS>
    where
        NewS: Format,
    {
        RedisBackendBuilder {
            connection_info: self.connection_info,
            serializer,
            label: self.label,
        }
    }

    /// Set the label used in logs and metrics. Default: `"redis"`.
    pub fn label(mut self, label: impl Into<BackendLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Create new instance of Redis backend with passed settings.
    ///
    /// Only the URL is validated here; no connection is made until the
    /// first operation.
    pub fn build(self) -> Result<RedisBackend<S>, Error> {
        Ok(RedisBackend {
            client: Client::open(self.connection_info)?,
            connection: OnceCell::new(),
            serializer: self.serializer,
            label: self.label,
        })
    }
}

/// Largest `PX` sent to the server.
///
/// Redis keeps deadlines as signed milliseconds since the epoch and rejects a
/// `PX` that would overflow once added to its clock.
const MAX_PX: u64 = (i64::MAX / 2) as u64;

/// TTL in whole milliseconds, never below one and never above [`MAX_PX`].
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(MAX_PX)
        .clamp(1, MAX_PX)
}

#[async_trait]
impl<S> Backend for RedisBackend<S>
where
    S: Format,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        let mut con = self.connection().await?.clone();

        let data: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key.as_str())
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;

        Ok(data.map(Bytes::from))
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        let mut con = self.connection().await?.clone();

        redis::cmd("SET")
            .arg(key.as_str())
            .arg(value.as_ref())
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let mut con = self.connection().await?.clone();

        let deleted: i32 = redis::cmd("DEL")
            .arg(key.as_str())
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            Ok(DeleteStatus::Deleted(deleted as u32))
        } else {
            Ok(DeleteStatus::Missing)
        }
    }

    fn label(&self) -> BackendLabel {
        self.label.clone()
    }

    fn value_format(&self) -> &dyn Format {
        &self.serializer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_rounded_up_to_one_millisecond() {
        assert_eq!(ttl_millis(Duration::from_nanos(5)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_millis(1500)), 1500);
    }

    #[test]
    fn huge_ttl_stays_within_a_signed_deadline() {
        assert_eq!(ttl_millis(Duration::MAX), MAX_PX);
        assert_eq!(ttl_millis(Duration::from_millis(u64::MAX)), MAX_PX);
        assert!(i64::try_from(ttl_millis(Duration::MAX)).is_ok());
        let year = Duration::from_secs(365 * 24 * 3600);
        assert_eq!(ttl_millis(year), 31_536_000_000);
    }

    #[test]
    fn builder_validates_url_without_connecting() {
        let backend = RedisBackend::builder()
            .server("redis://127.0.0.1:1/")
            .label("sessions")
            .build()
            .unwrap();
        assert_eq!(backend.label().as_str(), "sessions");

        assert!(matches!(
            RedisBackend::builder().server("not a url").build(),
            Err(Error::Redis(_))
        ));
    }
}

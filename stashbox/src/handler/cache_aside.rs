use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use smol_str::SmolStr;
use stashbox_backend::{Backend, CacheBackend};
use stashbox_core::{
    CacheKey, CachePolicy, CacheStatus, CacheablePolicyData, CacheableRequest, CacheableResponse,
    CachedResponse, Upstream,
};
use tracing::{debug, warn};

use super::{Handler, NotSet};
use crate::config::CacheAsideConfig;
use crate::error::{ConfigError, InvalidateError};
use crate::metrics;
use crate::policy::ExpirationTable;
use crate::stats::StatsRecorder;

const HANDLER: &str = "cache_aside";

/// Read-through, write-through cache.
///
/// Only `GET` and `HEAD` requests touch the store. A stored response is
/// returned without calling upstream; otherwise the upstream response is
/// stored for as long as the [`ExpirationTable`] says for its status code.
/// Store failures never reach the caller: they are logged and the request
/// proceeds as a miss.
///
/// ```
/// use std::time::Duration;
/// use stashbox::{CacheAside, ExpirationTable};
/// use stashbox_moka::MokaBackend;
///
/// let handler = CacheAside::builder()
///     .backend(MokaBackend::builder().max_entries(10_000).build())
///     .expiration(ExpirationTable::simple(
///         Duration::from_secs(60),
///         Duration::from_secs(5),
///         Duration::ZERO,
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(handler.stats().snapshot().total().total(), 0);
/// ```
pub struct CacheAside<B> {
    inner: Arc<CacheAsideInner<B>>,
}

struct CacheAsideInner<B> {
    backend: B,
    expiration: ExpirationTable,
    key_prefix: Option<SmolStr>,
    stats: Arc<StatsRecorder>,
}

impl<B> Clone for CacheAside<B> {
    fn clone(&self) -> Self {
        CacheAside {
            inner: self.inner.clone(),
        }
    }
}

impl CacheAside<NotSet> {
    /// Creates a new [`CacheAsideBuilder`].
    pub fn builder() -> CacheAsideBuilder<NotSet> {
        CacheAsideBuilder::new()
    }
}

impl<B> CacheAside<B>
where
    B: Backend,
{
    /// Hit/miss counters of this handler and its clones.
    pub fn stats(&self) -> &Arc<StatsRecorder> {
        &self.inner.stats
    }

    /// The underlying store.
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// TTL table applied to upstream responses.
    pub fn expiration(&self) -> &ExpirationTable {
        &self.inner.expiration
    }

    /// Removes stored responses for `uri`.
    ///
    /// With `Some(method)` only that entry is removed and a store failure is
    /// returned as an error. With `None` both `GET` and `HEAD` entries are
    /// removed; failures are logged and the remaining removals still run.
    /// Returns the number of removed entries.
    pub async fn invalidate(&self, uri: &str, method: Option<&str>) -> Result<u32, InvalidateError> {
        super::invalidate(
            &self.inner.backend,
            self.inner.key_prefix.as_ref(),
            uri,
            method,
        )
        .await
    }
}

impl<B> CacheAsideInner<B>
where
    B: Backend,
{
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.backend.get(key).await {
            Ok(cached) => cached,
            Err(error) => {
                warn!(%key, %error, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, cached: &CachedResponse, ttl: Duration) {
        if let Err(error) = self.backend.set(key, cached, ttl).await {
            warn!(%key, %error, "Cache write failed");
        }
    }

    async fn run<Req, U, Res, E>(&self, req: Req, mut upstream: U) -> (Result<Res, E>, CacheStatus)
    where
        Req: CacheableRequest,
        U: Upstream<Req, Response = Result<Res, E>>,
        Res: CacheableResponse,
    {
        let CacheablePolicyData { key, request } =
            match req.cache_policy(self.key_prefix.as_deref()) {
                CachePolicy::Cacheable(data) => data,
                CachePolicy::NonCacheable(req) => {
                    debug!(method = req.method(), "Request is not cacheable, bypassing");
                    metrics::record_status(HANDLER, CacheStatus::Bypass);
                    return (upstream.call(req).await, CacheStatus::Bypass);
                }
            };

        if let Some(cached) = self.lookup(&key).await {
            let res = Res::from_cached(cached, &key);
            debug!(%key, status = res.status(), "Cache hit");
            self.stats.report_hit(res.status());
            metrics::record_status(HANDLER, CacheStatus::Hit);
            return (Ok(res), CacheStatus::Hit);
        }

        metrics::record_status(HANDLER, CacheStatus::Miss);
        let res = match upstream.call(request).await {
            Ok(res) => res,
            Err(err) => {
                debug!(%key, "Upstream call failed on cache miss");
                return (Err(err), CacheStatus::Miss);
            }
        };

        let status = res.status();
        let ttl = self.expiration.ttl(status);
        let res = if ttl.is_zero() {
            debug!(%key, status, "Cache miss, response not stored");
            res
        } else {
            match res.into_cached().await {
                CachePolicy::Cacheable(cached) => {
                    self.store(&key, &cached, ttl).await;
                    debug!(%key, status, ?ttl, "Cache miss, response stored");
                    Res::from_cached(cached, &key)
                }
                CachePolicy::NonCacheable(res) => {
                    debug!(%key, status, "Cache miss, response body not cacheable");
                    res
                }
            }
        };
        self.stats.report_miss(status);
        (Ok(res), CacheStatus::Miss)
    }
}

impl<B, Req, U, Res, E> Handler<Req, U> for CacheAside<B>
where
    B: Backend,
    Req: CacheableRequest + Send,
    U: Upstream<Req, Response = Result<Res, E>> + Send,
    Res: CacheableResponse,
    E: Send,
{
    fn handle(
        &self,
        req: Req,
        upstream: U,
    ) -> impl Future<Output = (Result<Res, E>, CacheStatus)> + Send {
        self.inner.run(req, upstream)
    }
}

/// Builder for [`CacheAside`].
pub struct CacheAsideBuilder<B> {
    backend: B,
    config: CacheAsideConfig,
    stats: Option<Arc<StatsRecorder>>,
}

impl CacheAsideBuilder<NotSet> {
    /// Creates a new builder with no backend.
    pub fn new() -> Self {
        CacheAsideBuilder {
            backend: NotSet,
            config: CacheAsideConfig::default(),
            stats: None,
        }
    }
}

impl Default for CacheAsideBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> CacheAsideBuilder<B> {
    /// Sets the store.
    pub fn backend<NB>(self, backend: NB) -> CacheAsideBuilder<NB>
    where
        NB: Backend,
    {
        CacheAsideBuilder {
            backend,
            config: self.config,
            stats: self.stats,
        }
    }

    /// Sets the TTL table. Default: empty, every status is kept for a day.
    pub fn expiration(mut self, expiration: ExpirationTable) -> Self {
        self.config.expiration = expiration;
        self
    }

    /// Sets the namespace prepended to every key.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = Some(prefix.into());
        self
    }

    /// Replaces expiration table and key prefix at once.
    pub fn config(mut self, config: CacheAsideConfig) -> Self {
        self.config = config;
        self
    }

    /// Records hits and misses into an existing recorder.
    pub fn stats(mut self, stats: Arc<StatsRecorder>) -> Self {
        self.stats = Some(stats);
        self
    }
}

impl<B> CacheAsideBuilder<B>
where
    B: Backend,
{
    /// Validates the configuration and builds the handler.
    pub fn build(self) -> Result<CacheAside<B>, ConfigError> {
        self.config.validate()?;
        Ok(CacheAside {
            inner: Arc::new(CacheAsideInner {
                backend: self.backend,
                expiration: self.config.expiration,
                key_prefix: self.config.key_prefix.map(SmolStr::from),
                stats: self
                    .stats
                    .unwrap_or_else(|| Arc::new(StatsRecorder::new(HANDLER))),
            }),
        })
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{MaybeDone, maybe_done};
use smol_str::SmolStr;
use stashbox_backend::{Backend, BackendError, CacheBackend};
use stashbox_core::{
    CacheKey, CachePolicy, CacheStatus, CacheablePolicyData, CacheableRequest, CacheableResponse,
    CachedResponse, Upstream,
};
use tracing::{debug, warn};

use super::{Handler, NotSet};
use crate::config::FallbackConfig;
use crate::error::{ConfigError, InvalidateError};
use crate::metrics;
use crate::offload::OffloadManager;
use crate::stats::StatsRecorder;

const HANDLER: &str = "fallback";
const WRITE_BEHIND: &str = "write_behind";

/// Races upstream against a deadline and falls back to the last stored
/// response.
///
/// For every `GET` or `HEAD` request the handler starts the upstream call,
/// a store read and a timer at once:
///
/// * upstream answers before the timer: its response is stored (unless it
///   is a 5xx) and returned;
/// * the timer fires first and a stored response exists: the stored
///   response is returned at once and the upstream call keeps running in
///   the background, storing its result when it completes;
/// * the timer fires first and nothing is stored: the handler keeps
///   waiting for upstream;
/// * upstream fails, returns a 5xx, or its response cannot be stored: the
///   stored response is returned if there is one.
///
/// Every store call is bounded by
/// [`store_timeout`](FallbackRaceBuilder::store_timeout) and a failing
/// store is treated as an empty one.
///
/// The upstream future must be `'static`: after a fallback it outlives the
/// request.
pub struct FallbackRace<B> {
    inner: Arc<FallbackInner<B>>,
}

struct FallbackInner<B> {
    backend: B,
    max_timeout: Duration,
    cache_duration: Duration,
    store_timeout: Duration,
    key_prefix: Option<SmolStr>,
    offload: OffloadManager,
    stats: Arc<StatsRecorder>,
}

impl<B> Clone for FallbackRace<B> {
    fn clone(&self) -> Self {
        FallbackRace {
            inner: self.inner.clone(),
        }
    }
}

impl FallbackRace<NotSet> {
    /// Creates a new [`FallbackRaceBuilder`].
    pub fn builder() -> FallbackRaceBuilder<NotSet> {
        FallbackRaceBuilder::new()
    }
}

impl<B> FallbackRace<B>
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

    /// Manager running write-behind tasks.
    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    /// Removes stored responses for `uri`.
    ///
    /// Same semantics as [`CacheAside::invalidate`](super::CacheAside::invalidate).
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

/// Waits for the store read and takes its result. Call at most once.
async fn settle<F>(mut read: Pin<&mut MaybeDone<F>>) -> Option<CachedResponse>
where
    F: Future<Output = Option<CachedResponse>>,
{
    read.as_mut().await;
    read.take_output().flatten()
}

impl<B> FallbackInner<B>
where
    B: Backend,
{
    async fn read(&self, key: &CacheKey) -> Option<CachedResponse> {
        let result = tokio::time::timeout(self.store_timeout, self.backend.get(key))
            .await
            .unwrap_or(Err(BackendError::Timeout(self.store_timeout)));
        match result {
            Ok(cached) => cached,
            Err(error) => {
                warn!(%key, %error, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write(&self, key: &CacheKey, cached: &CachedResponse) -> Result<(), BackendError> {
        tokio::time::timeout(
            self.store_timeout,
            self.backend.set(key, cached, self.cache_duration),
        )
        .await
        .unwrap_or(Err(BackendError::Timeout(self.store_timeout)))
    }

    fn should_store(&self, status: u16) -> bool {
        status < 500 && !self.cache_duration.is_zero()
    }

    fn hit<Res, E>(&self, cached: CachedResponse, key: &CacheKey) -> (Result<Res, E>, CacheStatus)
    where
        Res: CacheableResponse,
    {
        let res = Res::from_cached(cached, key);
        self.stats.report_hit(res.status());
        metrics::record_status(HANDLER, CacheStatus::Hit);
        (Ok(res), CacheStatus::Hit)
    }

    fn miss<Res, E>(&self, res: Result<Res, E>) -> (Result<Res, E>, CacheStatus)
    where
        Res: CacheableResponse,
    {
        if let Ok(res) = &res {
            self.stats.report_miss(res.status());
        }
        metrics::record_status(HANDLER, CacheStatus::Miss);
        (res, CacheStatus::Miss)
    }

    async fn run<Req, U, Res, E>(
        self: Arc<Self>,
        req: Req,
        mut upstream: U,
    ) -> (Result<Res, E>, CacheStatus)
    where
        B: 'static,
        Req: CacheableRequest,
        U: Upstream<Req, Response = Result<Res, E>>,
        U::Future: 'static,
        Res: CacheableResponse + 'static,
        E: Send + 'static,
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

        let mut live = Box::pin(upstream.call(request));
        let mut cache_read = std::pin::pin!(maybe_done(self.read(&key)));
        let mut deadline = std::pin::pin!(tokio::time::sleep(self.max_timeout));
        let mut cache_done = false;

        // The store read only runs alongside; the race is upstream against the timer.
        let first = loop {
            tokio::select! {
                biased;
                result = &mut live => break Some(result),
                _ = &mut deadline => break None,
                _ = &mut cache_read, if !cache_done => cache_done = true,
            }
        };

        // `Some(_)` once the store read has been consumed.
        let mut settled: Option<Option<CachedResponse>> = None;
        let result = match first {
            Some(result) => result,
            None => match settle(cache_read.as_mut()).await {
                Some(cached) => {
                    debug!(%key, timeout = ?self.max_timeout, "Upstream too slow, serving cached response");
                    metrics::record_fallback_served(self.backend.label().as_str());
                    let inner = Arc::clone(&self);
                    let write_key = key.clone();
                    self.offload.spawn(WRITE_BEHIND, async move {
                        inner.write_behind(write_key, live).await;
                    });
                    return self.hit(cached, &key);
                }
                None => {
                    debug!(%key, "Upstream too slow and nothing cached, waiting for upstream");
                    settled = Some(None);
                    live.await
                }
            },
        };

        let res = match result {
            Ok(res) => res,
            Err(err) => {
                let stale = match settled {
                    Some(stale) => stale,
                    None => settle(cache_read.as_mut()).await,
                };
                return match stale {
                    Some(cached) => {
                        debug!(%key, "Upstream call failed, serving cached response");
                        self.hit(cached, &key)
                    }
                    None => {
                        debug!(%key, "Upstream call failed and nothing cached");
                        self.miss(Err(err))
                    }
                };
            }
        };

        let status = res.status();
        let res = if self.should_store(status) {
            match res.into_cached().await {
                CachePolicy::Cacheable(cached) => match self.write(&key, &cached).await {
                    Ok(()) => {
                        debug!(%key, status, "Upstream response stored");
                        return self.miss(Ok(Res::from_cached(cached, &key)));
                    }
                    Err(error) => {
                        warn!(%key, %error, "Cache write failed");
                        Res::from_cached(cached, &key)
                    }
                },
                CachePolicy::NonCacheable(res) => res,
            }
        } else {
            res
        };

        let stale = match settled {
            Some(stale) => stale,
            None => settle(cache_read.as_mut()).await,
        };
        match stale {
            Some(cached) => {
                debug!(%key, status, "Upstream response not stored, serving cached response");
                self.hit(cached, &key)
            }
            None => {
                debug!(%key, status, "Upstream response not stored and nothing cached");
                self.miss(Ok(res))
            }
        }
    }

    async fn write_behind<F, Res, E>(self: Arc<Self>, key: CacheKey, live: Pin<Box<F>>)
    where
        F: Future<Output = Result<Res, E>>,
        Res: CacheableResponse,
    {
        let Ok(res) = live.await else {
            debug!(%key, "Late upstream call failed, nothing to store");
            return;
        };
        let status = res.status();
        if !self.should_store(status) {
            debug!(%key, status, "Late upstream response not stored");
            return;
        }
        if let CachePolicy::Cacheable(cached) = res.into_cached().await {
            match self.write(&key, &cached).await {
                Ok(()) => debug!(%key, status, "Late upstream response stored"),
                Err(error) => debug!(%key, %error, "Write-behind failed"),
            }
        }
    }
}

impl<B, Req, U, Res, E> Handler<Req, U> for FallbackRace<B>
where
    B: Backend + 'static,
    Req: CacheableRequest + Send,
    U: Upstream<Req, Response = Result<Res, E>> + Send,
    U::Future: 'static,
    Res: CacheableResponse + 'static,
    E: Send + 'static,
{
    fn handle(
        &self,
        req: Req,
        upstream: U,
    ) -> impl Future<Output = (Result<Res, E>, CacheStatus)> + Send {
        Arc::clone(&self.inner).run(req, upstream)
    }
}

/// Builder for [`FallbackRace`].
///
/// ```
/// use std::time::Duration;
/// use stashbox::FallbackRace;
/// use stashbox_moka::MokaBackend;
///
/// let handler = FallbackRace::builder()
///     .backend(MokaBackend::builder().max_entries(1_000).build())
///     .max_timeout(Duration::from_millis(300))
///     .cache_duration(Duration::from_secs(3600))
///     .key_prefix("cfb")
///     .build()
///     .unwrap();
/// # let _ = handler;
///
/// assert!(
///     FallbackRace::builder()
///         .backend(MokaBackend::builder().max_entries(1_000).build())
///         .max_timeout(Duration::ZERO)
///         .build()
///         .is_err()
/// );
/// ```
pub struct FallbackRaceBuilder<B> {
    backend: B,
    config: FallbackConfig,
    offload: Option<OffloadManager>,
    stats: Option<Arc<StatsRecorder>>,
}

impl FallbackRaceBuilder<NotSet> {
    /// Creates a new builder with no backend and default timeouts.
    pub fn new() -> Self {
        FallbackRaceBuilder {
            backend: NotSet,
            config: FallbackConfig::default(),
            offload: None,
            stats: None,
        }
    }
}

impl Default for FallbackRaceBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> FallbackRaceBuilder<B> {
    /// Sets the store.
    pub fn backend<NB>(self, backend: NB) -> FallbackRaceBuilder<NB>
    where
        NB: Backend,
    {
        FallbackRaceBuilder {
            backend,
            config: self.config,
            offload: self.offload,
            stats: self.stats,
        }
    }

    /// How long to wait for upstream before serving the stored response.
    pub fn max_timeout(mut self, timeout: Duration) -> Self {
        self.config.max_timeout = timeout;
        self
    }

    /// TTL of stored responses. Zero disables storing.
    pub fn cache_duration(mut self, duration: Duration) -> Self {
        self.config.cache_duration = duration;
        self
    }

    /// Bound on each store read or write.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = timeout;
        self
    }

    /// Sets the namespace prepended to every key.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = Some(prefix.into());
        self
    }

    /// Replaces all timeouts and the key prefix at once.
    pub fn config(mut self, config: FallbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs write-behind tasks on an existing manager.
    pub fn offload(mut self, offload: OffloadManager) -> Self {
        self.offload = Some(offload);
        self
    }

    /// Records hits and misses into an existing recorder.
    pub fn stats(mut self, stats: Arc<StatsRecorder>) -> Self {
        self.stats = Some(stats);
        self
    }
}

impl<B> FallbackRaceBuilder<B>
where
    B: Backend,
{
    /// Validates the configuration and builds the handler.
    pub fn build(self) -> Result<FallbackRace<B>, ConfigError> {
        self.config.validate()?;
        let FallbackConfig {
            max_timeout,
            cache_duration,
            store_timeout,
            key_prefix,
        } = self.config;
        Ok(FallbackRace {
            inner: Arc::new(FallbackInner {
                backend: self.backend,
                max_timeout,
                cache_duration,
                store_timeout,
                key_prefix: key_prefix.map(SmolStr::from),
                offload: self.offload.unwrap_or_default(),
                stats: self
                    .stats
                    .unwrap_or_else(|| Arc::new(StatsRecorder::new(HANDLER))),
            }),
        })
    }
}

use crate::core::cache::Cache;
use crate::core::config::CacheConfig;
use crate::core::rate::{RateProvider, RateResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Cache-aside wrapper around a [`RateProvider`], bound to a single cache key.
///
/// Successful results are kept for `ttl` and failures for `failure_ttl`; a
/// zero failure TTL means failures are never stored. Concurrent misses share
/// one call to the inner provider, and callers that queued behind it receive
/// its result even when that result was not cached.
pub struct CachingRateProvider<T: RateProvider> {
    inner: T,
    cache: Arc<dyn Cache<String, RateResult>>,
    key: String,
    ttl: Duration,
    failure_ttl: Duration,
    /// Result of the most recent refresh, guarded for the whole refresh.
    last_refresh: Mutex<Option<RateResult>>,
    /// Bumped every time a refresh completes.
    generation: AtomicU64,
}

impl<T: RateProvider> CachingRateProvider<T> {
    pub fn new(
        inner: T,
        cache: Arc<dyn Cache<String, RateResult>>,
        key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            key: key.into(),
            ttl,
            failure_ttl: Duration::ZERO,
            last_refresh: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(
        inner: T,
        cache: Arc<dyn Cache<String, RateResult>>,
        config: &CacheConfig,
    ) -> Self {
        Self::new(inner, cache, config.key.clone(), config.ttl())
            .with_failure_ttl(config.failure_ttl())
    }

    pub fn with_failure_ttl(mut self, failure_ttl: Duration) -> Self {
        self.failure_ttl = failure_ttl;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<T: RateProvider> RateProvider for CachingRateProvider<T> {
    async fn fetch_rates(&self) -> RateResult {
        if let Some(cached) = self.cache.get(&self.key).await {
            return cached;
        }

        let seen = self.generation.load(Ordering::SeqCst);
        let mut last_refresh = self.last_refresh.lock().await;
        // A refresh finished while we waited: share its result
        if self.generation.load(Ordering::SeqCst) != seen {
            if let Some(shared) = last_refresh.as_ref() {
                debug!("Sharing concurrent refresh for key: {}", self.key);
                return shared.clone();
            }
        }
        if let Some(cached) = self.cache.get(&self.key).await {
            return cached;
        }

        debug!("Refreshing rates for key: {}", self.key);
        let result = self.inner.fetch_rates().await;
        let ttl = if result.is_success() {
            self.ttl
        } else {
            self.failure_ttl
        };

        if ttl.is_zero() {
            debug!("Not caching result for key: {}", self.key);
        } else {
            self.cache.put(self.key.clone(), result.clone(), Some(ttl)).await;
        }
        *last_refresh = Some(result.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        result
    }
}

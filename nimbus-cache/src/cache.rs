//! Single-value TTL cache with sticky authorization failures.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use nimbus_core::constants::DEFAULT_SESSION_INTERVAL_SECS;
use nimbus_core::error::{AuthorizationError, FailureKind, NimbusError, Result};
use nimbus_core::{AuthFailureSlot, Supplier};

/// Decides whether a supplier failure is a denial or transient.
pub type Classifier = fn(&NimbusError) -> FailureKind;

/// Cache entry. Replaced as a whole, never mutated.
struct CacheEntry<T> {
    value: T,
    computed_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.computed_at) < ttl
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Staleness window in seconds
    pub ttl_seconds: u64,
    /// Extra attempts after a supplier timeout (0 = surface the first timeout)
    pub timeout_retries: u32,
    /// Pause between timeout retries in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_SESSION_INTERVAL_SECS,
            timeout_retries: 0,
            retry_backoff_ms: 0,
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given staleness window.
    pub fn with_ttl_seconds(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            ..Default::default()
        }
    }

    /// Retries supplier timeouts up to `retries` extra times.
    pub fn with_timeout_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.timeout_retries = retries;
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Memoizes one supplier value for `ttl`, propagating denials immediately.
///
/// Every call first consults the shared [`AuthFailureSlot`]; once any holder
/// of that slot has observed a denial, `get` fails with it without touching
/// the supplier or the cached entry. Transient failures are surfaced for the
/// call that saw them and leave the slot and the (stale) entry alone.
///
/// Recomputation is serialized: concurrent callers that miss wait for the
/// in-flight load and then read its result.
pub struct AuthAwareMemoizingCache<T> {
    underlying: Arc<dyn Supplier<T>>,
    entry: RwLock<Option<Arc<CacheEntry<T>>>>,
    refresh: Mutex<()>,
    slot: AuthFailureSlot,
    ttl: Duration,
    timeout_retries: u32,
    retry_backoff: Duration,
    classifier: Classifier,
    name: String,
    stats: Counters,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
}

impl<T> AuthAwareMemoizingCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a cache over `underlying` with the given staleness window.
    pub fn new(underlying: Arc<dyn Supplier<T>>, ttl: Duration, slot: AuthFailureSlot) -> Self {
        Self {
            underlying,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
            slot,
            ttl,
            timeout_retries: 0,
            retry_backoff: Duration::ZERO,
            classifier: NimbusError::failure_kind,
            name: "supplier".into(),
            stats: Counters::default(),
        }
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn with_config(underlying: Arc<dyn Supplier<T>>, slot: AuthFailureSlot, config: CacheConfig) -> Self {
        let mut cache = Self::new(underlying, Duration::from_secs(config.ttl_seconds), slot);
        cache.timeout_retries = config.timeout_retries;
        cache.retry_backoff = Duration::from_millis(config.retry_backoff_ms);
        cache
    }

    /// Replaces the failure classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Names the cache in log events.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the memoized value, loading it when missing or stale.
    pub async fn get(&self) -> Result<T> {
        self.check_slot()?;
        if let Some(value) = self.fresh_value() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have loaded or been denied while we waited.
        self.check_slot()?;
        if let Some(value) = self.fresh_value() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache = %self.name, "Cache miss, loading");

        let started = Instant::now();
        match self.load().await {
            Ok(value) => {
                // A sibling may have been denied while this load ran.
                self.check_slot()?;
                self.store(value.clone(), started);
                Ok(value)
            }
            Err(err) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(self.on_failure(err))
            }
        }
    }

    /// Drops the cached entry; the next `get` reloads.
    pub fn invalidate(&self) {
        self.entry.write().take();
    }

    /// Returns true if the shared slot holds a denial.
    pub fn is_poisoned(&self) -> bool {
        self.slot.is_poisoned()
    }

    /// The shared failure slot.
    pub fn failure_slot(&self) -> &AuthFailureSlot {
        &self.slot
    }

    /// The staleness window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            loads: self.stats.loads.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
        }
    }

    fn check_slot(&self) -> Result<()> {
        match self.slot.get() {
            Some(denial) => {
                debug!(cache = %self.name, "Failure slot poisoned, refusing lookup");
                Err(NimbusError::AuthorizationDenied(denial))
            }
            None => Ok(()),
        }
    }

    fn fresh_value(&self) -> Option<T> {
        let now = Instant::now();
        self.entry
            .read()
            .as_ref()
            .filter(|e| e.is_fresh(now, self.ttl))
            .map(|e| e.value.clone())
    }

    async fn load(&self) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            self.stats.loads.fetch_add(1, Ordering::Relaxed);
            match self.underlying.get().await {
                Err(err)
                    if err.is_timeout()
                        && attempt < self.timeout_retries
                        && (self.classifier)(&err) == FailureKind::Transient =>
                {
                    attempt += 1;
                    warn!(cache = %self.name, attempt, error = %err, "Supplier timed out, retrying");
                    if !self.retry_backoff.is_zero() {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
                other => return other,
            }
        }
    }

    /// Loads are serialized by `refresh`, so the last store is always the newest.
    fn store(&self, value: T, computed_at: Instant) {
        *self.entry.write() = Some(Arc::new(CacheEntry { value, computed_at }));
    }

    fn on_failure(&self, err: NimbusError) -> NimbusError {
        match (self.classifier)(&err) {
            FailureKind::AuthorizationDenied => {
                let denial = match err {
                    NimbusError::AuthorizationDenied(denial) => denial,
                    other => AuthorizationError::new(other.to_string()),
                };
                if self.slot.set_if_absent(denial.clone()) {
                    warn!(cache = %self.name, error = %denial, "Authorization denied, poisoning shared failure slot");
                }
                NimbusError::AuthorizationDenied(denial)
            }
            FailureKind::Transient => {
                debug!(cache = %self.name, error = %err, "Transient supplier failure");
                err
            }
        }
    }
}

#[async_trait]
impl<T> Supplier<T> for AuthAwareMemoizingCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self) -> Result<T> {
        AuthAwareMemoizingCache::get(self).await
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cached entry
    pub hits: u64,
    /// Lookups that had to load
    pub misses: u64,
    /// Supplier invocations (including timeout retries)
    pub loads: u64,
    /// Loads that ended in an error
    pub failures: u64,
}

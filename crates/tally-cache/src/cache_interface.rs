//! Cache interface trait for abstracted caching operations.

use crate::lock::LockGuard;
use async_trait::async_trait;
use std::time::Duration;
use tally_core::TallyResult;

/// Returns the expiry actually sent to the store.
///
/// A zero requested TTL (the unsigned rendering of "no expiry given") is
/// replaced by the configured default; any positive TTL is used exactly.
#[must_use]
pub fn effective_ttl(requested: Duration, default_ttl: Duration) -> Duration {
    if requested.is_zero() {
        default_ttl
    } else {
        requested
    }
}

/// Cache interface for the shared key-value store.
///
/// This trait abstracts over the Redis implementation and the in-memory
/// backend used by tests. Implementations must be safe for concurrent use
/// without external locking; callers share a single client via `Arc`.
///
/// Uses JSON strings for type-erased storage to maintain dyn-compatibility;
/// see [`CacheExt`] for the typed convenience layer.
#[async_trait]
pub trait CacheInterface: Send + Sync {
    /// Liveness probe against the store.
    async fn ping(&self) -> TallyResult<()>;

    /// Get the value stored under an exact key.
    ///
    /// Returns the `CacheKeyNotFound` sentinel (never a generic error) when
    /// the key is absent or expired, so callers can branch into a recompute
    /// path via [`tally_core::TallyError::is_not_found`].
    async fn get(&self, key: &str) -> TallyResult<String>;

    /// Store a value under a key with an expiry.
    ///
    /// A zero `ttl` is replaced by the configured default. Write failures
    /// surface as the tagged `CacheWriteFailed` kind rather than the raw
    /// transport error.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<()>;

    /// Delete every key matching a glob-style pattern.
    ///
    /// Iterates the keyspace with an incremental cursor scan rather than a
    /// single enumeration, deleting matches as they are yielded. Returns the
    /// number of keys deleted. A scan error aborts the iteration; keys
    /// already deleted stay deleted (at-least-once semantics).
    ///
    /// An exact key is itself a valid pattern, so single-key invalidation
    /// goes through here too.
    async fn del_pattern(&self, pattern: &str) -> TallyResult<u64>;

    /// Wipe all keys in every logical database. Destructive; intended for
    /// test and maintenance tooling, not request-path logic.
    async fn flush_all(&self) -> TallyResult<()>;

    /// Like [`CacheInterface::flush_all`], but the store reclaims memory in
    /// the background.
    async fn flush_all_async(&self) -> TallyResult<()>;

    /// Wipe all keys in the current logical database only.
    async fn flush_db(&self) -> TallyResult<()>;

    /// Like [`CacheInterface::flush_db`], but the store reclaims memory in
    /// the background.
    async fn flush_db_async(&self) -> TallyResult<()>;

    /// The configured default TTL. No store interaction.
    fn default_ttl(&self) -> Duration;

    /// Acquire a lease-based mutual-exclusion lock on a named resource.
    ///
    /// Contention yields the `LockNotObtained` sentinel, distinguishable
    /// from transport errors; callers treat it as "already in progress
    /// elsewhere". The lease expires on its own if the holder crashes,
    /// bounding worst-case lock-out to the lease duration.
    async fn acquire_lock(&self, resource: &str, lease: Duration) -> TallyResult<LockGuard>;
}

/// Extension trait with typed methods for convenience.
///
/// This trait provides generic get/set methods that work with any
/// serializable type.
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Get a typed value from the cache.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> TallyResult<T> {
        let json = self.get(key).await?;
        let value: T = serde_json::from_str(&json)?;
        Ok(value)
    }

    /// Set a typed value in the cache.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> TallyResult<()> {
        let json = serde_json::to_string(value)?;
        self.set_ex(key, &json, ttl).await
    }

    /// Get a value, or compute and cache it when the key is absent.
    async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, factory: F) -> TallyResult<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = TallyResult<T>> + Send,
    {
        match self.get(key).await {
            Ok(json) => {
                let value: T = serde_json::from_str(&json)?;
                Ok(value)
            }
            Err(e) if e.is_not_found() => {
                let value = factory().await?;

                // Cache it (ignore errors as the value is still valid)
                let _ = self.set_json(key, &value, ttl).await;

                Ok(value)
            }
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all CacheInterface implementations
impl<T: CacheInterface + ?Sized> CacheExt for T {}

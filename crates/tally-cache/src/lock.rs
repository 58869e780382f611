//! Lease-based distributed lock handle.
//!
//! A lock is held by whichever caller acquired it and released either
//! explicitly or by lease expiry. Locks are advisory: correctness depends on
//! clock skew between instances staying below the lease duration.

use async_trait::async_trait;
use std::sync::Arc;
use tally_core::TallyResult;
use tracing::warn;

/// Store-side release of a held lease.
///
/// Implemented by each cache backend; the release must be conditional on the
/// fencing token so a lease that expired and was re-acquired by another
/// holder is never deleted by the old one.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Delete the lease under `key` only if `token` still owns it.
    /// Returns whether the lease was still held at release time.
    async fn release(&self, key: &str, token: &str) -> TallyResult<bool>;
}

/// A held mutual-exclusion lock on a named resource.
///
/// State machine: Unacquired -> Held (this value exists) -> Released
/// (explicit [`LockGuard::release`]) | Expired (lease timeout). Released and
/// Expired are terminal; the consuming `release` makes reuse of a released
/// handle impossible, and a fresh acquisition always mints a new token.
///
/// Dropping an unreleased guard schedules a best-effort background release
/// when a runtime is available, so error paths do not hold the lease for the
/// full lease duration.
pub struct LockGuard {
    key: String,
    token: String,
    backend: Arc<dyn LockBackend>,
    released: bool,
}

impl LockGuard {
    pub(crate) fn new(key: String, token: String, backend: Arc<dyn LockBackend>) -> Self {
        Self {
            key,
            token,
            backend,
            released: false,
        }
    }

    /// The store key the lease lives under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The fencing token minted for this acquisition.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Release the lease.
    ///
    /// Returns `Ok(true)` if the lease was still held, `Ok(false)` if it had
    /// already expired (another holder may own the resource by now).
    pub async fn release(mut self) -> TallyResult<bool> {
        self.released = true;
        self.backend.release(&self.key, &self.token).await
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Best effort only; without a runtime the lease expires on its own.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let backend = Arc::clone(&self.backend);
            let key = std::mem::take(&mut self.key);
            let token = std::mem::take(&mut self.token);
            handle.spawn(async move {
                if let Err(e) = backend.release(&key, &token).await {
                    warn!(key = %key, error = %e, "failed to release dropped lock");
                }
            });
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

//! In-memory cache implementation.
//!
//! Backs the behavioral test-suite and local development without a live
//! store. Semantics mirror the Redis backend: per-entry expiry, glob
//! pattern deletion, lease-based locks with token-checked release. One
//! difference is documented: this backend has a single logical database,
//! so `flush_db` and `flush_all` are equivalent here.

use crate::cache_interface::{effective_ttl, CacheInterface};
use crate::keys;
use crate::lock::{LockBackend, LockGuard};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tally_core::{TallyError, TallyResult};
use tracing::{debug, info};
use uuid::Uuid;

struct Entry {
    value: String,
    expires_at: Instant,
}

struct LeaseEntry {
    token: String,
    expires_at: Instant,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
    leases: HashMap<String, LeaseEntry>,
}

/// In-memory cache service.
pub struct MemoryCacheService {
    state: Arc<RwLock<MemoryState>>,
    locker: Arc<MemoryLockBackend>,
    default_ttl: Duration,
}

impl MemoryCacheService {
    /// Create an in-memory cache with the given default TTL.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        let state = Arc::new(RwLock::new(MemoryState::default()));
        Self {
            locker: Arc::new(MemoryLockBackend {
                state: Arc::clone(&state),
            }),
            state,
            default_ttl,
        }
    }
}

#[async_trait]
impl CacheInterface for MemoryCacheService {
    async fn ping(&self) -> TallyResult<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> TallyResult<String> {
        let mut state = self.state.write();
        match state.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(entry.value.clone()),
            Some(_) => {
                // Lazy expiry
                state.entries.remove(key);
                Err(TallyError::not_found(key))
            }
            None => Err(TallyError::not_found(key)),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<()> {
        let ttl = effective_ttl(ttl, self.default_ttl);
        let mut state = self.state.write();
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del_pattern(&self, pattern: &str) -> TallyResult<u64> {
        let mut state = self.state.write();
        let now = Instant::now();
        state.entries.retain(|_, entry| entry.expires_at > now);

        let matching: Vec<String> = state
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();

        let mut deleted = 0u64;
        for key in matching {
            state.entries.remove(&key);
            info!(key = %key, "Deleted key");
            deleted += 1;
        }

        info!(pattern = %pattern, count = deleted, "Pattern deletion complete");
        Ok(deleted)
    }

    async fn flush_all(&self) -> TallyResult<()> {
        let mut state = self.state.write();
        state.entries.clear();
        state.leases.clear();
        Ok(())
    }

    async fn flush_all_async(&self) -> TallyResult<()> {
        self.flush_all().await
    }

    async fn flush_db(&self) -> TallyResult<()> {
        // Single logical database: identical to flush_all here.
        self.flush_all().await
    }

    async fn flush_db_async(&self) -> TallyResult<()> {
        self.flush_all().await
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn acquire_lock(&self, resource: &str, lease: Duration) -> TallyResult<LockGuard> {
        let key = keys::lock_key(resource);
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();

        let mut state = self.state.write();
        if let Some(existing) = state.leases.get(&key) {
            if existing.expires_at > now {
                debug!(resource = %resource, "Lock held elsewhere");
                return Err(TallyError::lock_not_obtained(resource));
            }
        }

        state.leases.insert(
            key.clone(),
            LeaseEntry {
                token: token.clone(),
                expires_at: now + lease,
            },
        );

        debug!(resource = %resource, "Lock acquired");
        Ok(LockGuard::new(
            key,
            token,
            Arc::clone(&self.locker) as Arc<dyn LockBackend>,
        ))
    }
}

struct MemoryLockBackend {
    state: Arc<RwLock<MemoryState>>,
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn release(&self, key: &str, token: &str) -> TallyResult<bool> {
        let mut state = self.state.write();
        match state.leases.get(key) {
            Some(lease) if lease.token == token => {
                let still_held = lease.expires_at > Instant::now();
                state.leases.remove(key);
                Ok(still_held)
            }
            _ => Ok(false),
        }
    }
}

/// Redis-style glob matching supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(star_pos) = star {
            pi = star_pos + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_exact_match() {
        assert!(glob_match("user:1", "user:1"));
        assert!(!glob_match("user:1", "user:2"));
    }

    #[test]
    fn test_glob_star() {
        assert!(glob_match("user:*", "user:1"));
        assert!(glob_match("user:*", "user:1:profile"));
        assert!(!glob_match("user:*", "wallet:1"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn test_glob_inner_star() {
        assert!(glob_match("tally:*:user:42", "tally:wallet:user:42"));
        assert!(glob_match("tally:*:user:42", "tally:transaction:user:42"));
        assert!(!glob_match("tally:*:user:42", "tally:wallet:user:43"));
    }

    #[test]
    fn test_glob_question_mark() {
        assert!(glob_match("user:?", "user:1"));
        assert!(!glob_match("user:?", "user:12"));
    }

    #[test]
    fn test_glob_empty_text() {
        assert!(glob_match("*", ""));
        assert!(!glob_match("?", ""));
    }
}

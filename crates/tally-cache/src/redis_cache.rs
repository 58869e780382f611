//! Redis-based cache implementation.

use crate::cache_interface::{effective_ttl, CacheInterface};
use crate::keys;
use crate::lock::{LockBackend, LockGuard};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::sync::Arc;
use std::time::Duration;
use tally_config::CacheConfig;
use tally_core::{TallyError, TallyResult};
use tracing::{debug, info};
use uuid::Uuid;

/// COUNT hint for the incremental SCAN loop. The store may yield more or
/// fewer keys per batch; the hint only bounds round-trip granularity.
const SCAN_COUNT: usize = 100;

/// Deletes a lease only when the caller's token still owns it.
const RELEASE_SCRIPT: &str = r#"
    if redis.call("get", KEYS[1]) == ARGV[1] then
        return redis.call("del", KEYS[1])
    else
        return 0
    end
"#;

/// Redis-backed cache client.
///
/// Owns the single shared connection handle for its lifetime. The
/// `ConnectionManager` multiplexes concurrent callers internally, so the
/// service is shared as-is (`Arc`) without external locking.
pub struct RedisCacheService {
    conn: ConnectionManager,
    locker: Arc<RedisLockBackend>,
    config: CacheConfig,
}

impl RedisCacheService {
    /// Connect to the store and validate reachability.
    ///
    /// Builds connection options from config (address, credentials, optional
    /// TLS with certificate-verification bypass) and issues a PING probe.
    /// The cache is a required dependency: callers must treat an
    /// `Err(ConnectionUnreachable)` as fatal rather than continuing
    /// half-initialized.
    pub async fn connect(config: CacheConfig) -> TallyResult<Self> {
        info!("Connecting to cache store...");

        let addr = config.addr();
        let client = Client::open(Self::connection_info(&config)).map_err(|e| {
            TallyError::ConnectionUnreachable {
                addr: addr.clone(),
                message: e.to_string(),
            }
        })?;

        let mut conn =
            ConnectionManager::new(client)
                .await
                .map_err(|e| TallyError::ConnectionUnreachable {
                    addr: addr.clone(),
                    message: e.to_string(),
                })?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| TallyError::ConnectionUnreachable {
                addr: addr.clone(),
                message: e.to_string(),
            })?;

        info!(addr = %addr, "Cache store connected");

        Ok(Self {
            conn: conn.clone(),
            locker: Arc::new(RedisLockBackend { conn }),
            config,
        })
    }

    fn connection_info(config: &CacheConfig) -> ConnectionInfo {
        let addr = if config.tls.enabled {
            ConnectionAddr::TcpTls {
                host: config.host.clone(),
                port: config.port,
                insecure: config.tls.insecure_skip_verify,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(config.host.clone(), config.port)
        };

        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: 0,
                username: (!config.username.is_empty()).then(|| config.username.clone()),
                password: (!config.password.is_empty()).then(|| config.password.clone()),
                ..RedisConnectionInfo::default()
            },
        }
    }

    async fn flush(&self, command: &str, background: bool) -> TallyResult<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd(command);
        if background {
            cmd.arg("ASYNC");
        }
        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(|e| TallyError::Cache(format!("{} failed: {}", command, e)))
    }
}

#[async_trait]
impl CacheInterface for RedisCacheService {
    async fn ping(&self) -> TallyResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| TallyError::Cache(format!("PING failed: {}", e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> TallyResult<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| TallyError::Cache(format!("Failed to get key '{}': {}", key, e)))?;

        match value {
            Some(v) => {
                debug!("Cache hit for key '{}'", key);
                Ok(v)
            }
            None => {
                debug!("Cache miss for key '{}'", key);
                Err(TallyError::not_found(key))
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<()> {
        let ttl = effective_ttl(ttl, self.config.default_ttl());
        let ttl_secs = ttl.as_secs().max(1);

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| {
                TallyError::CacheWriteFailed(format!("Failed to set key '{}': {}", key, e))
            })?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn del_pattern(&self, pattern: &str) -> TallyResult<u64> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        // Incremental scan; one batch per round-trip so a caller timeout can
        // interrupt between batches. Keys already deleted stay deleted.
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    TallyError::CacheScanFailed(format!("Scan for '{}' failed: {}", pattern, e))
                })?;

            for key in batch {
                let _: () = conn.del(&key).await.map_err(|e| {
                    TallyError::CacheScanFailed(format!("Failed to delete key '{}': {}", key, e))
                })?;
                info!(key = %key, "Deleted key");
                deleted += 1;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        info!(pattern = %pattern, count = deleted, "Pattern deletion complete");
        Ok(deleted)
    }

    async fn flush_all(&self) -> TallyResult<()> {
        self.flush("FLUSHALL", false).await
    }

    async fn flush_all_async(&self) -> TallyResult<()> {
        self.flush("FLUSHALL", true).await
    }

    async fn flush_db(&self) -> TallyResult<()> {
        self.flush("FLUSHDB", false).await
    }

    async fn flush_db_async(&self) -> TallyResult<()> {
        self.flush("FLUSHDB", true).await
    }

    fn default_ttl(&self) -> Duration {
        self.config.default_ttl()
    }

    async fn acquire_lock(&self, resource: &str, lease: Duration) -> TallyResult<LockGuard> {
        let key = keys::lock_key(resource);
        let token = Uuid::new_v4().to_string();
        let lease_ms = u64::try_from(lease.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.conn.clone();

        // SET NX PX: succeeds only when no live lease exists.
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(lease_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| TallyError::Cache(format!("Failed to acquire '{}': {}", resource, e)))?;

        if acquired.is_none() {
            debug!(resource = %resource, "Lock held elsewhere");
            return Err(TallyError::lock_not_obtained(resource));
        }

        debug!(resource = %resource, lease_ms = lease_ms, "Lock acquired");
        Ok(LockGuard::new(
            key,
            token,
            Arc::clone(&self.locker) as Arc<dyn LockBackend>,
        ))
    }
}

/// Token-checked release against the store.
struct RedisLockBackend {
    conn: ConnectionManager,
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn release(&self, key: &str, token: &str) -> TallyResult<bool> {
        let mut conn = self.conn.clone();

        let released: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| TallyError::Cache(format!("Failed to release '{}': {}", key, e)))?;

        debug!(key = %key, released = released > 0, "Lock release attempted");
        Ok(released > 0)
    }
}

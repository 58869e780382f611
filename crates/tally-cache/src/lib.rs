//! # Tally Cache
//!
//! Distributed cache and locking layer over a shared Redis store.
//!
//! The cache client is constructed once at process start, validated with a
//! liveness probe, and then shared (`Arc`) by every component that needs it.
//! All operations are independent request/response round-trips against the
//! store; there is no in-process caching above it.

mod cache_interface;
pub mod keys;
mod lock;
mod memory;
mod redis_cache;

pub use cache_interface::{effective_ttl, CacheExt, CacheInterface};
pub use lock::{LockBackend, LockGuard};
pub use memory::MemoryCacheService;
pub use redis_cache::RedisCacheService;

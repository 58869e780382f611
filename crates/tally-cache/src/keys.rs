//! Cache key generators for consistent key naming.
//!
//! `del_pattern` treats its argument as a glob, so call sites pick between
//! the exact-key builders and the explicit `*_pattern()` builders here
//! instead of passing ad-hoc strings.

use uuid::Uuid;

/// Prefix for all cache keys to namespace them.
const CACHE_PREFIX: &str = "tally:cache";

/// Prefix for distributed lock leases.
const LOCK_PREFIX: &str = "tally:lock";

/// Generate a cache key for a transaction by ID.
#[must_use]
pub fn transaction_by_id(id: Uuid) -> String {
    format!("{}:transaction:id:{}", CACHE_PREFIX, id)
}

/// Generate a cache key for a user's transaction listing.
#[must_use]
pub fn transactions_by_user(user_id: Uuid) -> String {
    format!("{}:transaction:user:{}", CACHE_PREFIX, user_id)
}

/// Generate a cache key for a wallet by owning user.
#[must_use]
pub fn wallet_by_user(user_id: Uuid) -> String {
    format!("{}:wallet:user:{}", CACHE_PREFIX, user_id)
}

/// Pattern to invalidate every cached transaction entry.
#[must_use]
pub fn transaction_pattern() -> String {
    format!("{}:transaction:*", CACHE_PREFIX)
}

/// Pattern to invalidate all cache entries touching a specific user.
#[must_use]
pub fn user_invalidation_pattern(user_id: Uuid) -> String {
    format!("{}:*:user:{}", CACHE_PREFIX, user_id)
}

/// Pattern to invalidate every cached wallet entry.
#[must_use]
pub fn wallet_pattern() -> String {
    format!("{}:wallet:*", CACHE_PREFIX)
}

/// Store key a lock lease lives under.
#[must_use]
pub fn lock_key(resource: &str) -> String {
    format!("{}:{}", LOCK_PREFIX, resource)
}

//! Behavioral tests for the cache and locking layer.
//!
//! These run against the in-memory backend, which mirrors the Redis
//! backend's semantics, so no live store is required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tally_cache::{keys, CacheExt, CacheInterface, MemoryCacheService};
use tally_core::TallyError;
use uuid::Uuid;

fn cache() -> MemoryCacheService {
    MemoryCacheService::new(Duration::from_secs(300))
}

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let cache = cache();

    cache
        .set_ex("txn:1", "pending", Duration::from_secs(60))
        .await
        .expect("set failed");

    let value = cache.get("txn:1").await.expect("get failed");
    assert_eq!(value, "pending");
}

#[tokio::test]
async fn test_get_missing_key_returns_not_found_sentinel() {
    let cache = cache();

    let err = cache.get("never:set").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.error_code(), "CACHE_KEY_NOT_FOUND");
}

#[tokio::test]
async fn test_zero_ttl_falls_back_to_default() {
    // Short default so the fallback expiry is observable.
    let cache = MemoryCacheService::new(Duration::from_millis(50));

    cache
        .set_ex("txn:2", "settled", Duration::ZERO)
        .await
        .expect("set failed");

    assert_eq!(cache.get("txn:2").await.expect("get failed"), "settled");

    tokio::time::sleep(Duration::from_millis(80)).await;

    let err = cache.get("txn:2").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_explicit_ttl_outlives_shorter_default() {
    let cache = MemoryCacheService::new(Duration::from_millis(30));

    cache
        .set_ex("txn:3", "refunded", Duration::from_millis(300))
        .await
        .expect("set failed");

    tokio::time::sleep(Duration::from_millis(80)).await;

    // Still present: the explicit TTL was used, not the shorter default.
    assert_eq!(cache.get("txn:3").await.expect("get failed"), "refunded");
}

#[tokio::test]
async fn test_default_ttl_accessor() {
    let cache = MemoryCacheService::new(Duration::from_secs(120));
    assert_eq!(cache.default_ttl(), Duration::from_secs(120));
}

#[tokio::test]
async fn test_del_pattern_deletes_only_matches() {
    let cache = cache();
    let ttl = Duration::from_secs(60);

    cache.set_ex("user:1", "a", ttl).await.expect("set");
    cache.set_ex("user:2", "b", ttl).await.expect("set");
    cache.set_ex("other:1", "c", ttl).await.expect("set");

    let deleted = cache.del_pattern("user:*").await.expect("del failed");
    assert_eq!(deleted, 2);

    assert!(cache.get("user:1").await.unwrap_err().is_not_found());
    assert!(cache.get("user:2").await.unwrap_err().is_not_found());
    assert_eq!(cache.get("other:1").await.expect("get failed"), "c");
}

#[tokio::test]
async fn test_del_pattern_no_matches_is_ok() {
    let cache = cache();

    let deleted = cache.del_pattern("user:*").await.expect("del failed");
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_del_pattern_accepts_exact_key() {
    let cache = cache();
    let ttl = Duration::from_secs(60);

    cache.set_ex("user:1", "a", ttl).await.expect("set");
    cache.set_ex("user:12", "b", ttl).await.expect("set");

    let deleted = cache.del_pattern("user:1").await.expect("del failed");
    assert_eq!(deleted, 1);
    assert_eq!(cache.get("user:12").await.expect("get failed"), "b");
}

#[tokio::test]
async fn test_flush_db_removes_everything() {
    let cache = cache();

    cache
        .set_ex("txn:9", "x", Duration::from_secs(60))
        .await
        .expect("set");
    cache.flush_db().await.expect("flush failed");

    assert!(cache.get("txn:9").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_lock_contention_yields_sentinel() {
    let cache = cache();
    let lease = Duration::from_secs(30);

    let guard = cache
        .acquire_lock("xendit:invoice:1", lease)
        .await
        .expect("first acquire failed");

    let err = cache
        .acquire_lock("xendit:invoice:1", lease)
        .await
        .unwrap_err();
    assert!(err.is_lock_not_obtained());
    assert_eq!(err.error_code(), "LOCK_NOT_OBTAINED");

    // A different resource is not blocked.
    let other = cache
        .acquire_lock("xendit:invoice:2", lease)
        .await
        .expect("unrelated resource blocked");

    let released = guard.release().await.expect("release failed");
    assert!(released);
    other.release().await.expect("release failed");

    // After release the resource can be acquired again.
    cache
        .acquire_lock("xendit:invoice:1", lease)
        .await
        .expect("reacquire after release failed");
}

#[tokio::test]
async fn test_concurrent_acquire_exactly_one_winner() {
    let cache = Arc::new(cache());
    let lease = Duration::from_secs(30);

    let a = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.acquire_lock("wallet:settle:7", lease).await })
    };
    let b = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.acquire_lock("wallet:settle:7", lease).await })
    };

    let (a, b) = (a.await.expect("join"), b.await.expect("join"));
    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);

    let loser_err = match (a, b) {
        (Ok(_guard), Err(e)) | (Err(e), Ok(_guard)) => e,
        _ => unreachable!("exactly one winner asserted above"),
    };
    assert!(loser_err.is_lock_not_obtained());
}

#[tokio::test]
async fn test_lock_lease_expires() {
    let cache = cache();

    let guard = cache
        .acquire_lock("xendit:webhook:3", Duration::from_millis(40))
        .await
        .expect("acquire failed");

    tokio::time::sleep(Duration::from_millis(80)).await;

    // Lease expired: a second holder can acquire.
    let second = cache
        .acquire_lock("xendit:webhook:3", Duration::from_secs(30))
        .await
        .expect("acquire after expiry failed");

    // The stale guard reports the lease as no longer held and must not
    // revoke the new holder's lease.
    let released = guard.release().await.expect("release failed");
    assert!(!released);

    let released = second.release().await.expect("release failed");
    assert!(released);
}

#[tokio::test]
async fn test_dropped_guard_releases_in_background() {
    let cache = cache();

    let guard = cache
        .acquire_lock("txn:process:5", Duration::from_secs(30))
        .await
        .expect("acquire failed");
    drop(guard);

    // The drop spawns a background release; poll until it lands.
    let mut reacquired = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        match cache
            .acquire_lock("txn:process:5", Duration::from_secs(30))
            .await
        {
            Ok(guard) => {
                reacquired = Some(guard);
                break;
            }
            Err(e) if e.is_lock_not_obtained() => continue,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(reacquired.is_some(), "dropped lock was never released");
}

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct WalletSnapshot {
    user_id: Uuid,
    balance_cents: i64,
}

#[tokio::test]
async fn test_typed_json_round_trip() {
    let cache = cache();
    let snapshot = WalletSnapshot {
        user_id: Uuid::new_v4(),
        balance_cents: 12_500,
    };
    let key = keys::wallet_by_user(snapshot.user_id);

    cache
        .set_json(&key, &snapshot, Duration::from_secs(60))
        .await
        .expect("set_json failed");

    let loaded: WalletSnapshot = cache.get_json(&key).await.expect("get_json failed");
    assert_eq!(loaded, snapshot);
}

#[tokio::test]
async fn test_get_or_fetch_uses_cache_on_second_call() {
    let cache = cache();
    let calls = AtomicUsize::new(0);
    let key = "wallet:user:fetch";

    let fetch = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, TallyError>(41i64)
    };
    let value = cache
        .get_or_fetch(key, Duration::from_secs(60), fetch)
        .await
        .expect("fetch failed");
    assert_eq!(value, 41);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Second call is served from the cache; the factory never runs.
    let fetch = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, TallyError>(99i64)
    };
    let value = cache
        .get_or_fetch(key, Duration::from_secs(60), fetch)
        .await
        .expect("fetch failed");
    assert_eq!(value, 41);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_key_builders_compose_with_pattern_deletion() {
    let cache = cache();
    let user_id = Uuid::new_v4();
    let ttl = Duration::from_secs(60);

    cache
        .set_ex(&keys::wallet_by_user(user_id), "{}", ttl)
        .await
        .expect("set");
    cache
        .set_ex(&keys::transactions_by_user(user_id), "[]", ttl)
        .await
        .expect("set");
    cache
        .set_ex(&keys::wallet_by_user(Uuid::new_v4()), "{}", ttl)
        .await
        .expect("set");

    let deleted = cache
        .del_pattern(&keys::user_invalidation_pattern(user_id))
        .await
        .expect("del failed");
    assert_eq!(deleted, 2);
}

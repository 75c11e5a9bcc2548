//! Integration Tests for the Cache
//!
//! Exercises the public API end to end: expiration, purge, capacity and
//! concurrent use from several threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use freshcache::{Cache, CacheConfig, RemovalCause, NO_EXPIRATION};

const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);
const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);

// == Expiration ==

#[test]
fn test_simple_usage() {
    let cache: Cache<String, String> = Cache::new(100, FIVE_MINUTES, TEN_MINUTES);

    cache.set("foo".to_string(), "bar".to_string());
    cache.set_with_expire("baz".to_string(), "never".to_string(), NO_EXPIRATION);

    assert_eq!(cache.get("foo"), Some("bar".to_string()));
    assert_eq!(cache.get("baz"), Some("never".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_no_expiration_until_deleted() {
    let cache: Cache<String, String> = Cache::new(100, FIVE_MINUTES, TEN_MINUTES);
    cache.set_with_expire("baz".to_string(), "never".to_string(), NO_EXPIRATION);

    // Purge passes run in between and must leave the entry alone
    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
    assert_eq!(cache.get("baz"), Some("never".to_string()));

    cache.delete("baz");
    assert_eq!(cache.get("baz"), None);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_with_and_without_purge() {
    let purged: Cache<&'static str, u32> = Cache::new(100, FIVE_MINUTES, Duration::from_secs(1));
    let unpurged: Cache<&'static str, u32> = Cache::new(100, FIVE_MINUTES, NO_EXPIRATION);

    for cache in [&purged, &unpurged] {
        cache.set_with_expire("k", 7, Duration::from_secs(2));
        assert_eq!(cache.get("k"), Some(7));
    }

    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Reads agree; only the physical state differs
    assert_eq!(purged.get("k"), None);
    assert_eq!(unpurged.get("k"), None);
    assert_eq!(purged.len(), 0);
    assert_eq!(unpurged.len(), 1);
}

#[test]
fn test_zero_cleanup_interval_disables_purge() {
    let cache: Cache<u32, u32> = Cache::new(100, FIVE_MINUTES, Duration::ZERO);
    assert!(!cache.is_purging());
}

#[test]
fn test_zero_ttl_is_not_found_immediately() {
    let cache: Cache<u32, u32> = Cache::new(100, FIVE_MINUTES, NO_EXPIRATION);
    cache.set_with_expire(1, 1, Duration::ZERO);

    assert_eq!(cache.get(&1), None);
    assert_eq!(cache.get_with_expiration(&1), None);
}

// == Capacity ==

#[test]
fn test_capacity_evicts_least_recently_used() {
    let cache: Cache<u32, u32> = Cache::new(3, NO_EXPIRATION, NO_EXPIRATION);
    let evicted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evicted);
    cache.on_evicted(move |_: &u32, _: &u32, cause| {
        assert_eq!(cause, RemovalCause::Capacity);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    cache.set(1, 1);
    cache.set(2, 2);
    cache.set(3, 3);
    cache.get(&1);
    cache.set(4, 4);

    assert_eq!(cache.len(), 3);
    assert!(cache.get(&2).is_none());
    assert!(cache.get(&1).is_some());
    assert_eq!(evicted.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().evictions, 1);
}

// == Configuration ==

#[test]
fn test_cache_from_config() {
    let config: CacheConfig =
        serde_json::from_str(r#"{"capacity": 5, "default_ttl_secs": 0, "cleanup_interval_secs": 0}"#)
            .unwrap();
    let cache: Cache<String, u32> = config.build();

    cache.set("k".to_string(), 1);

    assert_eq!(cache.capacity(), 5);
    assert_eq!(cache.get_with_expiration("k"), Some((1, None)));
}

// == Concurrency ==

#[test]
fn test_concurrent_readers_and_writers_with_purge() {
    let cache: Cache<u32, String> = Cache::new(500, NO_EXPIRATION, Duration::from_millis(5));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads as u32)
        .map(|t| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..2000u32 {
                    let key = (t * 31 + i) % 1000;
                    if i % 3 == 0 {
                        cache.set_with_expire(key, key.to_string(), Duration::from_millis(1));
                    } else {
                        cache.set(key, key.to_string());
                    }
                    // No read returns a value that was never written for that key
                    if let Some(value) = cache.get(&key) {
                        assert_eq!(value, key.to_string());
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= 500);
    let stats = cache.stats();
    assert!(stats.hits + stats.misses == threads as u64 * 2000);
}

#[test]
fn test_dropping_cache_from_another_thread() {
    let cache: Cache<u32, u32> = Cache::new(10, NO_EXPIRATION, Duration::from_millis(5));
    cache.set(1, 1);

    let clone = cache.clone();
    drop(cache);
    thread::spawn(move || {
        assert_eq!(clone.get(&1), Some(1));
        drop(clone);
    })
    .join()
    .unwrap();
}

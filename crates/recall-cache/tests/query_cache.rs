use std::thread::sleep;
use std::time::Duration;

use recall_cache::{fingerprint, CacheConfig, QueryCache};

#[test]
fn cache_hit_and_miss() {
    let mut cache: QueryCache<Vec<u32>> = QueryCache::default();
    let key = fingerprint(&[1.0, 0.0], 2);
    cache.insert(key.clone(), vec![1, 2]);

    assert_eq!(cache.lookup(&key), Some(vec![1, 2]));
    assert_eq!(cache.lookup("missing"), None);
}

#[test]
fn ttl_expired() {
    let mut cache = QueryCache::new(CacheConfig::new(Duration::from_millis(50), 10));
    cache.insert("key".to_string(), "expiring");
    assert_eq!(cache.lookup("key"), Some("expiring"));

    sleep(Duration::from_millis(100));

    assert_eq!(cache.lookup("key"), None);
    assert!(cache.is_empty(), "expired entries are purged on lookup");
}

#[test]
fn full_cache_evicts_oldest_entry() {
    let mut cache = QueryCache::new(CacheConfig::new(Duration::from_secs(60), 2));
    cache.insert("first".to_string(), 1);
    sleep(Duration::from_millis(2));
    cache.insert("second".to_string(), 2);
    sleep(Duration::from_millis(2));
    cache.insert("third".to_string(), 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.lookup("first"), None);
    assert_eq!(cache.lookup("second"), Some(2));
    assert_eq!(cache.lookup("third"), Some(3));
}

#[test]
fn reinserting_existing_key_does_not_evict() {
    let mut cache = QueryCache::new(CacheConfig::new(Duration::from_secs(60), 2));
    cache.insert("a".to_string(), 1);
    cache.insert("b".to_string(), 2);
    cache.insert("b".to_string(), 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.lookup("a"), Some(1));
    assert_eq!(cache.lookup("b"), Some(3));
}

#[test]
fn clear_removes_everything() {
    let mut cache = QueryCache::default();
    cache.insert("a".to_string(), 1);
    cache.insert("b".to_string(), 2);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.lookup("a"), None);
}

#[test]
fn config_deserializes_with_defaults() {
    let config: CacheConfig = serde_json::from_str(r#"{"max_entries": 16}"#).unwrap();
    assert_eq!(config.max_entries, 16);
    assert_eq!(config.ttl, Duration::from_secs(300));
}

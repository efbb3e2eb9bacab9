//! Cache round-trip, TTL, and compatibility parsing behavior.

use std::sync::Arc;
use std::time::Duration;

use gridshift::carbon::{CarbonCache, CarbonReading, KvStore, MemoryKvStore};

#[tokio::test]
async fn put_then_get_within_ttl_preserves_percentage() {
    let cache = CarbonCache::new(Arc::new(MemoryKvStore::new()), Duration::from_secs(3600));
    cache.put(&CarbonReading::new("FR", 85.0)).await.unwrap();

    let reading = cache.get("FR").await.expect("hit within TTL");
    assert_eq!(reading.low_carbon_percentage, 85.0);
    assert_eq!(reading.country_code, "FR");
}

#[tokio::test]
async fn get_after_ttl_expiry_is_absent() {
    let cache = CarbonCache::new(Arc::new(MemoryKvStore::new()), Duration::from_millis(30));
    cache.put(&CarbonReading::new("FR", 85.0)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(70)).await;
    assert!(cache.get("FR").await.is_none());
}

#[tokio::test]
async fn keys_are_per_country() {
    let cache = CarbonCache::new(Arc::new(MemoryKvStore::new()), Duration::from_secs(3600));
    cache.put(&CarbonReading::new("FR", 85.0)).await.unwrap();
    cache.put(&CarbonReading::new("DE", 40.0)).await.unwrap();

    assert_eq!(cache.get("FR").await.unwrap().low_carbon_percentage, 85.0);
    assert_eq!(cache.get("DE").await.unwrap().low_carbon_percentage, 40.0);
    assert!(cache.get("GB").await.is_none());
}

#[tokio::test]
async fn double_encoded_legacy_value_is_recovered() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let cache = CarbonCache::new(Arc::clone(&store), Duration::from_secs(3600));

    let reading = CarbonReading::new("ES", 63.0);
    let encoded_once = serde_json::to_string(&reading).unwrap();
    let encoded_twice = serde_json::to_string(&encoded_once).unwrap();
    store
        .put("ES", encoded_twice, Duration::from_secs(3600))
        .await
        .unwrap();

    let got = cache.get("ES").await.expect("compatibility parse");
    assert_eq!(got.low_carbon_percentage, 63.0);
}

#[tokio::test]
async fn corrupt_value_reads_as_miss() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let cache = CarbonCache::new(Arc::clone(&store), Duration::from_secs(3600));

    store
        .put("IT", "%%garbage%%".to_string(), Duration::from_secs(3600))
        .await
        .unwrap();
    assert!(cache.get("IT").await.is_none());
}

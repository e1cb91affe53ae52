use super::*;

#[tokio::test]
async fn get_missing_returns_none() {
    let store = MemoryAssetStore::default();
    assert!(store.get("global_asset/stamping").await.unwrap().is_none());
}

#[tokio::test]
async fn put_overwrites_whole_value() {
    let store = MemoryAssetStore::default();
    store.put("k", "first").await.unwrap();
    store.put("k", "second").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    assert_eq!(store.keys().await.unwrap(), vec!["k".to_string()]);
}

#[tokio::test]
async fn put_over_quota_fails_and_keeps_previous_value() {
    let store = MemoryAssetStore::new(20);
    store.put("a", "0123456789").await.unwrap();

    let err = store.put("b", "0123456789").await.unwrap_err();
    match err {
        StoreError::CapacityExceeded { required, quota } => {
            assert_eq!(required, 22);
            assert_eq!(quota, 20);
        }
        StoreError::Database(e) => panic!("unexpected database error: {e}"),
    }
    assert!(store.get("b").await.unwrap().is_none());
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("0123456789"));
}

#[tokio::test]
async fn overwrite_counts_new_value_instead_of_old() {
    let store = MemoryAssetStore::new(12);
    store.put("a", "0123456789").await.unwrap();
    // Same key: 1 + 11 = 12 fits, old value is not double counted.
    store.put("a", "01234567890").await.unwrap();
    assert_eq!(store.usage().await.unwrap().used_bytes, 12);
}

#[tokio::test]
async fn remove_frees_capacity() {
    let store = MemoryAssetStore::new(12);
    store.put("a", "0123456789").await.unwrap();
    assert!(store.put("b", "0123456789").await.is_err());
    assert!(store.remove("a").await.unwrap());
    assert!(!store.remove("a").await.unwrap());
    store.put("b", "0123456789").await.unwrap();
}

#[tokio::test]
async fn usage_reports_quota() {
    let store = MemoryAssetStore::new(1000);
    store.put("key", "value").await.unwrap();
    assert_eq!(store.usage().await.unwrap(), StoreUsage { used_bytes: 8, quota_bytes: 1000 });
}

#[test]
fn capacity_error_has_stable_code() {
    use crate::error::ErrorCode;
    let err = StoreError::CapacityExceeded { required: 10, quota: 5 };
    assert_eq!(err.error_code(), "E_CAPACITY_EXCEEDED");
    assert!(!err.retryable());
}

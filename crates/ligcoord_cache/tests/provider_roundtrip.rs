//! End-to-end exercise of [`ObjectStoreProvider`] against a real filesystem and an
//! in-memory object store fake: upload a directory, evict it from the cache, then
//! fetch it back through the tar archive path.

use ligcoord_cache::{ObjectStoreProvider, WeightCache};
use ligcoord_storage::InMemoryObjectStore;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn upload_then_evict_then_fetch_round_trips_through_tar() {
    let local_base = tempdir().unwrap();
    fs::create_dir_all(local_base.path().join("ag-job-1")).unwrap();
    fs::write(local_base.path().join("ag-job-1/model.bin"), b"weights").unwrap();

    let store = Arc::new(InMemoryObjectStore::new());
    let provider = Arc::new(ObjectStoreProvider::new(
        store.clone(),
        "weights-bucket",
        local_base.path(),
    ));
    let cache = WeightCache::new(provider, 4);

    cache.upload(1).await.unwrap();
    assert!(cache.contains(1).await);

    // Simulate the archived directory having been cleaned up locally (e.g. on a
    // different worker's filesystem) so the re-fetch must round-trip the tar.
    fs::remove_dir_all(local_base.path().join("ag-job-1")).unwrap();

    cache.remove(1).await;
    assert!(!cache.contains(1).await);

    let handle = cache.get(1).await.unwrap();
    let content = fs::read(handle.path().join("model.bin")).unwrap();
    assert_eq!(content, b"weights");
}

#[tokio::test]
async fn default_weight_fallback_seeds_a_fresh_job() {
    let local_base = tempdir().unwrap();
    let store = Arc::new(InMemoryObjectStore::new());
    store.seed("weights-bucket", "default.pth", b"default-bytes".to_vec());

    let provider = Arc::new(ObjectStoreProvider::new(
        store.clone(),
        "weights-bucket",
        local_base.path(),
    ));
    let cache = WeightCache::new(provider, 4);

    let handle = cache.get(7).await.unwrap();
    assert!(handle.path().ends_with("weight-7.pth"));
    assert_eq!(fs::read(handle.path()).unwrap(), b"default-bytes");

    // Subsequent reads hit the per-job key directly, without the fallback copy.
    let bytes = store.get_object("weights-bucket", "weight-7.pth").await.unwrap();
    assert_eq!(bytes, b"default-bytes");
}

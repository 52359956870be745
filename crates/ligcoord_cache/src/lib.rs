//! Bounded, refcounted LRU cache of model weight artifacts, backed by object storage.
//!
//! The upstream design dropped a cache mapping on eviction without deleting the
//! on-disk bytes, tolerating a worker reading stale-but-still-valid files out from
//! under the cache. This implementation closes that race instead: every live
//! [`WeightHandle`] pins its entry's refcount, and eviction only deletes filesystem
//! bytes once the refcount drops to zero.

mod provider;
pub mod testing;

pub use provider::{ObjectStoreProvider, WeightEntry, WeightProvider};

use ligcoord_protocol::CoordinatorError;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::warn;

struct CacheState {
    entries: HashMap<i64, WeightEntry>,
    /// Front = least-recently-used, back = most-recently-used.
    order: VecDeque<i64>,
}

/// A JSON-friendly view of one cache row, for the status HTTP endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WeightEntrySnapshot {
    pub job_id: i64,
    pub local_path: String,
    pub synced: bool,
    pub refcount: usize,
}

pub struct WeightCache {
    state: RwLock<CacheState>,
    refcounts: Mutex<HashMap<i64, usize>>,
    max_size: usize,
    provider: Arc<dyn WeightProvider>,
    provider_calls: AtomicUsize,
}

/// RAII guard returned by [`WeightCache::get`]. Releases the entry's refcount on
/// drop; if that drop brings the refcount to zero and the cache is over capacity,
/// the entry is reaped (mapping removed, filesystem bytes deleted).
pub struct WeightHandle {
    job_id: i64,
    local_path: PathBuf,
    cache: Arc<WeightCache>,
}

impl WeightHandle {
    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn path(&self) -> &Path {
        &self.local_path
    }
}

impl Drop for WeightHandle {
    fn drop(&mut self) {
        let reached_zero = {
            let mut counts = self.cache.refcounts.lock().unwrap();
            match counts.get_mut(&self.job_id) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count == 0
                }
                None => false,
            }
        };
        if reached_zero {
            // Best-effort: if the write lock is contended, a subsequent get/release
            // will reap this entry. Never block a drop on lock acquisition.
            if let Ok(mut state) = self.cache.state.try_write() {
                self.cache.evict_excess(&mut state);
            }
        }
    }
}

impl WeightCache {
    pub fn new(provider: Arc<dyn WeightProvider>, max_size: usize) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            refcounts: Mutex::new(HashMap::new()),
            max_size,
            provider,
            provider_calls: AtomicUsize::new(0),
        })
    }

    /// Number of times the provider has been invoked. Exposed for the single-flight
    /// relaxation test ("provider invoked at most N times for N racing callers").
    pub fn provider_call_count(&self) -> usize {
        self.provider_calls.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, job_id: i64) -> bool {
        self.state.read().await.entries.contains_key(&job_id)
    }

    /// On hit: promote to most-recently-used, pin, and return a handle. On miss:
    /// fetch via the provider (without holding the lock), insert, pin, and return a
    /// handle, evicting the least-recently-used zero-refcount entry first if that
    /// insertion pushes the cache over capacity.
    pub async fn get(self: &Arc<Self>, job_id: i64) -> Result<WeightHandle, CoordinatorError> {
        if let Some(handle) = self.try_promote(job_id).await {
            return Ok(handle);
        }

        self.provider_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.provider.fetch(job_id).await?;
        Ok(self.insert_and_pin(job_id, entry).await)
    }

    /// Read-lock fast path, re-checked under the write lock before promoting (no
    /// portable read-to-write lock upgrade), tolerating a redundant promotion if
    /// another task already moved `job_id` to the back of the order.
    async fn try_promote(self: &Arc<Self>, job_id: i64) -> Option<WeightHandle> {
        {
            let state = self.state.read().await;
            if !state.entries.contains_key(&job_id) {
                return None;
            }
        }

        let local_path = {
            let mut state = self.state.write().await;
            let local_path = state.entries.get(&job_id)?.local_path.clone();
            state.order.retain(|id| *id != job_id);
            state.order.push_back(job_id);
            local_path
        };

        self.pin(job_id);
        Some(WeightHandle {
            job_id,
            local_path,
            cache: self.clone(),
        })
    }

    async fn insert_and_pin(self: &Arc<Self>, job_id: i64, entry: WeightEntry) -> WeightHandle {
        let local_path = entry.local_path.clone();
        {
            let mut state = self.state.write().await;
            if state.entries.insert(job_id, entry).is_none() {
                state.order.push_back(job_id);
            } else {
                state.order.retain(|id| *id != job_id);
                state.order.push_back(job_id);
            }
        }
        self.pin(job_id);
        {
            let mut state = self.state.write().await;
            self.evict_excess(&mut state);
        }
        WeightHandle {
            job_id,
            local_path,
            cache: self.clone(),
        }
    }

    fn pin(&self, job_id: i64) {
        *self.refcounts.lock().unwrap().entry(job_id).or_insert(0) += 1;
    }

    fn refcount(&self, job_id: i64) -> usize {
        self.refcounts.lock().unwrap().get(&job_id).copied().unwrap_or(0)
    }

    /// Evict least-recently-used zero-refcount entries until the cache is back at
    /// or under capacity. If every entry at or above capacity is still pinned, logs
    /// a warning and leaves the cache transiently over capacity rather than
    /// evicting bytes a worker may still be reading.
    fn evict_excess(&self, state: &mut CacheState) {
        while state.entries.len() > self.max_size {
            let victim = state
                .order
                .iter()
                .find(|id| self.refcount(**id) == 0)
                .copied();

            match victim {
                Some(id) => {
                    state.order.retain(|x| *x != id);
                    if let Some(entry) = state.entries.remove(&id) {
                        if let Err(err) = remove_artifact(&entry.local_path) {
                            warn!(job_id = id, %err, "failed to delete evicted weight artifact");
                        }
                    }
                }
                None => {
                    warn!(
                        size = state.entries.len(),
                        max_size = self.max_size,
                        "weight cache over capacity with no evictable entry (all pinned)"
                    );
                    break;
                }
            }
        }
    }

    /// Directly install an entry (used after [`WeightCache::upload`]), starting at
    /// refcount 0 until the next `get`.
    pub async fn add(self: &Arc<Self>, job_id: i64, entry: WeightEntry) {
        {
            let mut state = self.state.write().await;
            if state.entries.insert(job_id, entry).is_none() {
                state.order.push_back(job_id);
            } else {
                state.order.retain(|id| *id != job_id);
                state.order.push_back(job_id);
            }
        }
        let mut state = self.state.write().await;
        self.evict_excess(&mut state);
    }

    /// Replace an entry in place. If `job_id` wasn't already present, it's
    /// appended to the LRU order as most-recently-used, same as `add`/`sync`.
    pub async fn update(&self, job_id: i64, entry: WeightEntry) {
        let mut state = self.state.write().await;
        if state.entries.insert(job_id, entry).is_none() {
            state.order.push_back(job_id);
        }
    }

    /// Force a refetch via the provider. On success, replaces the entry; on
    /// failure, the prior entry (if any) is left untouched.
    pub async fn sync(self: &Arc<Self>, job_id: i64) -> Result<(), CoordinatorError> {
        self.provider_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.provider.fetch(job_id).await?;
        let mut state = self.state.write().await;
        if state.entries.insert(job_id, entry).is_none() {
            state.order.push_back(job_id);
        }
        Ok(())
    }

    /// Remove an entry and delete its on-disk bytes, unless it is still pinned by
    /// an outstanding [`WeightHandle`] — in which case it is left alone and a
    /// warning is logged (eviction must never pull weights out from under a busy
    /// worker).
    pub async fn remove(&self, job_id: i64) {
        if self.refcount(job_id) > 0 {
            warn!(job_id, "refusing to remove a pinned weight cache entry");
            return;
        }
        let mut state = self.state.write().await;
        state.order.retain(|id| *id != job_id);
        if let Some(entry) = state.entries.remove(&job_id) {
            if let Err(err) = remove_artifact(&entry.local_path) {
                warn!(job_id, %err, "failed to delete removed weight artifact");
            }
        }
    }

    /// Remove every unpinned entry. Pinned entries are left in place, matching
    /// [`WeightCache::remove`]'s pinned-entry behavior.
    pub async fn clear(&self) {
        let job_ids: Vec<i64> = {
            let state = self.state.read().await;
            state.entries.keys().copied().collect()
        };
        for job_id in job_ids {
            self.remove(job_id).await;
        }
    }

    /// Archive the job's local weight directory, push it to object storage, and
    /// install the resulting entry in the cache.
    pub async fn upload(self: &Arc<Self>, job_id: i64) -> Result<(), CoordinatorError> {
        let entry = self.provider.upload(job_id).await?;
        self.add(job_id, entry).await;
        Ok(())
    }

    /// A snapshot of the cache's current contents, for the status HTTP endpoint.
    pub async fn snapshot(&self) -> HashMap<i64, WeightEntrySnapshot> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .map(|(job_id, entry)| {
                (
                    *job_id,
                    WeightEntrySnapshot {
                        job_id: *job_id,
                        local_path: entry.local_path.display().to_string(),
                        synced: entry.synced,
                        refcount: self.refcount(*job_id),
                    },
                )
            })
            .collect()
    }

    #[cfg(test)]
    async fn order_snapshot(&self) -> Vec<i64> {
        self.state.read().await.order.iter().copied().collect()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

fn remove_artifact(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else if path.exists() {
        std::fs::remove_file(path)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWeightProvider;

    fn cache_with(max_size: usize) -> Arc<WeightCache> {
        WeightCache::new(Arc::new(FakeWeightProvider::new()), max_size)
    }

    #[tokio::test]
    async fn cold_get_inserts_and_pins() {
        let cache = cache_with(2);
        let handle = cache.get(1).await.unwrap();
        assert_eq!(handle.job_id(), 1);
        assert!(cache.contains(1).await);
    }

    #[tokio::test]
    async fn repeat_get_is_a_hit_and_promotes() {
        let cache = cache_with(2);
        let h1 = cache.get(1).await.unwrap();
        drop(h1);
        let _h2 = cache.get(1).await.unwrap();
        assert_eq!(cache.provider_call_count(), 1);
    }

    #[tokio::test]
    async fn capacity_overflow_evicts_lru_front() {
        let cache = cache_with(2);
        drop(cache.get(1).await.unwrap());
        drop(cache.get(2).await.unwrap());
        assert_eq!(cache.order_snapshot().await, vec![1, 2]);

        drop(cache.get(3).await.unwrap());
        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains(1).await);
        assert_eq!(cache.order_snapshot().await, vec![2, 3]);

        drop(cache.get(2).await.unwrap());
        assert_eq!(cache.order_snapshot().await, vec![3, 2]);
    }

    #[tokio::test]
    async fn pinned_entry_survives_capacity_pressure() {
        let cache = cache_with(1);
        let held = cache.get(1).await.unwrap();
        // job 2 pushes the cache over capacity, but job 1 is still pinned.
        drop(cache.get(2).await.unwrap());
        assert!(cache.contains(1).await);
        drop(held);
    }

    #[tokio::test]
    async fn max_size_zero_returns_to_empty_after_handle_drop() {
        let cache = cache_with(0);
        let handle = cache.get(1).await.unwrap();
        assert_eq!(cache.len().await, 1);
        drop(handle);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn loaded_invariant_cache_contains_after_get() {
        let cache = cache_with(4);
        let handle = cache.get(7).await.unwrap();
        assert!(cache.contains(handle.job_id()).await);
    }

    #[tokio::test]
    async fn update_replaces_an_existing_entry_without_disturbing_order() {
        let cache = cache_with(4);
        drop(cache.get(1).await.unwrap());
        drop(cache.get(2).await.unwrap());

        cache.update(1, WeightEntry {
            job_id: 1,
            local_path: PathBuf::from("weights/weight-1-replaced.pth"),
            synced: true,
        })
        .await;

        assert_eq!(cache.order_snapshot().await, vec![1, 2]);
        let snapshot = cache.snapshot().await;
        assert_eq!(
            snapshot.get(&1).unwrap().local_path,
            "weights/weight-1-replaced.pth"
        );
    }

    #[tokio::test]
    async fn update_on_an_absent_key_appends_to_lru_order() {
        let cache = cache_with(4);
        cache.update(9, WeightEntry {
            job_id: 9,
            local_path: PathBuf::from("weights/weight-9.pth"),
            synced: true,
        })
        .await;

        assert_eq!(cache.order_snapshot().await, vec![9]);
        assert!(cache.contains(9).await);
    }

    #[tokio::test]
    async fn sync_failure_preserves_prior_entry() {
        let cache = WeightCache::new(Arc::new(FakeWeightProvider::new().failing_sync()), 4);
        drop(cache.get(1).await.unwrap());
        let err = cache.sync(1).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::TransientRemote(_)));
        assert!(cache.contains(1).await);
    }

    #[tokio::test]
    async fn upload_adds_synced_entry() {
        let cache = cache_with(4);
        cache.upload(9).await.unwrap();
        let snapshot = cache.snapshot().await;
        assert!(snapshot.get(&9).unwrap().synced);
    }
}

//! Per-job mutual exclusion.
//!
//! Kafka delivers at-least-once, so the same `job_id` can arrive twice and land on
//! two different workers racing over the same `csv/{id}_*.csv` / `weights/ag-job-{id}`
//! paths. A keyed lock serializes processing of a given `job_id`: the second
//! delivery blocks behind the first and, once it proceeds, observes the first's
//! final DB state (duplicate processing becomes merely wasted work, not corruption).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct JobLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one worker's processing of a `job_id`. Dropping it
/// releases the lock; if no other task is waiting on (or holding) the same
/// `job_id`'s entry, the map entry is also reclaimed.
pub struct JobLockGuard {
    job_id: i64,
    locks: Arc<JobLocks>,
    _guard: OwnedMutexGuard<()>,
}

impl JobLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn acquire(self: &Arc<Self>, job_id: i64) -> JobLockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks.entry(job_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        let guard = lock.lock_owned().await;
        JobLockGuard {
            job_id,
            locks: self.clone(),
            _guard: guard,
        }
    }
}

impl Drop for JobLockGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.locks.lock().unwrap();
        if let Some(entry) = locks.get(&self.job_id) {
            // `self._guard` is still alive at this point (dropped after this fn
            // returns), so the count here is: this guard's Arc + the map's Arc.
            if Arc::strong_count(entry) <= 2 {
                locks.remove(&self.job_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_job_id_serializes() {
        let locks = JobLocks::new();
        let concurrent = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let locks = locks.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(42).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_job_ids_do_not_block_each_other() {
        let locks = JobLocks::new();
        let g1 = locks.acquire(1).await;
        // A distinct job_id must not block on job 1's held lock.
        let g2 = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(g2.is_ok());
        drop(g1);
        drop(g2);
    }
}

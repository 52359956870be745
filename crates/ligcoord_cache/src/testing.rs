//! An in-memory [`WeightProvider`] fake for cache and worker tests, backed by
//! [`tempfile::TempDir`]-free synthetic paths (no real filesystem or object-store
//! round trips).

use crate::{WeightEntry, WeightProvider};
use async_trait::async_trait;
use ligcoord_protocol::CoordinatorError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeWeightProvider {
    fail_fetch: bool,
    fail_sync: bool,
    fetch_calls: AtomicUsize,
}

impl FakeWeightProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_sync(mut self) -> Self {
        self.fail_sync = true;
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeightProvider for FakeWeightProvider {
    async fn fetch(&self, job_id: i64) -> Result<WeightEntry, CoordinatorError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch || (self.fail_sync && self.fetch_calls.load(Ordering::SeqCst) > 1) {
            return Err(CoordinatorError::transient_remote("fake provider fetch failure"));
        }
        Ok(WeightEntry {
            job_id,
            local_path: PathBuf::from(format!("weights/weight-{job_id}.pth")),
            synced: true,
        })
    }

    async fn upload(&self, job_id: i64) -> Result<WeightEntry, CoordinatorError> {
        Ok(WeightEntry {
            job_id,
            local_path: PathBuf::from(format!("weights/ag-job-{job_id}")),
            synced: true,
        })
    }
}

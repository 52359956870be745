//! The worker status enum and the handle other components use to read it.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Loaded,
    Busy,
}

#[derive(Debug)]
pub(crate) struct WorkerRuntimeState {
    pub status: WorkerStatus,
    pub loaded_job_id: Option<i64>,
}

/// A cheap, cloneable read-only view of one worker's live state — what the
/// manager's registry and the status HTTP endpoint hold, without pulling in the
/// worker's executor/cache/db handles.
#[derive(Clone)]
pub struct WorkerHandle {
    id: usize,
    pub(crate) state: Arc<RwLock<WorkerRuntimeState>>,
}

/// JSON view of a worker, for `GET /torch-worker-status`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatusSnapshot {
    pub id: usize,
    pub status: WorkerStatus,
    pub loaded_job_id: Option<i64>,
}

impl WorkerHandle {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            state: Arc::new(RwLock::new(WorkerRuntimeState {
                status: WorkerStatus::Idle,
                loaded_job_id: None,
            })),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub async fn status(&self) -> WorkerStatus {
        self.state.read().await.status
    }

    pub async fn loaded_job_id(&self) -> Option<i64> {
        self.state.read().await.loaded_job_id
    }

    pub async fn snapshot(&self) -> WorkerStatusSnapshot {
        let state = self.state.read().await;
        WorkerStatusSnapshot {
            id: self.id,
            status: state.status,
            loaded_job_id: state.loaded_job_id,
        }
    }
}

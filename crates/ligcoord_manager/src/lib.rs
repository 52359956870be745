//! Worker registry and the shared bounded job queue.
//!
//! The manager owns the one queue every worker task drains from and the
//! registry of [`WorkerHandle`]s the status API reads. It does not own workers
//! themselves — the binary spawns a [`ligcoord_worker::Worker::run`] task per
//! executor, handing each the same [`Manager::receiver`] and [`Manager::job_locks`]
//! so all of them pull from one queue and serialize on duplicate `job_id`s.

use ligcoord_protocol::CoordinatorError;
use ligcoord_worker::{JobDescriptor, JobLocks, WorkerHandle, WorkerStatusSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::warn;

/// `EnqueueJob` blocks once this many jobs are queued and unclaimed — a
/// worker must drain one before the next submission proceeds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

pub struct Manager {
    workers: AsyncMutex<Vec<WorkerHandle>>,
    sender: mpsc::Sender<JobDescriptor>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<JobDescriptor>>>,
    job_locks: Arc<JobLocks>,
}

impl Manager {
    pub fn new(queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        Self {
            workers: AsyncMutex::new(Vec::new()),
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            job_locks: JobLocks::new(),
        }
    }

    /// The receiving half every worker task shares, each taking the lock only
    /// long enough to pull its next job.
    pub fn receiver(&self) -> Arc<AsyncMutex<mpsc::Receiver<JobDescriptor>>> {
        self.receiver.clone()
    }

    /// The per-job keyed lock every worker acquires before processing a job,
    /// so duplicate deliveries of the same `job_id` serialize instead of race.
    pub fn job_locks(&self) -> Arc<JobLocks> {
        self.job_locks.clone()
    }

    /// Registers a worker for status reporting. Workers are only ever added at
    /// startup in the current design; there is no corresponding removal.
    pub async fn register(&self, handle: WorkerHandle) {
        self.workers.lock().await.push(handle);
    }

    /// Submits a job to the shared queue, awaiting capacity if all
    /// `queue_capacity` slots are occupied by jobs no worker has claimed yet.
    pub async fn enqueue(&self, job: JobDescriptor) -> Result<(), CoordinatorError> {
        self.sender.send(job).await.map_err(|_| {
            CoordinatorError::transient_remote("job queue is closed, no workers can accept work")
        })
    }

    /// Snapshot of every registered worker, for `GET /torch-worker-status`.
    pub async fn worker_snapshots(&self) -> Vec<WorkerStatusSnapshot> {
        let workers = self.workers.lock().await;
        let mut snapshots = Vec::with_capacity(workers.len());
        for worker in workers.iter() {
            snapshots.push(worker.snapshot().await);
        }
        snapshots
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }
}

impl Default for Manager {
    fn default() -> Self {
        let manager = Self::new(DEFAULT_QUEUE_CAPACITY);
        warn!(
            capacity = DEFAULT_QUEUE_CAPACITY,
            "manager constructed with default queue capacity"
        );
        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ligcoord_cache::{testing::FakeWeightProvider, WeightCache};
    use ligcoord_db::InMemoryExperimentStore;
    use ligcoord_executor::testing::FakeExecutorClient;
    use ligcoord_worker::{JobDescriptor, Worker};
    use std::time::Duration;
    use tempfile::tempdir;

    fn spawn_worker(manager: &Manager, id: usize, db: Arc<InMemoryExperimentStore>) {
        let cache = WeightCache::new(Arc::new(FakeWeightProvider::new()), 4);
        let csv_dir = tempdir().unwrap();
        // Leaked on purpose: the tempdir only needs to outlive the spawned task
        // in these tests, which outlive the test function itself.
        let csv_path = csv_dir.keep();
        let (worker, _handle) = Worker::new(
            id,
            Arc::new(FakeExecutorClient::new()),
            cache,
            db,
            csv_path,
            manager.job_locks(),
        );
        tokio::spawn(worker.run(manager.receiver()));
    }

    #[tokio::test]
    async fn registers_workers_for_status_reporting() {
        let manager = Manager::new(DEFAULT_QUEUE_CAPACITY);
        let (_worker, handle) = Worker::new(
            0,
            Arc::new(FakeExecutorClient::new()),
            WeightCache::new(Arc::new(FakeWeightProvider::new()), 4),
            Arc::new(InMemoryExperimentStore::new()),
            tempdir().unwrap().keep(),
            manager.job_locks(),
        );
        manager.register(handle).await;

        assert_eq!(manager.worker_count().await, 1);
        let snapshots = manager.worker_snapshots().await;
        assert_eq!(snapshots[0].id, 0);
    }

    #[tokio::test]
    async fn enqueue_blocks_until_a_worker_drains_the_queue() {
        let manager = Arc::new(Manager::new(1));
        spawn_worker(&manager, 0, Arc::new(InMemoryExperimentStore::new()));

        // Fill the one slot with a job the worker will pick up and process
        // (fast, since the fake executor is instant and the DB has nothing to do).
        let (job1, _rendezvous1) = JobDescriptor::process(1);
        manager.enqueue(job1).await.unwrap();

        // A second enqueue should succeed promptly once the worker drains the
        // first — it must not hang past a generous timeout.
        let (job2, _rendezvous2) = JobDescriptor::process(2);
        let result = tokio::time::timeout(Duration::from_secs(2), manager.enqueue(job2)).await;
        assert!(result.is_ok(), "enqueue should unblock once a worker drains the queue");
    }

    #[tokio::test]
    async fn duplicate_job_id_serializes_across_workers() {
        let manager = Arc::new(Manager::new(DEFAULT_QUEUE_CAPACITY));
        let db = Arc::new(InMemoryExperimentStore::new());
        spawn_worker(&manager, 0, db.clone());
        spawn_worker(&manager, 1, db);

        let (job_a, rendezvous_a) = JobDescriptor::process(99);
        let (job_b, rendezvous_b) = JobDescriptor::process(99);
        manager.enqueue(job_a).await.unwrap();
        manager.enqueue(job_b).await.unwrap();

        let err_a = tokio::time::timeout(Duration::from_secs(2), rendezvous_a.error_rx)
            .await
            .unwrap()
            .unwrap();
        let err_b = tokio::time::timeout(Duration::from_secs(2), rendezvous_b.error_rx)
            .await
            .unwrap()
            .unwrap();
        // Neither job has untested rows to process (no DB seeding), so both
        // finish without error; what this test guards is that both complete at
        // all within the timeout, i.e. the keyed lock serializes rather than
        // deadlocks the two deliveries against each other.
        assert!(err_a.is_none());
        assert!(err_b.is_none());
    }
}

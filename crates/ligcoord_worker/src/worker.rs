//! Drives one executor through its job lifecycle.
//!
//! A `Worker` is moved into its own task and driven exclusively by [`Worker::run`] —
//! every operation below is invoked from that single task, never concurrently, so
//! `loaded_job_id` and the currently-pinned weight handle need no internal lock of
//! their own (only the shared [`WorkerHandle`] status view is synchronized, for
//! readers outside the task).

use crate::job::JobDescriptor;
use crate::locks::JobLocks;
use crate::status::{WorkerHandle, WorkerStatus};
use ligcoord_cache::{WeightCache, WeightHandle};
use ligcoord_db::ExperimentStore;
use ligcoord_executor::ExecutorClient;
use ligcoord_protocol::{CoordinatorError, InitialLigand, JobKind, TrainingStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct Worker {
    id: usize,
    handle: WorkerHandle,
    executor: Arc<dyn ExecutorClient>,
    cache: Arc<WeightCache>,
    db: Arc<dyn ExperimentStore>,
    csv_base_dir: PathBuf,
    job_locks: Arc<JobLocks>,
    /// The weight handle backing `loaded_job_id`, kept alive so the cache can
    /// never evict the bytes this worker's executor currently has loaded.
    current_weight: Option<WeightHandle>,
}

impl Worker {
    pub fn new(
        id: usize,
        executor: Arc<dyn ExecutorClient>,
        cache: Arc<WeightCache>,
        db: Arc<dyn ExperimentStore>,
        csv_base_dir: impl Into<PathBuf>,
        job_locks: Arc<JobLocks>,
    ) -> (Self, WorkerHandle) {
        let handle = WorkerHandle::new(id);
        let worker = Self {
            id,
            handle: handle.clone(),
            executor,
            cache,
            db,
            csv_base_dir: csv_base_dir.into(),
            job_locks,
            current_weight: None,
        };
        (worker, handle)
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Receive-loop: take the shared queue's lock, block on the next descriptor,
    /// release the lock, and drive it to completion before looping. A closed
    /// channel (queue dropped, e.g. during shutdown) ends the loop.
    pub async fn run(mut self, queue: Arc<tokio::sync::Mutex<mpsc::Receiver<JobDescriptor>>>) {
        loop {
            let job = {
                let mut receiver = queue.lock().await;
                receiver.recv().await
            };
            let Some(job) = job else {
                info!(worker_id = self.id, "job queue closed, worker shutting down");
                break;
            };
            self.handle_job(job).await;
        }
    }

    async fn set_status(&self, status: WorkerStatus) {
        self.handle.state.write().await.status = status;
    }

    async fn handle_job(&mut self, job: JobDescriptor) {
        self.set_status(WorkerStatus::Busy).await;
        let JobDescriptor {
            job_id,
            kind,
            protein_data,
            target_value,
            initial_ligands,
            result_tx,
            error_tx,
        } = job;

        // A duplicate delivery of the same job_id may have landed on another
        // worker; block until its processing finishes rather than racing it
        // over the same csv/weights paths.
        let _job_guard = self.job_locks.acquire(job_id).await;

        let (next_status, err) = match kind {
            JobKind::Process => (WorkerStatus::Idle, self.process(job_id).await.err()),
            JobKind::Inference => {
                let protein_data = protein_data.unwrap_or_default();
                match self.inference(job_id, &protein_data).await {
                    Ok(value) => {
                        let _ = result_tx.send(value);
                        (WorkerStatus::Loaded, None)
                    }
                    Err(err) => (WorkerStatus::Loaded, Some(err)),
                }
            }
            JobKind::Train => {
                let protein_data = protein_data.unwrap_or_default();
                let target = target_value.unwrap_or_default();
                (WorkerStatus::Loaded, self.train(job_id, &protein_data, target).await.err())
            }
            JobKind::Initialize => {
                let ligands = initial_ligands.unwrap_or_default();
                (WorkerStatus::Loaded, self.initialize(job_id, &ligands).await.err())
            }
        };

        self.set_status(next_status).await;
        if let Some(err) = &err {
            warn!(job_id, %err, "job failed");
        }
        let _ = error_tx.send(err);
    }

    /// `process(job_id)`: read ligands, mark untested rows running, write the CSV
    /// pair, invoke the executor, write predictions back, mark done. Any step's
    /// failure returns immediately; earlier effects (CSVs written, status=Running,
    /// partial predictions) are not rolled back — rerunning is idempotent by row.
    pub async fn process(&mut self, job_id: i64) -> Result<(), CoordinatorError> {
        let (tested, untested) = self.db.fetch_experiments(job_id).await?;
        self.db
            .set_training_status(job_id, TrainingStatus::Running)
            .await?;

        let train_path = self.csv_base_dir.join(format!("{job_id}_train.csv"));
        let test_path = self.csv_base_dir.join(format!("{job_id}_test.csv"));
        let csv_base_dir = self.csv_base_dir.clone();
        let (write_train_path, write_test_path) = (train_path.clone(), test_path.clone());
        tokio::task::spawn_blocking(move || -> Result<(), CoordinatorError> {
            std::fs::create_dir_all(&csv_base_dir)
                .map_err(|err| CoordinatorError::persistence(format!("failed to create csv dir: {err}")))?;
            ligcoord_csv::write_train_csv(&write_train_path, &tested)?;
            ligcoord_csv::write_test_csv(&write_test_path, &untested)?;
            Ok(())
        })
        .await
        .map_err(|err| CoordinatorError::persistence(format!("csv write task panicked: {err}")))??;

        self.executor
            .process(&train_path.to_string_lossy(), &test_path.to_string_lossy())
            .await?;

        let read_test_path = test_path.clone();
        let predictions = tokio::task::spawn_blocking(move || ligcoord_csv::read_predictions(&read_test_path))
            .await
            .map_err(|err| CoordinatorError::persistence(format!("csv read task panicked: {err}")))??;
        for (smiles, value) in predictions {
            self.db.set_predicted_value(job_id, &smiles, value).await?;
        }

        self.db.set_training_status(job_id, TrainingStatus::Done).await?;
        Ok(())
    }

    /// `load(job_id)`: fetch the weight handle, tell the executor to load it, and
    /// on success keep the handle alive (dropping whichever handle was previously
    /// pinned, releasing its refcount) and record `loaded_job_id`.
    pub async fn load(&mut self, job_id: i64) -> Result<(), CoordinatorError> {
        let handle = self.cache.get(job_id).await?;
        self.executor.load(&handle.path().to_string_lossy()).await?;
        self.current_weight = Some(handle);
        self.handle.state.write().await.loaded_job_id = Some(job_id);
        Ok(())
    }

    /// `load` iff the executor doesn't already have `job_id`'s weights resident.
    pub async fn ensure_loaded(&mut self, job_id: i64) -> Result<(), CoordinatorError> {
        let already_loaded = self.handle.state.read().await.loaded_job_id == Some(job_id);
        if already_loaded {
            return Ok(());
        }
        self.load(job_id).await
    }

    pub async fn inference(&mut self, job_id: i64, protein_data: &str) -> Result<f64, CoordinatorError> {
        self.ensure_loaded(job_id).await?;
        self.executor.inference(protein_data).await
    }

    pub async fn train(
        &mut self,
        job_id: i64,
        protein_data: &str,
        target_value: f64,
    ) -> Result<(), CoordinatorError> {
        self.ensure_loaded(job_id).await?;
        self.executor.train(protein_data, target_value).await
    }

    /// `initialize(job_id, ligands)`: seed the executor with the initial ligand
    /// set, archive and upload the resulting weights, then load them so the
    /// executor is immediately ready for inference/training on this job.
    pub async fn initialize(
        &mut self,
        job_id: i64,
        initial_ligands: &[InitialLigand],
    ) -> Result<(), CoordinatorError> {
        self.executor.initialize(job_id, initial_ligands).await?;
        self.cache.upload(job_id).await?;
        self.load(job_id).await
    }
}

//! Fetches and uploads that materialize weight artifacts on the local filesystem,
//! called by [`crate::WeightCache`] without its lock held.

use async_trait::async_trait;
use ligcoord_protocol::CoordinatorError;
use ligcoord_storage::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;

/// A local materialization of a model's weights, plus whether the in-memory entry
/// reflects what's currently in object storage.
#[derive(Debug, Clone)]
pub struct WeightEntry {
    pub job_id: i64,
    pub local_path: PathBuf,
    pub synced: bool,
}

/// Mediates between the cache and object storage. Split out from [`crate::WeightCache`]
/// so tests can substitute a fake that never touches a real bucket or filesystem.
#[async_trait]
pub trait WeightProvider: Send + Sync {
    /// Materialize weights for `job_id` on the local filesystem, trying the
    /// directory archive first and falling back to the single-file default weight.
    async fn fetch(&self, job_id: i64) -> Result<WeightEntry, CoordinatorError>;

    /// Archive the job's local weight directory and push it to object storage,
    /// returning the entry that should replace the cache's mapping for `job_id`.
    async fn upload(&self, job_id: i64) -> Result<WeightEntry, CoordinatorError>;
}

/// The production [`WeightProvider`]: S3-compatible object storage plus the tar
/// archive codec, rooted at a local `weights/` directory.
pub struct ObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    local_base: PathBuf,
}

impl ObjectStoreProvider {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, local_base: impl Into<PathBuf>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            local_base: local_base.into(),
        }
    }

    fn job_dir(&self, job_id: i64) -> PathBuf {
        self.local_base.join(format!("ag-job-{job_id}"))
    }

    fn single_weight_path(&self, job_id: i64) -> PathBuf {
        self.local_base.join(format!("weight-{job_id}.pth"))
    }
}

fn io_err(context: &str, err: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::archive(format!("{context}: {err}"))
}

/// Runs a blocking filesystem/tar closure on the blocking thread pool: async
/// only where truly needed, sync for blocking I/O. `spawn_blocking` only fails
/// if the closure panics, which these closures don't do (they return `Result`),
/// so the join error is folded into an `Archive` error rather than threaded
/// through as its own variant.
async fn blocking<F, T>(f: F) -> Result<T, CoordinatorError>
where
    F: FnOnce() -> Result<T, CoordinatorError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| io_err("blocking filesystem task panicked", err))?
}

#[async_trait]
impl WeightProvider for ObjectStoreProvider {
    async fn fetch(&self, job_id: i64) -> Result<WeightEntry, CoordinatorError> {
        let tar_key = format!("ag-job-{job_id}.tar");
        match self.store.get_object(&self.bucket, &tar_key).await {
            Ok(bytes) => {
                let dest = self.job_dir(job_id);
                let extract_dest = dest.clone();
                blocking(move || ligcoord_archive::extract_tar(&bytes, &extract_dest)).await?;
                return Ok(WeightEntry {
                    job_id,
                    local_path: dest,
                    synced: true,
                });
            }
            Err(CoordinatorError::NotFound(_)) => {
                // No trained checkpoint yet for this job; fall through to the
                // single-file default-weight path.
            }
            Err(err) => return Err(err),
        }

        let weight_key = format!("weight-{job_id}.pth");
        let bytes = match self.store.get_object(&self.bucket, &weight_key).await {
            Ok(bytes) => bytes,
            Err(CoordinatorError::NotFound(_)) => {
                let default_bytes = self.store.get_object(&self.bucket, "default.pth").await?;
                self.store
                    .copy_object(&self.bucket, "default.pth", &self.bucket, &weight_key)
                    .await?;
                default_bytes
            }
            Err(err) => return Err(err),
        };

        let dest = self.single_weight_path(job_id);
        let write_dest = dest.clone();
        blocking(move || {
            if let Some(parent) = write_dest.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| io_err("failed to create weights dir", err))?;
            }
            std::fs::write(&write_dest, &bytes).map_err(|err| io_err("failed to write weight file", err))
        })
        .await?;

        Ok(WeightEntry {
            job_id,
            local_path: dest,
            synced: true,
        })
    }

    async fn upload(&self, job_id: i64) -> Result<WeightEntry, CoordinatorError> {
        let dir = self.job_dir(job_id);
        let archive_dir = dir.clone();
        let bytes = blocking(move || ligcoord_archive::archive_dir(&archive_dir)).await?;
        let key = format!("ag-job-{job_id}.tar");
        self.store.put_object(&self.bucket, &key, bytes).await?;
        Ok(WeightEntry {
            job_id,
            local_path: dir,
            synced: true,
        })
    }
}

//! Typed Postgres client for the `experiment` table.
//!
//! All writes are `UPDATE`s keyed by primary key (`job_id`) or the unique
//! `(job_id, ligand_smiles)` pair, so retrying a failed job is idempotent at the row
//! level per the worker's recovery contract.

mod memory;
mod postgres;

pub use memory::InMemoryExperimentStore;
pub use postgres::PgExperimentStore;

use async_trait::async_trait;
use ligcoord_protocol::{CoordinatorError, Ligand, TrainingStatus};

/// Typed reads/writes for experiment rows, behind a trait so the worker can be
/// tested against an in-memory fake instead of a live Postgres instance.
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Read a job's ligands, split into tested (measured) and untested (awaiting
    /// prediction) sets, in the order the underlying store returns them.
    async fn fetch_experiments(
        &self,
        job_id: i64,
    ) -> Result<(Vec<Ligand>, Vec<Ligand>), CoordinatorError>;

    /// Set `training_status` for every `Untested` row of a job.
    async fn set_training_status(
        &self,
        job_id: i64,
        status: TrainingStatus,
    ) -> Result<(), CoordinatorError>;

    /// Set `predicted_value` for the row identified by `(job_id, ligand_smiles)`.
    async fn set_predicted_value(
        &self,
        job_id: i64,
        ligand_smiles: &str,
        value: f64,
    ) -> Result<(), CoordinatorError>;
}

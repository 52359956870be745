//! `sqlx`-backed [`crate::ExperimentStore`] against a live Postgres `experiment` table.

use crate::ExperimentStore;
use async_trait::async_trait;
use ligcoord_protocol::{CoordinatorError, ExperimentKind, ExperimentRow, Ligand, TrainingStatus};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

fn persistence_err(context: &str, err: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::persistence(format!("{context}: {err}"))
}

pub struct PgExperimentStore {
    pool: PgPool,
}

impl PgExperimentStore {
    /// Connect to Postgres, sized to a small pool appropriate for a single
    /// coordinator instance.
    pub async fn connect(connection_string: &str) -> Result<Self, CoordinatorError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|err| persistence_err("failed to connect to postgres", err))?;
        Ok(Self { pool })
    }

    /// Wrap an already-constructed pool (used by tests against a real Postgres
    /// instance when one is available).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExperimentStore for PgExperimentStore {
    async fn fetch_experiments(
        &self,
        job_id: i64,
    ) -> Result<(Vec<Ligand>, Vec<Ligand>), CoordinatorError> {
        let rows: Vec<ExperimentRow> = sqlx::query_as(
            r#"
            SELECT job_id, ligand_smiles, measured_value, predicted_value, kind, training_status
            FROM experiment
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| persistence_err("failed to fetch experiment rows", err))?;

        let mut tested = Vec::new();
        let mut untested = Vec::new();
        for row in rows {
            match row.kind {
                ExperimentKind::Tested => tested.push(Ligand::tested(
                    row.ligand_smiles,
                    row.measured_value.ok_or_else(|| {
                        persistence_err(
                            "tested experiment row missing measured_value",
                            &row.job_id,
                        )
                    })?,
                )),
                ExperimentKind::Untested => untested.push(Ligand::untested(row.ligand_smiles)),
            }
        }

        debug!(job_id, tested = tested.len(), untested = untested.len(), "fetched experiments");
        Ok((tested, untested))
    }

    async fn set_training_status(
        &self,
        job_id: i64,
        status: TrainingStatus,
    ) -> Result<(), CoordinatorError> {
        sqlx::query(
            r#"
            UPDATE experiment
            SET training_status = $1
            WHERE job_id = $2 AND kind = $3
            "#,
        )
        .bind(status)
        .bind(job_id)
        .bind(ExperimentKind::Untested)
        .execute(&self.pool)
        .await
        .map_err(|err| persistence_err("failed to update training_status", err))?;
        Ok(())
    }

    async fn set_predicted_value(
        &self,
        job_id: i64,
        ligand_smiles: &str,
        value: f64,
    ) -> Result<(), CoordinatorError> {
        sqlx::query(
            r#"
            UPDATE experiment
            SET predicted_value = $1
            WHERE job_id = $2 AND ligand_smiles = $3
            "#,
        )
        .bind(value)
        .bind(job_id)
        .bind(ligand_smiles)
        .execute(&self.pool)
        .await
        .map_err(|err| persistence_err("failed to update predicted_value", err))?;
        Ok(())
    }
}

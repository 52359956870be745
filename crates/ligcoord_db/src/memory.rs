//! In-memory [`crate::ExperimentStore`] fake for tests.

use crate::ExperimentStore;
use async_trait::async_trait;
use ligcoord_protocol::{CoordinatorError, ExperimentKind, ExperimentRow, Ligand, TrainingStatus};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryExperimentStore {
    rows: Mutex<Vec<ExperimentRow>>,
}

impl InMemoryExperimentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tested row with a measured value.
    pub fn seed_tested(&self, job_id: i64, smiles: impl Into<String>, measured_value: f64) {
        self.rows.lock().unwrap().push(ExperimentRow {
            job_id,
            ligand_smiles: smiles.into(),
            measured_value: Some(measured_value),
            predicted_value: None,
            kind: ExperimentKind::Tested,
            training_status: TrainingStatus::Pending,
        });
    }

    /// Seed an untested row awaiting prediction.
    pub fn seed_untested(&self, job_id: i64, smiles: impl Into<String>) {
        self.rows.lock().unwrap().push(ExperimentRow {
            job_id,
            ligand_smiles: smiles.into(),
            measured_value: None,
            predicted_value: None,
            kind: ExperimentKind::Untested,
            training_status: TrainingStatus::Pending,
        });
    }

    pub fn row(&self, job_id: i64, smiles: &str) -> Option<ExperimentRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.job_id == job_id && row.ligand_smiles == smiles)
            .cloned()
    }
}

#[async_trait]
impl ExperimentStore for InMemoryExperimentStore {
    async fn fetch_experiments(
        &self,
        job_id: i64,
    ) -> Result<(Vec<Ligand>, Vec<Ligand>), CoordinatorError> {
        let rows = self.rows.lock().unwrap();
        let mut tested = Vec::new();
        let mut untested = Vec::new();
        for row in rows.iter().filter(|row| row.job_id == job_id) {
            match row.kind {
                ExperimentKind::Tested => tested.push(Ligand::tested(
                    row.ligand_smiles.clone(),
                    row.measured_value.unwrap_or_default(),
                )),
                ExperimentKind::Untested => {
                    untested.push(Ligand::untested(row.ligand_smiles.clone()))
                }
            }
        }
        Ok((tested, untested))
    }

    async fn set_training_status(
        &self,
        job_id: i64,
        status: TrainingStatus,
    ) -> Result<(), CoordinatorError> {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.job_id == job_id && row.kind == ExperimentKind::Untested {
                row.training_status = status;
            }
        }
        Ok(())
    }

    async fn set_predicted_value(
        &self,
        job_id: i64,
        ligand_smiles: &str,
        value: f64,
    ) -> Result<(), CoordinatorError> {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.job_id == job_id && row.ligand_smiles == ligand_smiles {
                row.predicted_value = Some(value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_splits_tested_and_untested() {
        let store = InMemoryExperimentStore::new();
        store.seed_tested(42, "CCO", 1.2);
        store.seed_tested(42, "CCN", 0.8);
        store.seed_untested(42, "c1ccccc1");

        let (tested, untested) = store.fetch_experiments(42).await.unwrap();
        assert_eq!(tested.len(), 2);
        assert_eq!(untested, vec![Ligand::untested("c1ccccc1")]);
    }

    #[tokio::test]
    async fn set_training_status_only_touches_untested_rows() {
        let store = InMemoryExperimentStore::new();
        store.seed_tested(42, "CCO", 1.2);
        store.seed_untested(42, "c1ccccc1");

        store
            .set_training_status(42, TrainingStatus::Running)
            .await
            .unwrap();

        assert_eq!(
            store.row(42, "CCO").unwrap().training_status,
            TrainingStatus::Pending
        );
        assert_eq!(
            store.row(42, "c1ccccc1").unwrap().training_status,
            TrainingStatus::Running
        );
    }

    #[tokio::test]
    async fn set_predicted_value_targets_job_and_smiles() {
        let store = InMemoryExperimentStore::new();
        store.seed_untested(42, "c1ccccc1");
        store.seed_untested(7, "c1ccccc1");

        store.set_predicted_value(42, "c1ccccc1", 0.9).await.unwrap();

        assert_eq!(store.row(42, "c1ccccc1").unwrap().predicted_value, Some(0.9));
        assert_eq!(store.row(7, "c1ccccc1").unwrap().predicted_value, None);
    }
}

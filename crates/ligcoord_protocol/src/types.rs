//! Domain types shared by the bus intake, the worker, and the persistence layer.

use serde::{Deserialize, Serialize};

/// A chemical structure and, when tested, its measured activity.
///
/// SMILES is the natural key within a job; `std_value` is present for tested
/// ligands and absent for untested ones (later populated as `predicted_value` on
/// the experiment row, not on this transient struct).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ligand {
    pub smiles: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_value: Option<f64>,
}

impl Ligand {
    pub fn tested(smiles: impl Into<String>, std_value: f64) -> Self {
        Self {
            smiles: smiles.into(),
            std_value: Some(std_value),
        }
    }

    pub fn untested(smiles: impl Into<String>) -> Self {
        Self {
            smiles: smiles.into(),
            std_value: None,
        }
    }
}

/// A ligand supplied at job-initialization time, with a human-readable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialLigand {
    pub name: String,
    pub smiles: String,
    pub std_value: f64,
}

/// `experiment.type`: whether a row has a measured value or is awaiting prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum ExperimentKind {
    Tested = 0,
    Untested = 1,
}

/// `experiment.training_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum TrainingStatus {
    Pending = 0,
    Running = 1,
    Done = 2,
}

/// A single row of the `experiment` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExperimentRow {
    pub job_id: i64,
    pub ligand_smiles: String,
    pub measured_value: Option<f64>,
    pub predicted_value: Option<f64>,
    pub kind: ExperimentKind,
    pub training_status: TrainingStatus,
}

/// What a job descriptor asks a worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Process,
    Inference,
    Train,
    Initialize,
}

// ---------------------------------------------------------------------------
// Bus payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProcessRequest {
    pub job_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProcessResponse {
    pub job_id: i64,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInferenceRequest {
    pub job_id: i64,
    pub experiment_id: i64,
    pub protein_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInferenceResponse {
    pub job_id: i64,
    pub experiment_id: i64,
    pub result: f64,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainRequest {
    pub job_id: i64,
    pub experiment_id: i64,
    pub protein_data: String,
    pub target_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainResponse {
    pub job_id: i64,
    pub experiment_id: i64,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInitializeRequest {
    pub job_id: i64,
    pub initial_ligands: Vec<InitialLigand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ligand_untested_has_no_std_value() {
        let l = Ligand::untested("c1ccccc1");
        assert_eq!(l.std_value, None);
        let json = serde_json::to_string(&l).unwrap();
        assert!(!json.contains("std_value"));
    }

    #[test]
    fn model_inference_request_round_trips() {
        let req = ModelInferenceRequest {
            job_id: 7,
            experiment_id: 1,
            protein_data: "MKTFF".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: ModelInferenceRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }
}

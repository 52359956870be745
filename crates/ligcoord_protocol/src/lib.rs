//! Shared wire types and error kinds for the ligand-screening coordinator.
//!
//! Every other crate in the workspace depends on this one for the vocabulary of the
//! system: job kinds, ligand/experiment records, the bus message payloads, and the
//! single `CoordinatorError` enum that crosses crate boundaries.

pub mod error;
pub mod topics;
pub mod types;

pub use error::CoordinatorError;
pub use types::{
    ExperimentKind, ExperimentRow, InitialLigand, JobKind, Ligand, ModelInferenceRequest,
    ModelInferenceResponse, ModelInitializeRequest, ModelProcessRequest, ModelProcessResponse,
    ModelTrainRequest, ModelTrainResponse, TrainingStatus,
};

pub type Result<T> = std::result::Result<T, CoordinatorError>;

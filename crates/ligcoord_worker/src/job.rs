//! The transient unit of work handed from intake to a worker, with its rendezvous
//! channels back to the handler that created it.

use ligcoord_protocol::{CoordinatorError, InitialLigand, JobKind};
use tokio::sync::oneshot;

/// Created by intake, consumed by exactly one worker, discarded after the
/// rendezvous closes. `result_tx`/`error_tx` sends are infallible from the
/// worker's perspective: if the handler already timed out and dropped its
/// receiver, the send simply returns `Err` and is ignored (handler-side
/// timeouts don't cancel the in-flight job).
pub struct JobDescriptor {
    pub job_id: i64,
    pub kind: JobKind,
    pub protein_data: Option<String>,
    pub target_value: Option<f64>,
    pub initial_ligands: Option<Vec<InitialLigand>>,
    pub result_tx: oneshot::Sender<f64>,
    pub error_tx: oneshot::Sender<Option<CoordinatorError>>,
}

/// The handler's half of a job's rendezvous: awaited with a timeout by intake.
pub struct Rendezvous {
    pub result_rx: oneshot::Receiver<f64>,
    pub error_rx: oneshot::Receiver<Option<CoordinatorError>>,
}

impl JobDescriptor {
    /// Build a `Process` descriptor plus the rendezvous handle the caller awaits.
    pub fn process(job_id: i64) -> (Self, Rendezvous) {
        Self::build(job_id, JobKind::Process, None, None, None)
    }

    pub fn inference(job_id: i64, protein_data: impl Into<String>) -> (Self, Rendezvous) {
        Self::build(job_id, JobKind::Inference, Some(protein_data.into()), None, None)
    }

    pub fn train(job_id: i64, protein_data: impl Into<String>, target_value: f64) -> (Self, Rendezvous) {
        Self::build(
            job_id,
            JobKind::Train,
            Some(protein_data.into()),
            Some(target_value),
            None,
        )
    }

    pub fn initialize(job_id: i64, initial_ligands: Vec<InitialLigand>) -> (Self, Rendezvous) {
        Self::build(job_id, JobKind::Initialize, None, None, Some(initial_ligands))
    }

    fn build(
        job_id: i64,
        kind: JobKind,
        protein_data: Option<String>,
        target_value: Option<f64>,
        initial_ligands: Option<Vec<InitialLigand>>,
    ) -> (Self, Rendezvous) {
        let (result_tx, result_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();
        (
            Self {
                job_id,
                kind,
                protein_data,
                target_value,
                initial_ligands,
                result_tx,
                error_tx,
            },
            Rendezvous { result_rx, error_rx },
        )
    }
}

//! Topic dispatch: the pure, Kafka-free core that turns a raw bus message into a
//! job, enqueues it, and waits out the handler-side timeout for its kind.

use ligcoord_manager::Manager;
use ligcoord_protocol::topics::{
    MODEL_INFERENCE_REQUEST, MODEL_INITIALIZE_REQUEST, MODEL_PROCESS_REQUEST, MODEL_TRAIN_REQUEST,
};
use ligcoord_protocol::{
    CoordinatorError, ModelInferenceRequest, ModelInitializeRequest, ModelProcessRequest,
    ModelTrainRequest,
};
use ligcoord_worker::JobDescriptor;
use std::time::Duration;
use tracing::warn;

pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(5);
pub const TRAIN_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(180);
pub const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened to one raw message, for the caller to log and tally.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The job ran to completion within its handler-side timeout, without error.
    Handled,
    /// `KAFKA_TOPICS` named a topic this coordinator doesn't recognize.
    UnknownTopic,
    /// Payload wasn't valid JSON for its topic's expected shape. Consumed, not replayed.
    Malformed(String),
    /// The rendezvous timed out before a worker produced a result. The job descriptor
    /// stays in the queue and may still be processed later (an accepted leak).
    TimedOut,
    /// The job reached a worker and failed there.
    JobFailed(CoordinatorError),
}

/// Routes one raw `(topic, payload)` pair: builds the job descriptor, enqueues it
/// via `manager`, and awaits its rendezvous under the timeout appropriate to the
/// topic's job kind.
pub async fn dispatch_message(topic: &str, payload: &[u8], manager: &Manager) -> DispatchOutcome {
    match topic {
        MODEL_PROCESS_REQUEST => {
            let req: ModelProcessRequest = match serde_json::from_slice(payload) {
                Ok(req) => req,
                Err(err) => return DispatchOutcome::Malformed(err.to_string()),
            };
            let (job, rendezvous) = JobDescriptor::process(req.job_id);
            run(manager, job, rendezvous.error_rx, PROCESS_TIMEOUT).await
        }
        MODEL_INFERENCE_REQUEST => {
            let req: ModelInferenceRequest = match serde_json::from_slice(payload) {
                Ok(req) => req,
                Err(err) => return DispatchOutcome::Malformed(err.to_string()),
            };
            let (job, rendezvous) = JobDescriptor::inference(req.job_id, req.protein_data);
            run(manager, job, rendezvous.error_rx, INFERENCE_TIMEOUT).await
        }
        MODEL_TRAIN_REQUEST => {
            let req: ModelTrainRequest = match serde_json::from_slice(payload) {
                Ok(req) => req,
                Err(err) => return DispatchOutcome::Malformed(err.to_string()),
            };
            let (job, rendezvous) =
                JobDescriptor::train(req.job_id, req.protein_data, req.target_value);
            run(manager, job, rendezvous.error_rx, TRAIN_TIMEOUT).await
        }
        MODEL_INITIALIZE_REQUEST => {
            let req: ModelInitializeRequest = match serde_json::from_slice(payload) {
                Ok(req) => req,
                Err(err) => return DispatchOutcome::Malformed(err.to_string()),
            };
            let (job, rendezvous) = JobDescriptor::initialize(req.job_id, req.initial_ligands);
            run(manager, job, rendezvous.error_rx, INITIALIZE_TIMEOUT).await
        }
        other => {
            warn!(topic = other, "unknown topic");
            DispatchOutcome::UnknownTopic
        }
    }
}

async fn run(
    manager: &Manager,
    job: JobDescriptor,
    error_rx: tokio::sync::oneshot::Receiver<Option<CoordinatorError>>,
    timeout: Duration,
) -> DispatchOutcome {
    if let Err(err) = manager.enqueue(job).await {
        return DispatchOutcome::JobFailed(err);
    }
    match tokio::time::timeout(timeout, error_rx).await {
        Ok(Ok(None)) => DispatchOutcome::Handled,
        Ok(Ok(Some(err))) => DispatchOutcome::JobFailed(err),
        // The worker dropped error_tx without sending, which `handle_job` never
        // does on any path; treated the same as a successful, unobserved result.
        Ok(Err(_)) => DispatchOutcome::Handled,
        Err(_) => DispatchOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ligcoord_cache::{testing::FakeWeightProvider, WeightCache};
    use ligcoord_db::InMemoryExperimentStore;
    use ligcoord_executor::testing::FakeExecutorClient;
    use ligcoord_manager::DEFAULT_QUEUE_CAPACITY;
    use ligcoord_worker::Worker;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn spawn_worker(manager: &Manager, executor: FakeExecutorClient) {
        let cache = WeightCache::new(Arc::new(FakeWeightProvider::new()), 4);
        let db = Arc::new(InMemoryExperimentStore::new());
        let csv_path = tempdir().unwrap().keep();
        let (worker, _handle) = Worker::new(
            0,
            Arc::new(executor),
            cache,
            db,
            csv_path,
            manager.job_locks(),
        );
        tokio::spawn(worker.run(manager.receiver()));
    }

    #[tokio::test]
    async fn unknown_topic_is_ignored() {
        let manager = Manager::new(DEFAULT_QUEUE_CAPACITY);
        let outcome = dispatch_message("SomeOtherTopic", b"{}", &manager).await;
        assert!(matches!(outcome, DispatchOutcome::UnknownTopic));
    }

    #[tokio::test]
    async fn malformed_payload_is_logged_and_skipped() {
        let manager = Manager::new(DEFAULT_QUEUE_CAPACITY);
        let outcome = dispatch_message(MODEL_PROCESS_REQUEST, b"not json", &manager).await;
        assert!(matches!(outcome, DispatchOutcome::Malformed(_)));
    }

    #[tokio::test]
    async fn inference_request_round_trips_through_a_worker() {
        let manager = Manager::new(DEFAULT_QUEUE_CAPACITY);
        spawn_worker(&manager, FakeExecutorClient::new().with_inference_result(0.42));

        let payload = serde_json::to_vec(&ModelInferenceRequest {
            job_id: 7,
            experiment_id: 1,
            protein_data: "MKTFF".to_string(),
        })
        .unwrap();
        let outcome = dispatch_message(MODEL_INFERENCE_REQUEST, &payload, &manager).await;
        assert!(matches!(outcome, DispatchOutcome::Handled));
    }

    #[tokio::test(start_paused = true)]
    async fn no_worker_available_times_out() {
        let manager = Manager::new(DEFAULT_QUEUE_CAPACITY);
        let payload = serde_json::to_vec(&ModelInferenceRequest {
            job_id: 7,
            experiment_id: 1,
            protein_data: "MKTFF".to_string(),
        })
        .unwrap();
        let outcome = dispatch_message(MODEL_INFERENCE_REQUEST, &payload, &manager).await;
        assert!(matches!(outcome, DispatchOutcome::TimedOut));
    }

    #[tokio::test]
    async fn executor_failure_surfaces_as_job_failed() {
        let manager = Manager::new(DEFAULT_QUEUE_CAPACITY);
        spawn_worker(&manager, FakeExecutorClient::new().failing_inference());

        let payload = serde_json::to_vec(&ModelInferenceRequest {
            job_id: 7,
            experiment_id: 1,
            protein_data: "MKTFF".to_string(),
        })
        .unwrap();
        let outcome = dispatch_message(MODEL_INFERENCE_REQUEST, &payload, &manager).await;
        assert!(matches!(outcome, DispatchOutcome::JobFailed(_)));
    }
}

//! Bus intake: subscribes to Kafka, dispatches by topic, enqueues jobs with the
//! manager, and awaits each job's handler-side timeout.
//!
//! One task pumps the `StreamConsumer` into a bounded channel of capacity
//! `WORKER_COUNT`; `WORKER_COUNT` dispatcher tasks drain it concurrently, so one
//! slow job's rendezvous wait never blocks the others.

pub mod dispatch;
pub mod pump;

pub use dispatch::{dispatch_message, DispatchOutcome};
pub use pump::{build_consumer, RawMessage};

use ligcoord_manager::Manager;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{info, warn};

/// Spawns the Kafka pump plus `worker_count` dispatcher tasks, returning their
/// join handles. The caller owns cancellation: dropping/aborting the pump
/// handle (or the consumer it wraps) is what ends intake.
pub fn spawn(
    consumer: rdkafka::consumer::StreamConsumer,
    worker_count: usize,
    manager: Arc<Manager>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let (tx, rx) = mpsc::channel(worker_count);
    let rx = Arc::new(AsyncMutex::new(rx));

    let mut handles = Vec::with_capacity(worker_count + 1);
    handles.push(tokio::spawn(pump::pump(consumer, tx)));

    for id in 0..worker_count {
        let rx = rx.clone();
        let manager = manager.clone();
        handles.push(tokio::spawn(dispatch_loop(id, rx, manager)));
    }
    handles
}

async fn dispatch_loop(
    id: usize,
    rx: Arc<AsyncMutex<mpsc::Receiver<RawMessage>>>,
    manager: Arc<Manager>,
) {
    loop {
        let message = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(message) = message else {
            info!(dispatcher_id = id, "intake channel closed, dispatcher shutting down");
            return;
        };
        let outcome = dispatch_message(&message.topic, &message.payload, &manager).await;
        match outcome {
            DispatchOutcome::Handled => {}
            DispatchOutcome::UnknownTopic => {
                warn!(topic = message.topic, "unknown topic");
            }
            DispatchOutcome::Malformed(err) => {
                warn!(topic = message.topic, %err, "malformed message payload, skipping");
            }
            DispatchOutcome::TimedOut => {
                warn!(topic = message.topic, "timeout waiting for available worker");
            }
            DispatchOutcome::JobFailed(err) => {
                warn!(topic = message.topic, %err, "job failed");
            }
        }
    }
}

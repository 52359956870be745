//! Pumps the Kafka `StreamConsumer` into an internal bounded channel.
//!
//! Kept separate from dispatch so the routing logic in `dispatch.rs` can be
//! exercised without a broker. One task owns the consumer; `WORKER_COUNT` other
//! tasks drain the channel this task feeds (see [`crate::run`]).

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// One topic-tagged payload handed from the Kafka pump to a dispatcher task.
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub fn build_consumer(
    broker_host: &str,
    consumer_group: &str,
    topics: &[String],
) -> Result<StreamConsumer, rdkafka::error::KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", broker_host)
        .set("group.id", consumer_group)
        .set("enable.auto.commit", "true")
        .create()?;
    let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
    consumer.subscribe(&topic_refs)?;
    Ok(consumer)
}

/// Polls `consumer` until it (or the channel) closes, forwarding every message's
/// topic and payload bytes. Runs until cancelled — the caller is expected to
/// `tokio::select!` this future against a shutdown signal.
pub async fn pump(consumer: StreamConsumer, tx: mpsc::Sender<RawMessage>) {
    loop {
        match consumer.recv().await {
            Ok(message) => {
                let topic = message.topic().to_string();
                let payload = message.payload().map(|p| p.to_vec()).unwrap_or_default();
                if tx.send(RawMessage { topic, payload }).await.is_err() {
                    warn!("intake channel closed, stopping kafka pump");
                    return;
                }
            }
            Err(err) => {
                error!(%err, "kafka consumer error, continuing to poll");
            }
        }
    }
}

//! Coordination fabric entry point: wires config, persistence, object storage,
//! the weight cache, a pool of executor-bound workers, Kafka intake, and the
//! read-only status API, then runs until SIGINT/SIGTERM.

use anyhow::Context;
use ligcoord_cache::{ObjectStoreProvider, WeightCache};
use ligcoord_config::Config;
use ligcoord_db::PgExperimentStore;
use ligcoord_executor::HttpExecutorClient;
use ligcoord_manager::{Manager, DEFAULT_QUEUE_CAPACITY};
use ligcoord_storage::S3ObjectStore;
use ligcoord_worker::Worker;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

const CSV_BASE_DIR: &str = "./csv";
const WEIGHTS_BASE_DIR: &str = "./weights";
const STATUS_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ligcoord_logging::init_logging()?;

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        torch_worker_count = config.torch_worker_count,
        worker_count = config.worker_count,
        "starting coordinator"
    );

    let db: Arc<dyn ligcoord_db::ExperimentStore> = Arc::new(
        PgExperimentStore::connect(&config.postgres_connection)
            .await
            .context("failed to connect to postgres")?,
    );

    let object_store: Arc<dyn ligcoord_storage::ObjectStore> = Arc::new(
        S3ObjectStore::new(&config.s3_endpoint, &config.s3_access_key, &config.s3_secret_key).await,
    );
    let provider = Arc::new(ObjectStoreProvider::new(
        object_store,
        config.weight_bucket.clone(),
        WEIGHTS_BASE_DIR,
    ));
    let cache = WeightCache::new(provider, config.weight_cache_size);

    let manager = Arc::new(Manager::new(DEFAULT_QUEUE_CAPACITY));

    for (id, address) in config.torch_worker_addresses.iter().enumerate() {
        let executor = Arc::new(
            HttpExecutorClient::new(address)
                .with_context(|| format!("failed to build executor client for {address}"))?,
        );
        let (worker, handle) = Worker::new(
            id,
            executor,
            cache.clone(),
            db.clone(),
            CSV_BASE_DIR,
            manager.job_locks(),
        );
        manager.register(handle).await;
        tokio::spawn(worker.run(manager.receiver()));
    }

    let consumer = ligcoord_intake::build_consumer(
        &config.kafka_broker_host,
        &config.kafka_consumer_group,
        &config.kafka_topics,
    )
    .context("failed to build kafka consumer")?;
    let intake_handles = ligcoord_intake::spawn(consumer, config.worker_count, manager.clone());

    let addr: SocketAddr = STATUS_ADDR.parse().context("invalid status server address")?;
    let server = tokio::spawn(ligcoord_api::serve(
        addr,
        cache.clone(),
        manager.clone(),
        shutdown_signal(),
    ));

    shutdown_signal().await;
    info!("shutdown signal received, stopping intake");
    for handle in intake_handles {
        handle.abort();
    }

    if let Err(err) = server.await {
        error!(%err, "status server task panicked");
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM. Awaiting it twice (once here, once by the
/// status server's graceful-shutdown future) is intentional: both fire off the
/// same external signal, not a shared one-shot.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(%err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

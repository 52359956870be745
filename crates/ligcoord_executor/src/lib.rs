//! Thin HTTP client bound to one remote model-execution engine ("executor").
//!
//! No retries: a non-2xx response or transport error is surfaced immediately. The
//! executor is assumed stateful — after a successful `load`, subsequent
//! `inference`/`train` calls operate on the loaded weights until another `load`.

pub mod testing;

use async_trait::async_trait;
use ligcoord_protocol::CoordinatorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Comfortably above the longest handler-side timeout (process, 180s) so the HTTP
/// client never times out before the handler gives up waiting on it.
pub const EXECUTOR_REQUEST_TIMEOUT: Duration = Duration::from_secs(185);

#[async_trait]
pub trait ExecutorClient: Send + Sync {
    async fn initialize(
        &self,
        job_id: i64,
        initial_ligands: &[ligcoord_protocol::InitialLigand],
    ) -> Result<(), CoordinatorError>;

    async fn process(
        &self,
        train_csv_path: &str,
        test_csv_path: &str,
    ) -> Result<(), CoordinatorError>;

    async fn load(&self, weight_path: &str) -> Result<(), CoordinatorError>;

    async fn inference(&self, protein_data: &str) -> Result<f64, CoordinatorError>;

    async fn train(&self, protein_data: &str, target_value: f64) -> Result<(), CoordinatorError>;
}

/// HTTP implementation of [`ExecutorClient`], bound to one `host:port` address.
pub struct HttpExecutorClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecutorClient {
    pub fn new(address: &str) -> Result<Self, CoordinatorError> {
        let client = reqwest::Client::builder()
            .timeout(EXECUTOR_REQUEST_TIMEOUT)
            .build()
            .map_err(|err| CoordinatorError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: format!("http://{address}"),
        })
    }
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    initial_ligands: &'a [ligcoord_protocol::InitialLigand],
}

#[derive(Serialize)]
struct ProcessBody<'a> {
    train_csv_path: &'a str,
    test_csv_path: &'a str,
}

#[derive(Serialize)]
struct LoadBody<'a> {
    weight_path: &'a str,
}

#[derive(Serialize)]
struct InferenceBody<'a> {
    protein_data: &'a str,
}

#[derive(Deserialize)]
struct InferenceResult {
    result: f64,
}

#[derive(Serialize)]
struct TrainBody<'a> {
    protein_data: &'a str,
    target_value: f64,
}

async fn expect_ok(
    response: reqwest::Response,
    verb: &str,
) -> Result<(), CoordinatorError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(CoordinatorError::transient_remote(format!(
            "{verb} failed, server responded with status: {status}"
        )))
    }
}

#[async_trait]
impl ExecutorClient for HttpExecutorClient {
    async fn initialize(
        &self,
        job_id: i64,
        initial_ligands: &[ligcoord_protocol::InitialLigand],
    ) -> Result<(), CoordinatorError> {
        let url = format!("{}/initialize/{job_id}", self.base_url);
        debug!(url, "POST initialize");
        let response = self
            .client
            .post(&url)
            .json(&InitializeBody { initial_ligands })
            .send()
            .await
            .map_err(|err| CoordinatorError::transient_remote(format!("failed to initialize: {err}")))?;
        expect_ok(response, "initialize").await
    }

    async fn process(
        &self,
        train_csv_path: &str,
        test_csv_path: &str,
    ) -> Result<(), CoordinatorError> {
        let url = format!("{}/process", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ProcessBody {
                train_csv_path,
                test_csv_path,
            })
            .send()
            .await
            .map_err(|err| CoordinatorError::transient_remote(format!("process request failed: {err}")))?;
        expect_ok(response, "process").await
    }

    async fn load(&self, weight_path: &str) -> Result<(), CoordinatorError> {
        let url = format!("{}/load", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoadBody { weight_path })
            .send()
            .await
            .map_err(|err| CoordinatorError::transient_remote(format!("failed to load model: {err}")))?;
        expect_ok(response, "load").await
    }

    async fn inference(&self, protein_data: &str) -> Result<f64, CoordinatorError> {
        let url = format!("{}/inference", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&InferenceBody { protein_data })
            .send()
            .await
            .map_err(|err| CoordinatorError::transient_remote(format!("inference request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(CoordinatorError::transient_remote(format!(
                "inference failed, server responded with status: {}",
                response.status()
            )));
        }

        let decoded: InferenceResult = response
            .json()
            .await
            .map_err(|err| CoordinatorError::transient_remote(format!("failed to decode inference result: {err}")))?;
        Ok(decoded.result)
    }

    async fn train(&self, protein_data: &str, target_value: f64) -> Result<(), CoordinatorError> {
        let url = format!("{}/train", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TrainBody {
                protein_data,
                target_value,
            })
            .send()
            .await
            .map_err(|err| CoordinatorError::transient_remote(format!("training request failed: {err}")))?;
        expect_ok(response, "train").await
    }
}

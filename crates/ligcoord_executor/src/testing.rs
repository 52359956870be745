//! An in-memory [`ExecutorClient`] fake, so the worker and manager crates can
//! exercise their state machines without a real executor HTTP endpoint.

use crate::ExecutorClient;
use async_trait::async_trait;
use ligcoord_protocol::{CoordinatorError, InitialLigand};
use std::sync::Mutex;

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub initialize: Vec<i64>,
    pub process: Vec<(String, String)>,
    pub load: Vec<String>,
    pub inference: Vec<String>,
    pub train: Vec<(String, f64)>,
}

/// A scriptable fake: every verb can be told to fail, and `inference` returns a
/// fixed scalar. Call history is recorded for assertions.
pub struct FakeExecutorClient {
    calls: Mutex<Calls>,
    fail_load: bool,
    fail_inference: bool,
    fail_train: bool,
    fail_process: bool,
    fail_initialize: bool,
    inference_result: f64,
    process_predictions: Vec<(String, f64)>,
}

impl Default for FakeExecutorClient {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Calls::default()),
            fail_load: false,
            fail_inference: false,
            fail_train: false,
            fail_process: false,
            fail_initialize: false,
            inference_result: 0.0,
            process_predictions: Vec::new(),
        }
    }
}

impl FakeExecutorClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inference_result(mut self, value: f64) -> Self {
        self.inference_result = value;
        self
    }

    /// Rows written to `test_csv_path` when `process` is invoked, standing in for
    /// what a real executor would write back after scoring the test set.
    pub fn with_process_predictions(mut self, rows: Vec<(String, f64)>) -> Self {
        self.process_predictions = rows;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_inference(mut self) -> Self {
        self.fail_inference = true;
        self
    }

    pub fn failing_train(mut self) -> Self {
        self.fail_train = true;
        self
    }

    pub fn failing_process(mut self) -> Self {
        self.fail_process = true;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutorClient for FakeExecutorClient {
    async fn initialize(
        &self,
        job_id: i64,
        _initial_ligands: &[InitialLigand],
    ) -> Result<(), CoordinatorError> {
        self.calls.lock().unwrap().initialize.push(job_id);
        if self.fail_initialize {
            return Err(CoordinatorError::transient_remote("fake initialize failure"));
        }
        Ok(())
    }

    async fn process(
        &self,
        train_csv_path: &str,
        test_csv_path: &str,
    ) -> Result<(), CoordinatorError> {
        self.calls
            .lock()
            .unwrap()
            .process
            .push((train_csv_path.to_string(), test_csv_path.to_string()));
        if self.fail_process {
            return Err(CoordinatorError::transient_remote("fake process failure"));
        }
        if !self.process_predictions.is_empty() {
            ligcoord_csv::write_predictions(std::path::Path::new(test_csv_path), &self.process_predictions)
                .map_err(|err| CoordinatorError::transient_remote(format!("fake process failed to write predictions: {err}")))?;
        }
        Ok(())
    }

    async fn load(&self, weight_path: &str) -> Result<(), CoordinatorError> {
        self.calls.lock().unwrap().load.push(weight_path.to_string());
        if self.fail_load {
            return Err(CoordinatorError::transient_remote("fake load failure"));
        }
        Ok(())
    }

    async fn inference(&self, protein_data: &str) -> Result<f64, CoordinatorError> {
        self.calls
            .lock()
            .unwrap()
            .inference
            .push(protein_data.to_string());
        if self.fail_inference {
            return Err(CoordinatorError::transient_remote("fake inference failure"));
        }
        Ok(self.inference_result)
    }

    async fn train(&self, protein_data: &str, target_value: f64) -> Result<(), CoordinatorError> {
        self.calls
            .lock()
            .unwrap()
            .train
            .push((protein_data.to_string(), target_value));
        if self.fail_train {
            return Err(CoordinatorError::transient_remote("fake train failure"));
        }
        Ok(())
    }
}

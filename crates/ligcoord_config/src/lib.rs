//! Environment configuration, read once at startup.
//!
//! No other crate in the workspace touches `std::env` directly — every component
//! takes a `Config` (or a field of one) as a constructor argument, so tests can
//! inject values instead of mutating process-wide environment state.

use ligcoord_protocol::CoordinatorError;
use std::collections::HashMap;

/// Fully resolved coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub postgres_connection: String,
    pub kafka_broker_host: String,
    pub kafka_consumer_group: String,
    pub kafka_topics: Vec<String>,
    pub worker_count: usize,
    pub torch_worker_count: usize,
    pub torch_worker_addresses: Vec<String>,
    pub weight_cache_size: usize,
    pub weight_bucket: String,
    pub s3_endpoint: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
}

impl Config {
    /// Read and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, CoordinatorError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    /// The testable core of [`Config::from_env`]: build from an explicit map rather
    /// than the live process environment.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, CoordinatorError> {
        let postgres_connection = required(vars, "POSTGRES_CONNECTION")?;
        let kafka_broker_host = required(vars, "KAFKA_BROKER_HOST")?;
        let kafka_consumer_group = required(vars, "KAFKA_CONSUMER_GROUP")?;
        let kafka_topics = required(vars, "KAFKA_TOPICS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        let worker_count = required_usize(vars, "WORKER_COUNT")?;
        let torch_worker_count = required_usize(vars, "TORCH_WORKER_COUNT")?;
        let weight_cache_size = required_usize(vars, "WEIGHT_CACHE_SIZE")?;
        let weight_bucket = required(vars, "WEIGHT_BUCKET")?;
        let s3_endpoint = required(vars, "S3_ENDPOINT")?;
        let s3_access_key = required(vars, "S3_ACCESS_KEY")?;
        let s3_secret_key = required(vars, "S3_SECRET_KEY")?;

        let torch_worker_addresses: Vec<String> = required(vars, "TORCH_WORKER_ADDRESSES")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if torch_worker_addresses.len() != torch_worker_count {
            return Err(CoordinatorError::config(format!(
                "TORCH_WORKER_ADDRESSES lists {} address(es) but TORCH_WORKER_COUNT is {}",
                torch_worker_addresses.len(),
                torch_worker_count
            )));
        }

        Ok(Self {
            postgres_connection,
            kafka_broker_host,
            kafka_consumer_group,
            kafka_topics,
            worker_count,
            torch_worker_count,
            torch_worker_addresses,
            weight_cache_size,
            weight_bucket,
            s3_endpoint,
            s3_access_key,
            s3_secret_key,
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String, CoordinatorError> {
    vars.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| CoordinatorError::config(format!("missing required env var {key}")))
}

fn required_usize(vars: &HashMap<String, String>, key: &str) -> Result<usize, CoordinatorError> {
    let raw = required(vars, key)?;
    raw.parse::<usize>()
        .map_err(|_| CoordinatorError::config(format!("invalid {key}: {raw:?} is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_map() -> HashMap<String, String> {
        [
            ("POSTGRES_CONNECTION", "postgres://localhost/cid"),
            ("KAFKA_BROKER_HOST", "kafka:9092"),
            ("KAFKA_CONSUMER_GROUP", "ml-coordinator"),
            ("KAFKA_TOPICS", "ModelProcessRequest,ModelInferenceRequest"),
            ("WORKER_COUNT", "4"),
            ("TORCH_WORKER_COUNT", "2"),
            ("TORCH_WORKER_ADDRESSES", "torch-worker1:5000,torch-worker2:5000"),
            ("WEIGHT_CACHE_SIZE", "10"),
            ("WEIGHT_BUCKET", "weights"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("S3_ACCESS_KEY", "minioadmin"),
            ("S3_SECRET_KEY", "minioadmin"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn parses_a_complete_environment() {
        let config = Config::from_map(&full_map()).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.torch_worker_count, 2);
        assert_eq!(
            config.kafka_topics,
            vec!["ModelProcessRequest", "ModelInferenceRequest"]
        );
        assert_eq!(
            config.torch_worker_addresses,
            vec!["torch-worker1:5000", "torch-worker2:5000"]
        );
    }

    #[test]
    fn missing_var_is_fatal() {
        let mut vars = full_map();
        vars.remove("WEIGHT_BUCKET");
        let err = Config::from_map(&vars).unwrap_err();
        assert!(matches!(err, CoordinatorError::Config(msg) if msg.contains("WEIGHT_BUCKET")));
    }

    #[test]
    fn non_integer_numeric_var_is_fatal() {
        let mut vars = full_map();
        vars.insert("WORKER_COUNT".to_string(), "four".to_string());
        let err = Config::from_map(&vars).unwrap_err();
        assert!(matches!(err, CoordinatorError::Config(msg) if msg.contains("WORKER_COUNT")));
    }

    #[test]
    fn address_count_must_match_torch_worker_count() {
        let mut vars = full_map();
        vars.insert("TORCH_WORKER_COUNT".to_string(), "3".to_string());
        let err = Config::from_map(&vars).unwrap_err();
        assert!(matches!(err, CoordinatorError::Config(_)));
    }
}

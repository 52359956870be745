//! Kafka topic name constants.
//!
//! Kept as plain `&str` constants (not an enum) because `KAFKA_TOPICS` is an
//! operator-supplied list dispatched on by string match; unrecognized topics are
//! logged and ignored rather than rejected (see `ligcoord_intake`).

pub const MODEL_INFERENCE_REQUEST: &str = "ModelInferenceRequest";
pub const MODEL_TRAIN_REQUEST: &str = "ModelTrainRequest";
pub const MODEL_PROCESS_REQUEST: &str = "ModelProcessRequest";
pub const MODEL_INITIALIZE_REQUEST: &str = "ModelInitializeRequest";

pub const MODEL_INFERENCE_RESPONSE: &str = "ModelInferenceResponse";
pub const MODEL_TRAIN_RESPONSE: &str = "ModelTrainResponse";
pub const MODEL_PROCESS_RESPONSE: &str = "ModelProcessResponse";

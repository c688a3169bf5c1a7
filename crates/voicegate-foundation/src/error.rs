use thiserror::Error;

use crate::state::WorkerState;

/// Rejected configuration. Fatal at initialization: a worker never enters
/// `Running` with parameters that failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("silence threshold {silence} exceeds speech threshold {speech}")]
    ThresholdOrder { silence: f32, speech: f32 },

    #[error("{name} must be a finite value in [0, 1], got {value}")]
    ThresholdRange { name: &'static str, value: f32 },

    #[error("frame size must be greater than zero")]
    ZeroFrameSize,

    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("external model detector is not available in this build")]
    DetectorUnavailable,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid worker state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: WorkerState, to: WorkerState },

    #[error("session has been destroyed")]
    Destroyed,

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
}

pub mod error;
pub mod state;

pub use error::{ConfigError, PipelineError};
pub use state::WorkerState;

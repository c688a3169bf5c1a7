pub mod messages;
pub mod thread;
pub mod worker;

pub use messages::{CaptureFrame, WorkerCommand, WorkerEvent};
pub use thread::{FrameSender, WorkerThread};
pub use worker::{CaptureWorker, FrameOutcome};

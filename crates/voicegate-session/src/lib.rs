pub mod controller;
pub mod options;

pub use controller::VoiceGate;
pub use options::{VadOptions, VadOptionsPatch};

// Re-exports for upstream consumers wiring the pipeline together.
pub use voicegate_vad::{FrameMetrics, PcmFrame};
pub use voicegate_worker::{CaptureFrame, FrameSender};

use voicegate_vad::{FrameMetrics, PcmFrame, VadParams};

/// One frame of floating-point samples as delivered by the capture layer.
///
/// Samples are normalized to [-1.0, 1.0]. The frame is owned by the capture
/// callback until pushed to the worker, then moves with the message.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Commands flowing from the coordinator to the worker.
///
/// Delivery is asynchronous and fire-and-forget; every command is safe to
/// send twice.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Start,
    Pause,
    Reconfigure {
        params: VadParams,
        vad_enabled: bool,
    },
    Stop,
}

/// Tagged messages flowing from the worker to the coordinator.
///
/// Audio buffers move with the message; the worker never retains a frame it
/// has sent.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    SpeechStart {
        timestamp_ms: u64,
    },
    SpeechEnd {
        timestamp_ms: u64,
        duration_ms: u64,
    },
    Audio(PcmFrame),
    Activity(FrameMetrics),
}

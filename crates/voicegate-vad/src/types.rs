use serde::{Deserialize, Serialize};

/// One frame of 16-bit signed PCM, timestamped in stream milliseconds.
///
/// Frames move with the messages that carry them; a sender never retains or
/// mutates a frame after handing it off.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub timestamp_ms: u64,
}

impl PcmFrame {
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VadState {
    Idle,
    Speaking,
}

/// Output of the segmenter for a single processed frame.
///
/// A frame can yield several events at once: a `SpeechStart` is followed by
/// the replayed pre-speech padding, and a confirmed end flushes the trailing
/// window before `SpeechEnd`.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    SpeechStart {
        timestamp_ms: u64,
    },
    Audio(PcmFrame),
    SpeechEnd {
        timestamp_ms: u64,
        duration_ms: u64,
    },
}

/// Per-frame observation published to the control side.
///
/// `rms` is the detector score for the frame; for the energy detector that
/// is the RMS energy of the normalized samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    pub timestamp_ms: u64,
    pub rms: f32,
    pub dbfs: f32,
    pub is_speech: bool,
}

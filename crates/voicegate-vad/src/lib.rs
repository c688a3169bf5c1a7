pub mod codec;
pub mod config;
pub mod detector;
pub mod energy;
pub mod segmenter;
pub mod types;

pub use config::{DetectorKind, VadParams};
pub use detector::{build_scorer, EnergyDetector, SpeechScorer};
pub use segmenter::VadSegmenter;
pub use types::{FrameMetrics, PcmFrame, SegmentEvent, VadState};

use serde::{Deserialize, Serialize};
use voicegate_foundation::ConfigError;

/// Detection engine, selected once at configuration time and never switched
/// mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorKind {
    /// RMS energy compared against fixed thresholds.
    Energy,
    /// Neural scorer from an external model runtime. Same interface, not
    /// bundled with this build.
    ExternalModel,
}

impl Default for DetectorKind {
    fn default() -> Self {
        Self::Energy
    }
}

/// Segmentation parameters, immutable for the lifetime of a segmenter.
///
/// The silence threshold must not exceed the speech threshold; the gap
/// between them is the hysteresis band that prevents chatter around a
/// single boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadParams {
    pub speech_threshold: f32,
    pub silence_threshold: f32,
    pub pre_speech_padding_ms: u32,
    pub post_speech_padding_ms: u32,
    /// How long silence must persist before an utterance ends.
    pub silence_duration_ms: u32,
    /// Minimum utterance length; shorter triggers are discarded.
    pub min_speech_duration_ms: u32,
    pub detector: DetectorKind,
}

impl Default for VadParams {
    fn default() -> Self {
        // Millisecond equivalents of the frame-count defaults at 1536
        // samples / 16 kHz (96 ms per frame).
        Self {
            speech_threshold: 0.5,
            silence_threshold: 0.35,
            pre_speech_padding_ms: 96,
            post_speech_padding_ms: 768,
            silence_duration_ms: 1000,
            min_speech_duration_ms: 288,
            detector: DetectorKind::Energy,
        }
    }
}

impl VadParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("speech_threshold", self.speech_threshold),
            ("silence_threshold", self.silence_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdRange { name, value });
            }
        }
        if self.silence_threshold > self.speech_threshold {
            return Err(ConfigError::ThresholdOrder {
                silence: self.silence_threshold,
                speech: self.speech_threshold,
            });
        }
        Ok(())
    }
}

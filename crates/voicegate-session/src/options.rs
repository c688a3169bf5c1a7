use serde::{Deserialize, Serialize};

use voicegate_foundation::ConfigError;
use voicegate_vad::{DetectorKind, VadParams};

/// User-facing session options.
///
/// Padding and minimum-duration options count frames of `frame_samples` at
/// `sample_rate_hz`, mirroring how capture deployments configure the
/// pipeline; [`to_params`](Self::to_params) converts them into the
/// millisecond domain the segmenter operates in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VadOptions {
    /// Gate audio on voice activity; disabled sessions forward every frame.
    pub enabled: bool,
    pub silence_duration_ms: u32,
    pub positive_speech_threshold: f32,
    pub negative_speech_threshold: f32,
    pub pre_speech_pad_frames: u32,
    pub redemption_frames: u32,
    pub frame_samples: usize,
    pub min_speech_frames: u32,
    pub sample_rate_hz: u32,
    pub detector: DetectorKind,
}

impl Default for VadOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            silence_duration_ms: 1000,
            positive_speech_threshold: 0.5,
            negative_speech_threshold: 0.35,
            pre_speech_pad_frames: 1,
            redemption_frames: 8,
            frame_samples: 1536,
            min_speech_frames: 3,
            sample_rate_hz: 16_000,
            detector: DetectorKind::Energy,
        }
    }
}

/// Caller-supplied overrides; unset fields keep their current values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VadOptionsPatch {
    pub enabled: Option<bool>,
    pub silence_duration_ms: Option<u32>,
    pub positive_speech_threshold: Option<f32>,
    pub negative_speech_threshold: Option<f32>,
    pub pre_speech_pad_frames: Option<u32>,
    pub redemption_frames: Option<u32>,
    pub frame_samples: Option<usize>,
    pub min_speech_frames: Option<u32>,
    pub sample_rate_hz: Option<u32>,
    pub detector: Option<DetectorKind>,
}

impl VadOptions {
    pub fn apply(&mut self, patch: &VadOptionsPatch) {
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.silence_duration_ms {
            self.silence_duration_ms = v;
        }
        if let Some(v) = patch.positive_speech_threshold {
            self.positive_speech_threshold = v;
        }
        if let Some(v) = patch.negative_speech_threshold {
            self.negative_speech_threshold = v;
        }
        if let Some(v) = patch.pre_speech_pad_frames {
            self.pre_speech_pad_frames = v;
        }
        if let Some(v) = patch.redemption_frames {
            self.redemption_frames = v;
        }
        if let Some(v) = patch.frame_samples {
            self.frame_samples = v;
        }
        if let Some(v) = patch.min_speech_frames {
            self.min_speech_frames = v;
        }
        if let Some(v) = patch.sample_rate_hz {
            self.sample_rate_hz = v;
        }
        if let Some(v) = patch.detector {
            self.detector = v;
        }
    }

    pub fn frame_duration_ms(&self) -> f64 {
        self.frame_samples as f64 * 1000.0 / self.sample_rate_hz as f64
    }

    /// Convert to segmenter parameters, validating the result.
    pub fn to_params(&self) -> Result<VadParams, ConfigError> {
        if self.frame_samples == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        let frame_ms = self.frame_duration_ms();
        let params = VadParams {
            speech_threshold: self.positive_speech_threshold,
            silence_threshold: self.negative_speech_threshold,
            pre_speech_padding_ms: (self.pre_speech_pad_frames as f64 * frame_ms).round() as u32,
            post_speech_padding_ms: (self.redemption_frames as f64 * frame_ms).round() as u32,
            silence_duration_ms: self.silence_duration_ms,
            min_speech_duration_ms: (self.min_speech_frames as f64 * frame_ms).round() as u32,
            detector: self.detector,
        };
        params.validate()?;
        Ok(params)
    }
}

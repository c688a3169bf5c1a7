use voicegate_foundation::ConfigError;

use crate::config::DetectorKind;
use crate::energy;

/// Scores a frame of normalized samples for speech likelihood.
///
/// This is the seam between the segmenter and the detection engine: the
/// segmenter only ever sees a scalar score compared against its thresholds,
/// so engines can be swapped without touching the state machine.
pub trait SpeechScorer: Send {
    fn score(&mut self, samples: &[f32]) -> f32;
}

/// Energy-threshold detector. The score is the frame's RMS energy.
#[derive(Debug, Default)]
pub struct EnergyDetector;

impl SpeechScorer for EnergyDetector {
    fn score(&mut self, samples: &[f32]) -> f32 {
        energy::rms(samples)
    }
}

/// Build the scorer for the configured detector kind.
pub fn build_scorer(kind: DetectorKind) -> Result<Box<dyn SpeechScorer>, ConfigError> {
    match kind {
        DetectorKind::Energy => Ok(Box::new(EnergyDetector)),
        // Deployments that ship the neural model swap it in here; this
        // build carries only the energy engine.
        DetectorKind::ExternalModel => Err(ConfigError::DetectorUnavailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_detector_scores_rms() {
        let mut detector = EnergyDetector;
        let frame = vec![0.5f32; 512];
        assert!((detector.score(&frame) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn external_model_is_unavailable() {
        assert!(matches!(
            build_scorer(DetectorKind::ExternalModel),
            Err(ConfigError::DetectorUnavailable)
        ));
    }

    #[test]
    fn energy_kind_builds() {
        assert!(build_scorer(DetectorKind::Energy).is_ok());
    }
}

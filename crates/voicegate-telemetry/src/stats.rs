use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared session statistics for cross-thread monitoring.
///
/// Counters are monotonic: they are updated unconditionally as events
/// arrive, never decremented, and reset only on explicit request.
#[derive(Clone)]
pub struct SessionStats {
    pub total_frames: Arc<AtomicU64>,
    pub voice_frames: Arc<AtomicU64>,
    pub silence_frames: Arc<AtomicU64>,
    /// Confirmed speech onsets.
    pub activations: Arc<AtomicU64>,

    // Gauges for live monitoring
    pub current_rms: Arc<AtomicU64>, // RMS * 1000 for precision
    pub is_speaking: Arc<AtomicBool>,
    pub last_voice_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            voice_frames: Arc::new(AtomicU64::new(0)),
            silence_frames: Arc::new(AtomicU64::new(0)),
            activations: Arc::new(AtomicU64::new(0)),
            current_rms: Arc::new(AtomicU64::new(0)),
            is_speaking: Arc::new(AtomicBool::new(false)),
            last_voice_time: Arc::new(RwLock::new(None)),
        }
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self, is_speech: bool, rms: f32) {
        self.total_frames.fetch_add(1, Ordering::Relaxed);
        if is_speech {
            self.voice_frames.fetch_add(1, Ordering::Relaxed);
        } else {
            self.silence_frames.fetch_add(1, Ordering::Relaxed);
        }
        self.current_rms
            .store((rms * 1000.0) as u64, Ordering::Relaxed);
        self.is_speaking.store(is_speech, Ordering::Relaxed);
    }

    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
        *self.last_voice_time.write() = Some(Instant::now());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total_frames = self.total_frames.load(Ordering::Relaxed);
        let voice_frames = self.voice_frames.load(Ordering::Relaxed);
        let ratio = if total_frames == 0 {
            0.0
        } else {
            voice_frames as f64 * 100.0 / total_frames as f64
        };
        StatsSnapshot {
            total_frames,
            voice_frames,
            silence_frames: self.silence_frames.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            voice_ratio: format!("{:.2}%", ratio),
        }
    }

    /// Zero the counters. Gauges keep their last observation.
    pub fn reset(&self) {
        self.total_frames.store(0, Ordering::Relaxed);
        self.voice_frames.store(0, Ordering::Relaxed);
        self.silence_frames.store(0, Ordering::Relaxed);
        self.activations.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_frames: u64,
    pub voice_frames: u64,
    pub silence_frames: u64,
    pub activations: u64,
    pub voice_ratio: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frames_by_classification() {
        let stats = SessionStats::new();
        for _ in 0..40 {
            stats.record_frame(true, 0.6);
        }
        for _ in 0..60 {
            stats.record_frame(false, 0.1);
        }

        let snap = stats.snapshot();
        assert_eq!(snap.total_frames, 100);
        assert_eq!(snap.voice_frames, 40);
        assert_eq!(snap.silence_frames, 60);
        assert_eq!(snap.voice_ratio, "40.00%");
    }

    #[test]
    fn empty_session_reports_zero_ratio() {
        let stats = SessionStats::new();
        assert_eq!(stats.snapshot().voice_ratio, "0.00%");
    }

    #[test]
    fn activations_track_speech_onsets() {
        let stats = SessionStats::new();
        assert!(stats.last_voice_time.read().is_none());
        stats.record_activation();
        stats.record_activation();
        assert_eq!(stats.snapshot().activations, 2);
        assert!(stats.last_voice_time.read().is_some());
    }

    #[test]
    fn reset_zeroes_counters_only() {
        let stats = SessionStats::new();
        stats.record_frame(true, 0.8);
        stats.record_activation();
        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.total_frames, 0);
        assert_eq!(snap.voice_frames, 0);
        assert_eq!(snap.activations, 0);
        // The gauge keeps the last observation.
        assert_eq!(stats.current_rms.load(Ordering::Relaxed), 800);
    }

    #[test]
    fn clones_share_the_same_counters() {
        let stats = SessionStats::new();
        let clone = stats.clone();
        clone.record_frame(true, 0.5);
        assert_eq!(stats.snapshot().total_frames, 1);
    }
}

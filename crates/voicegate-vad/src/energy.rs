/// Root-mean-square energy of a frame of normalized samples.
///
/// Used as a scalar gate against the configured thresholds, not a
/// perceptual loudness measure. Returns 0.0 for an empty frame.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// RMS expressed in dBFS, floored at -100.0 for silence.
pub fn rms_to_dbfs(rms: f32) -> f32 {
    if rms <= 1e-10 {
        return -100.0;
    }
    20.0 * rms.log10()
}

/// Convert normalized floating-point samples to 16-bit signed PCM.
///
/// Input is clamped to [-1.0, 1.0] before scaling. Positive samples scale by
/// 32767 and negative samples by 32768, the asymmetric range of signed
/// 16-bit PCM, kept exactly as-is for bit compatibility with consumers of
/// the wire format.
pub fn encode_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_maps_to_asymmetric_extremes() {
        assert_eq!(encode_i16(&[1.0]), vec![32767]);
        assert_eq!(encode_i16(&[-1.0]), vec![-32768]);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(encode_i16(&[2.5]), vec![32767]);
        assert_eq!(encode_i16(&[-7.0]), vec![-32768]);
    }

    #[test]
    fn zero_stays_zero() {
        assert_eq!(encode_i16(&[0.0]), vec![0]);
    }

    #[test]
    fn half_scale_uses_the_matching_factor() {
        assert_eq!(encode_i16(&[0.5]), vec![16383]);
        assert_eq!(encode_i16(&[-0.5]), vec![-16384]);
    }

    #[test]
    fn output_length_matches_input() {
        let input = vec![0.1f32; 1536];
        assert_eq!(encode_i16(&input).len(), 1536);
    }
}

//! In-place volume scaling for 16-bit PCM chunks
//!
//! Runs on the writer thread between the staging buffer and the
//! output device. Chunks arrive frame-aligned, so the byte length is
//! always a whole number of 16-bit samples.

use crate::audio::volume::VolumeControl;

/// Scale every sample in `chunk` by the current volume.
///
/// The scale factor is read once per call; a volume change lands on
/// the next chunk boundary rather than partway through a chunk. Zero
/// volume short-circuits to a silence fill without touching sample
/// arithmetic.
pub fn apply_volume(volume: &VolumeControl, chunk: &mut [u8]) {
    let factor = volume.scale_factor();

    if factor == 0.0 {
        chunk.fill(0);
        return;
    }

    scale_chunk(chunk, factor);
}

/// Multiply each 16-bit little-endian sample by `factor`, rounding to
/// nearest and saturating at the i16 range instead of wrapping.
fn scale_chunk(chunk: &mut [u8], factor: f32) {
    for sample in chunk.chunks_exact_mut(2) {
        let value = i16::from_le_bytes([sample[0], sample[1]]);
        let scaled = (value as f32 * factor).round();
        let clamped = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        sample.copy_from_slice(&clamped.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auricle_common::VolumeCurve;

    fn bytes_of(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn samples_of(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    #[test]
    fn test_zero_volume_fills_silence() {
        let volume = VolumeControl::new(VolumeCurve::Exponential, 50);
        volume.set_raw(0);

        let mut chunk = bytes_of(&[1234, -5678, i16::MAX, i16::MIN]);
        apply_volume(&volume, &mut chunk);
        assert!(chunk.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_volume_preserves_samples() {
        let volume = VolumeControl::new(VolumeCurve::Exponential, 100);
        volume.set_raw(127);

        let original = [1234i16, -5678, 32000, -32000, 0];
        let mut chunk = bytes_of(&original);
        apply_volume(&volume, &mut chunk);

        for (before, after) in original.iter().zip(samples_of(&chunk)) {
            assert!(
                (before - after).abs() <= 1,
                "sample {} scaled to {} at full volume",
                before,
                after
            );
        }
    }

    #[test]
    fn test_saturation_instead_of_wraparound() {
        // Linear curve tops out at 2.1, driving loud samples past full scale
        let mut chunk = bytes_of(&[30000, -30000]);
        scale_chunk(&mut chunk, 2.1);
        assert_eq!(samples_of(&chunk), vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_rounds_to_nearest() {
        let mut chunk = bytes_of(&[3, 5, -3, 4]);
        scale_chunk(&mut chunk, 0.5);
        // 1.5 and 2.5 round away from zero, exact halves included
        assert_eq!(samples_of(&chunk), vec![2, 3, -2, 2]);
    }

    #[test]
    fn test_doubling_factor() {
        let mut chunk = bytes_of(&[1000, -1000, 0]);
        scale_chunk(&mut chunk, 2.0);
        assert_eq!(samples_of(&chunk), vec![2000, -2000, 0]);
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let volume = VolumeControl::new(VolumeCurve::Exponential, 50);
        let mut chunk: Vec<u8> = Vec::new();
        apply_volume(&volume, &mut chunk);
        assert!(chunk.is_empty());
    }
}

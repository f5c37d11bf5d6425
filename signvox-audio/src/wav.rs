//! Minimal RIFF/WAVE handling: locate the PCM16 `data` chunk and apply gain.

/// Multiply every PCM16 sample in the `data` chunk by `gain`, clamping to the
/// i16 range. Buffers that are not RIFF/WAVE are left untouched.
/// Returns whether a data chunk was found.
pub fn scale_pcm16(buf: &mut [u8], gain: f32) -> bool {
    let Some((start, len)) = find_data_chunk(buf) else {
        return false;
    };
    let end = (start + len).min(buf.len());
    for chunk in buf[start..end].chunks_exact_mut(2) {
        let s = i16::from_le_bytes([chunk[0], chunk[1]]);
        let scaled = (s as f32 * gain).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        chunk.copy_from_slice(&scaled.to_le_bytes());
    }
    true
}

/// Offset and length of the `data` chunk payload
fn find_data_chunk(buf: &[u8]) -> Option<(usize, usize)> {
    if buf.len() < 12 || &buf[0..4] != b"RIFF" || &buf[8..12] != b"WAVE" {
        return None;
    }
    let mut idx = 12;
    while idx + 8 <= buf.len() {
        let chunk_id = &buf[idx..idx + 4];
        let sz =
            u32::from_le_bytes([buf[idx + 4], buf[idx + 5], buf[idx + 6], buf[idx + 7]]) as usize;
        if chunk_id == b"data" {
            return Some((idx + 8, sz));
        }
        // Chunks are word aligned
        idx += 8 + sz + (sz & 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_with_samples(samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&16_000u32.to_le_bytes());
        buf.extend_from_slice(&32_000u32.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }

    fn samples(buf: &[u8]) -> Vec<i16> {
        let (start, len) = find_data_chunk(buf).unwrap();
        buf[start..start + len]
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    #[test]
    fn test_scale_halves_samples() {
        let mut buf = wav_with_samples(&[1000, -1000, 0]);
        assert!(scale_pcm16(&mut buf, 0.5));
        assert_eq!(samples(&buf), vec![500, -500, 0]);
    }

    #[test]
    fn test_scale_clamps() {
        let mut buf = wav_with_samples(&[30_000, -30_000]);
        scale_pcm16(&mut buf, 2.0);
        assert_eq!(samples(&buf), vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_non_wav_untouched() {
        let mut buf = b"not a wave file".to_vec();
        let before = buf.clone();
        assert!(!scale_pcm16(&mut buf, 0.1));
        assert_eq!(buf, before);
    }
}

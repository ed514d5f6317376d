//! WAV container encode/decode backed by the `hound` crate.
//!
//! Providers consume audio two ways: the upload backends send the WAV
//! container bytes as-is, while the streaming backend needs the raw PCM
//! payload extracted (and possibly resampled) first. Only 16-bit integer
//! PCM is supported — everything else is rejected up front rather than sent
//! to a backend that would reject it remotely.

use std::io::Cursor;

use super::AudioError;

// ---------------------------------------------------------------------------
// decode_wav_pcm16
// ---------------------------------------------------------------------------

/// Extract mono 16-bit PCM samples from a WAV container.
///
/// Multi-channel payloads are downmixed to mono by averaging each frame.
///
/// # Errors
///
/// * [`AudioError::UnsupportedBitDepth`] — payload is not 16-bit.
/// * [`AudioError::Decode`] — malformed container, non-integer sample
///   format, or a corrupt sample stream.
pub fn decode_wav_pcm16(bytes: &[u8]) -> Result<(Vec<i16>, u32), AudioError> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode(e.to_string()))?;

    let spec = reader.spec();
    if spec.bits_per_sample != 16 {
        return Err(AudioError::UnsupportedBitDepth(spec.bits_per_sample));
    }
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(AudioError::Decode("expected integer PCM samples".into()));
    }

    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<_, _>>()
        .map_err(|e| AudioError::Decode(e.to_string()))?;

    let mono = if spec.channels > 1 {
        let n = spec.channels as usize;
        samples
            .chunks_exact(n)
            .map(|frame| (frame.iter().map(|&s| s as i32).sum::<i32>() / n as i32) as i16)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

// ---------------------------------------------------------------------------
// encode_wav_pcm16
// ---------------------------------------------------------------------------

/// Write mono 16-bit PCM samples into a WAV container.
pub fn encode_wav_pcm16(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::Encode(e.to_string()))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| AudioError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Encode(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

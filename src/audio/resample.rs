//! PCM resampling by linear interpolation.
//!
//! The streaming recognition backend accepts 8 kHz or 16 kHz 16-bit PCM
//! only; anything else is converted to 16 kHz before framing. Linear
//! interpolation is sufficient for speech at these rates.

/// Rate preferred when a conversion is required.
pub const TARGET_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// resample_pcm16
// ---------------------------------------------------------------------------

/// Resample 16-bit PCM from `source_rate` Hz to `target_rate` Hz using
/// linear interpolation.
///
/// Output length is `round(len × target_rate / source_rate)`; output sample
/// `i` interpolates the source at fractional index `i / ratio`.
///
/// * Equal rates return the input unchanged (no interpolation performed).
/// * Empty input returns an empty vector.
///
/// # Example
///
/// ```rust
/// use voicepaste::audio::resample_pcm16;
///
/// // Upsample 10 ms of 8 kHz audio to 16 kHz
/// let low = vec![0i16; 80];
/// let high = resample_pcm16(&low, 8_000, 16_000);
/// assert_eq!(high.len(), 160);
/// ```
pub fn resample_pcm16(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate == target_rate {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            let a = samples[idx] as f64;
            let b = samples[idx + 1] as f64;
            (a * (1.0 - frac) + b * frac).round() as i16
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// resample_for_recognition
// ---------------------------------------------------------------------------

/// Prepare PCM for the streaming backend: 8 kHz and 16 kHz pass through
/// unchanged, every other rate is resampled to 16 kHz.
///
/// Returns the (possibly converted) samples together with their rate.
pub fn resample_for_recognition(samples: &[i16], source_rate: u32) -> (Vec<i16>, u32) {
    match source_rate {
        8_000 | 16_000 => (samples.to_vec(), source_rate),
        _ => {
            log::debug!("resampling audio: {source_rate} Hz -> {TARGET_RATE} Hz");
            (
                resample_pcm16(samples, source_rate, TARGET_RATE),
                TARGET_RATE,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

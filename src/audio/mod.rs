//! Audio pipeline — microphone capture → WAV container → provider adapters.
//!
//! The capture side accumulates `f32` samples from the cpal callback while a
//! recording is active and hands back a single-use [`AudioBuffer`] (16-bit
//! PCM in a WAV container at the device rate) when the recording stops.
//! Provider adapters that need raw PCM decode it back out with
//! [`AudioBuffer::pcm16`] and resample with [`resample_pcm16`].
//!
//! ```text
//! Microphone → cpal callback → shared sample buffer → MicSource::stop()
//!           → encode_wav_pcm16 → AudioBuffer → orchestrator
//! ```

pub mod capture;
pub mod resample;
pub mod wav;

pub use capture::{AudioCapture, AudioChunk, CaptureError, MicSource, StreamHandle};
pub use resample::{resample_for_recognition, resample_pcm16};
pub use wav::{decode_wav_pcm16, encode_wav_pcm16};

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised while decoding or encoding captured audio.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// The WAV payload is not 16-bit PCM.
    #[error("unsupported bit depth: {0} bit (need 16 bit PCM)")]
    UnsupportedBitDepth(u16),

    /// The buffer could not be parsed as a WAV container.
    #[error("cannot decode WAV container: {0}")]
    Decode(String),

    /// The sample buffer could not be written as a WAV container.
    #[error("cannot encode WAV container: {0}")]
    Encode(String),
}

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// A single-use buffer of captured audio.
///
/// Holds a complete WAV container (mono, 16-bit PCM payload) at the rate the
/// device delivered. The buffer is passed **by value** into the orchestrator
/// and consumed by the session; adapters borrow it for the duration of one
/// call.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Complete WAV container bytes.
    pub wav: Vec<u8>,
    /// Sample rate of the PCM payload in Hz.
    pub sample_rate: u32,
    /// Duration of the recording in seconds.
    pub duration_secs: f32,
}

impl AudioBuffer {
    /// Decode the contained 16-bit PCM samples.
    ///
    /// Returns the mono sample vector and its rate. Multi-channel payloads
    /// are downmixed by averaging.
    pub fn pcm16(&self) -> Result<(Vec<i16>, u32), AudioError> {
        decode_wav_pcm16(&self.wav)
    }
}

// ---------------------------------------------------------------------------
// CapturedAudio
// ---------------------------------------------------------------------------

/// Outcome of stopping a recording.
///
/// The two sentinels are distinct on purpose: `TooShort` drives the
/// user-visible "hold longer" warning, `Empty` means the device delivered
/// nothing at all (stream not running, permissions missing).
#[derive(Debug, Clone)]
pub enum CapturedAudio {
    /// The recording was shorter than the minimum usable duration.
    TooShort,
    /// No samples were captured.
    Empty,
    /// A usable recording.
    Buffer(AudioBuffer),
}

// ---------------------------------------------------------------------------
// AudioSource
// ---------------------------------------------------------------------------

/// Interface between the input state machine and the capture device.
///
/// `start` begins accumulating samples; `stop` ends the recording and
/// returns the captured audio (or a sentinel). Implementations must be
/// `Send + Sync` so they can sit behind an `Arc<dyn AudioSource>` shared by
/// the state machine and its worker tasks.
pub trait AudioSource: Send + Sync {
    /// Begin accumulating samples.
    fn start(&self);
    /// Stop accumulating and return whatever was captured.
    fn stop(&self) -> CapturedAudio;
}

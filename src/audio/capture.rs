//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle and streams
//! raw [`AudioChunk`]s over an mpsc channel. [`MicSource`] sits on top: a
//! background thread drains the chunks into a shared sample buffer while a
//! recording is active, and [`MicSource::stop`] turns the accumulated
//! samples into a single-use WAV [`AudioBuffer`](super::AudioBuffer).
//!
//! The cpal stream itself is owned by a [`StreamHandle`] kept on the main
//! thread — `cpal::Stream` is not `Send` on every platform, so only the
//! shared buffer crosses thread boundaries.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::{encode_wav_pcm16, AudioBuffer, AudioSource, CapturedAudio};

/// Recordings shorter than this are reported as [`CapturedAudio::TooShort`].
const MIN_DURATION_SECS: f32 = 1.0;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved channels reported by the device.
    channels: u16,
}

impl AudioCapture {
    /// Create a new [`AudioCapture`] using the system default input device.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available,
    /// or [`CaptureError::DefaultConfig`] when the device cannot report a
    /// default stream configuration.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start recording and send [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread; send errors
    /// (receiver dropped) are silently ignored so that thread never panics.
    pub fn start(
        &self,
        tx: std::sync::mpsc::Sender<AudioChunk>,
    ) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// MicSource
// ---------------------------------------------------------------------------

/// Samples accumulated while recording, plus the is-recording flag.
type SharedSamples = Arc<Mutex<(Vec<f32>, bool)>>;

/// [`AudioSource`] implementation backed by the default microphone.
///
/// Construct with [`MicSource::open`], which also returns the
/// [`StreamHandle`] that must stay alive (on the main thread) for the
/// duration of the process.
pub struct MicSource {
    shared: SharedSamples,
    sample_rate: u32,
}

impl MicSource {
    /// Open the default input device and start draining its chunks.
    ///
    /// A named background thread downmixes each chunk to mono and appends it
    /// to the shared buffer — but only while a recording is active, so idle
    /// audio is discarded at the channel.
    pub fn open() -> Result<(Self, StreamHandle), CaptureError> {
        let capture = AudioCapture::new()?;
        let sample_rate = capture.sample_rate();
        let channels = capture.channels();

        let shared: SharedSamples = Arc::new(Mutex::new((Vec::new(), false)));
        let (tx, rx) = std::sync::mpsc::channel::<AudioChunk>();

        let shared_drain = Arc::clone(&shared);
        std::thread::Builder::new()
            .name("audio-drain".into())
            .spawn(move || {
                while let Ok(chunk) = rx.recv() {
                    let mut guard = shared_drain.lock().unwrap();
                    if !guard.1 {
                        continue;
                    }
                    if channels > 1 {
                        let n = channels as usize;
                        guard.0.extend(
                            chunk
                                .samples
                                .chunks_exact(n)
                                .map(|frame| frame.iter().sum::<f32>() / n as f32),
                        );
                    } else {
                        guard.0.extend_from_slice(&chunk.samples);
                    }
                }
            })
            .expect("failed to spawn audio-drain thread");

        let handle = capture.start(tx)?;
        log::info!("audio capture started ({sample_rate} Hz, {channels} ch)");

        Ok((
            Self {
                shared,
                sample_rate,
            },
            handle,
        ))
    }
}

impl AudioSource for MicSource {
    fn start(&self) {
        let mut guard = self.shared.lock().unwrap();
        guard.0.clear();
        guard.1 = true;
    }

    fn stop(&self) -> CapturedAudio {
        let samples: Vec<f32> = {
            let mut guard = self.shared.lock().unwrap();
            guard.1 = false;
            std::mem::take(&mut guard.0)
        };

        if samples.is_empty() {
            return CapturedAudio::Empty;
        }

        let duration_secs = samples.len() as f32 / self.sample_rate as f32;
        if duration_secs < MIN_DURATION_SECS {
            return CapturedAudio::TooShort;
        }

        let pcm: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();

        match encode_wav_pcm16(&pcm, self.sample_rate) {
            Ok(wav) => CapturedAudio::Buffer(AudioBuffer {
                wav,
                sample_rate: self.sample_rate,
                duration_secs,
            }),
            Err(e) => {
                log::error!("failed to encode captured audio: {e}");
                CapturedAudio::Empty
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

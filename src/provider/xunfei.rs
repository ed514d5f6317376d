//! Streaming WebSocket recognition adapter (iFlytek IAT).
//!
//! The most involved backend: a stateful, authenticated, real-time
//! recognition service. One call performs a full session:
//!
//! 1. Build a freshly signed `wss://` URL ([`super::auth`]) and connect.
//! 2. Send the session-open control message carrying the recognition
//!    parameters (language, domain, voice-activity end-of-speech timeout,
//!    progressive-result mode).
//! 3. Split the 16-bit PCM into 40 ms frames and stream them with a
//!    sequence number and a start/continue/end status flag. The end flag on
//!    the last frame is the only end-of-stream signal.
//! 4. Drain recognition messages as they arrive; each carries a base64
//!    transcript that supersedes the previous one. The optional partial
//!    callback observes every intermediate transcript.
//! 5. After the last frame, wait (bounded) for the server to finalize.
//!
//! Audio is preprocessed locally: the WAV payload must be 16-bit PCM and is
//! resampled to 16 kHz unless it is already 8 or 16 kHz. Utterances longer
//! than 60 s are rejected before connecting.
//!
//! The adapter never retries — failed sessions are the orchestrator's
//! problem.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::audio::{resample_for_recognition, AudioBuffer};
use crate::config::XunfeiConfig;

use super::auth::{rfc1123_now, signed_ws_url};
use super::{ProviderError, SpeechProvider, TranscribeMode};

/// Frame length in milliseconds of audio.
const FRAME_MS: u32 = 40;
/// Hard per-utterance limit imposed by the service.
const MAX_UTTERANCE_SECS: u32 = 60;
/// How long to poll for queued replies after each sent frame.
const DRAIN_WAIT: std::time::Duration = std::time::Duration::from_millis(5);
/// Bounded wait for the final message once all frames are out.
const FINAL_WAIT: std::time::Duration = std::time::Duration::from_secs(5);
/// Pacing between frames — one frame per 40 ms of real time, matching the
/// amount of audio each frame carries.
const FRAME_PACING: std::time::Duration = std::time::Duration::from_millis(40);

/// Frame status: first frame of the session.
const STATUS_FIRST: u8 = 0;
/// Frame status: intermediate frame.
const STATUS_CONTINUE: u8 = 1;
/// Frame status: final frame; terminates the stream.
const STATUS_LAST: u8 = 2;

/// Observer for intermediate transcripts during a streaming session.
pub type PartialCallback = Arc<dyn Fn(&str) + Send + Sync>;

// ---------------------------------------------------------------------------
// XunfeiProvider
// ---------------------------------------------------------------------------

/// Streaming recognition adapter.
pub struct XunfeiProvider {
    cfg: XunfeiConfig,
    partial: Option<PartialCallback>,
}

impl XunfeiProvider {
    /// Build an adapter from config. Credentials are checked per call — a
    /// provider without them fails the session immediately.
    pub fn new(cfg: XunfeiConfig) -> Self {
        Self { cfg, partial: None }
    }

    /// Attach an observer for intermediate transcripts.
    pub fn with_partial(mut self, callback: PartialCallback) -> Self {
        self.partial = Some(callback);
        self
    }

    fn credentials(&self) -> Result<(&str, &str, &str), ProviderError> {
        match (
            self.cfg.app_id.as_deref(),
            self.cfg.api_key.as_deref(),
            self.cfg.api_secret.as_deref(),
        ) {
            (Some(app_id), Some(key), Some(secret))
                if !app_id.is_empty() && !key.is_empty() && !secret.is_empty() =>
            {
                Ok((app_id, key, secret))
            }
            _ => Err(ProviderError::Protocol(
                "streaming credentials not configured".into(),
            )),
        }
    }

    /// Session-open control message (status 0, recognition parameters).
    fn open_message(&self, app_id: &str, request_id: &str, sample_rate: u32) -> serde_json::Value {
        serde_json::json!({
            "header": {
                "app_id": app_id,
                "res_id": request_id,
                "status": STATUS_FIRST,
            },
            "parameter": {
                "iat": {
                    "domain": self.cfg.domain,
                    "language": self.cfg.language,
                    "accent": "mandarin",
                    "encoding": "raw",
                    "sample_rate": sample_rate,
                    "vad_eos": self.cfg.vad_eos_ms,
                    "dwa": "wpgs",
                }
            },
            "payload": {
                "audio": {
                    "encoding": "raw",
                    "sample_rate": sample_rate,
                    "seq": 0,
                    "audio": "",
                    "status": STATUS_FIRST,
                }
            }
        })
    }

    /// Absorb one server message into `final_text`.
    ///
    /// Returns `Ok(true)` when the message terminates the session (terminal
    /// status or connection close).
    fn absorb(&self, msg: Message, final_text: &mut String) -> Result<bool, ProviderError> {
        let raw = match msg {
            Message::Text(raw) => raw,
            Message::Close(_) => return Ok(true),
            _ => return Ok(false),
        };

        let reply = parse_reply(&raw)?;
        if reply.code != 0 {
            return Err(ProviderError::Protocol(format!(
                "code {}: {}",
                reply.code, reply.message
            )));
        }

        if let Some(text) = reply.text {
            if !text.is_empty() {
                if let Some(cb) = &self.partial {
                    cb(&text);
                }
                // Each transcript supersedes the previous one — progressive
                // results rewrite the whole utterance.
                *final_text = text;
            }
        }

        Ok(reply.status == STATUS_LAST as i64)
    }
}

#[async_trait]
impl SpeechProvider for XunfeiProvider {
    fn name(&self) -> &str {
        crate::config::PROVIDER_XUNFEI
    }

    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        _mode: TranscribeMode,
    ) -> Result<String, ProviderError> {
        if audio.duration_secs > MAX_UTTERANCE_SECS as f32 {
            return Err(ProviderError::UtteranceTooLong {
                got: audio.duration_secs,
                max: MAX_UTTERANCE_SECS,
            });
        }

        let (app_id, api_key, api_secret) = self.credentials()?;

        let (pcm, rate) = audio.pcm16()?;
        let (pcm, rate) = resample_for_recognition(&pcm, rate);
        let bytes = pcm_to_le_bytes(&pcm);

        let url = signed_ws_url(
            &self.cfg.host,
            &self.cfg.path,
            api_key,
            api_secret,
            &rfc1123_now(),
        );

        let (ws, _response) = connect_async(url).await?;
        let (mut write, mut read) = ws.split();

        let request_id = uuid::Uuid::new_v4().to_string();
        write
            .send(Message::Text(
                self.open_message(app_id, &request_id, rate).to_string(),
            ))
            .await?;
        log::debug!("xunfei: session {request_id} opened ({rate} Hz)");

        let frame_size = frame_size_bytes(rate);
        let frames: Vec<&[u8]> = bytes.chunks(frame_size).collect();
        let total = frames.len();

        let mut final_text = String::new();
        let mut finished = false;

        for (seq, chunk) in frames.iter().enumerate() {
            let status = frame_status(seq, total);
            let msg = frame_message(app_id, &request_id, seq, status, chunk, rate);
            write.send(Message::Text(msg.to_string())).await?;

            // Pick up whatever replies are already queued without stalling
            // the send loop.
            while let Ok(Some(next)) = tokio::time::timeout(DRAIN_WAIT, read.next()).await {
                if self.absorb(next?, &mut final_text)? {
                    finished = true;
                    break;
                }
            }
            if finished {
                break;
            }

            tokio::time::sleep(FRAME_PACING).await;
        }

        // The server may need extra time to finalize after the end flag.
        if !finished {
            let deadline = tokio::time::Instant::now() + FINAL_WAIT;
            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    log::debug!("xunfei: finalize wait elapsed, keeping last transcript");
                    break;
                }
                match tokio::time::timeout(remaining, read.next()).await {
                    Ok(Some(next)) => {
                        if self.absorb(next?, &mut final_text)? {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        log::debug!("xunfei: finalize wait elapsed, keeping last transcript");
                        break;
                    }
                }
            }
        }

        Ok(final_text)
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// Bytes of 16-bit PCM per frame: `rate × 2 bytes × 40 ms`.
fn frame_size_bytes(sample_rate: u32) -> usize {
    (sample_rate * 2 * FRAME_MS / 1000) as usize
}

/// Status flag for frame `index` out of `total`.
///
/// The last frame always carries the end flag — a single-frame utterance
/// sends only `STATUS_LAST`.
fn frame_status(index: usize, total: usize) -> u8 {
    if index + 1 == total {
        STATUS_LAST
    } else if index == 0 {
        STATUS_FIRST
    } else {
        STATUS_CONTINUE
    }
}

fn pcm_to_le_bytes(pcm: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pcm.len() * 2);
    for &s in pcm {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

/// One audio frame message.
fn frame_message(
    app_id: &str,
    request_id: &str,
    seq: usize,
    status: u8,
    chunk: &[u8],
    sample_rate: u32,
) -> serde_json::Value {
    serde_json::json!({
        "header": {
            "app_id": app_id,
            "res_id": request_id,
            "status": status,
        },
        "parameter": {},
        "payload": {
            "audio": {
                "encoding": "raw",
                "sample_rate": sample_rate,
                "seq": seq,
                "audio": BASE64.encode(chunk),
                "status": status,
            }
        }
    })
}

/// Decoded server reply.
#[derive(Debug)]
struct Reply {
    code: i64,
    message: String,
    /// Header status; `2` marks the final message of the session.
    status: i64,
    /// Transcript so far, when present.
    text: Option<String>,
}

fn parse_reply(raw: &str) -> Result<Reply, ProviderError> {
    let v: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let code = v["header"]["code"]
        .as_i64()
        .ok_or_else(|| ProviderError::Parse("reply has no header.code".into()))?;
    let status = v["header"]["status"].as_i64().unwrap_or(0);
    let message = v["header"]["message"]
        .as_str()
        .unwrap_or("unknown error")
        .to_string();

    let text = v["payload"]["result"]["text"].as_str().map(decode_text);

    Ok(Reply {
        code,
        message,
        status,
        text,
    })
}

/// Transcripts arrive base64-encoded; a payload that does not decode as
/// base64 UTF-8 is taken verbatim.
fn decode_text(raw: &str) -> String {
    BASE64
        .decode(raw.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn provider_with_creds() -> XunfeiProvider {
        let mut cfg = XunfeiConfig::default();
        cfg.app_id = Some("app".into());
        cfg.api_key = Some("key".into());
        cfg.api_secret = Some("secret".into());
        XunfeiProvider::new(cfg)
    }

    // ---- framing ---

    #[test]
    fn frame_size_at_16k_is_1280_bytes() {
        assert_eq!(frame_size_bytes(16_000), 1280);
    }

    #[test]
    fn frame_size_at_8k_is_640_bytes() {
        assert_eq!(frame_size_bytes(8_000), 640);
    }

    #[test]
    fn frame_statuses_for_multi_frame_stream() {
        assert_eq!(frame_status(0, 3), STATUS_FIRST);
        assert_eq!(frame_status(1, 3), STATUS_CONTINUE);
        assert_eq!(frame_status(2, 3), STATUS_LAST);
    }

    #[test]
    fn single_frame_carries_end_flag_alone() {
        assert_eq!(frame_status(0, 1), STATUS_LAST);
    }

    #[test]
    fn pcm_bytes_are_little_endian() {
        let bytes = pcm_to_le_bytes(&[0x0102, -2]);
        assert_eq!(bytes, vec![0x02, 0x01, 0xFE, 0xFF]);
    }

    // ---- messages ---

    #[test]
    fn open_message_carries_recognition_parameters() {
        let p = provider_with_creds();
        let msg = p.open_message("app", "req-1", 16_000);

        assert_eq!(msg["header"]["app_id"], "app");
        assert_eq!(msg["header"]["status"], 0);
        assert_eq!(msg["parameter"]["iat"]["language"], "zh_cn");
        assert_eq!(msg["parameter"]["iat"]["domain"], "slm");
        assert_eq!(msg["parameter"]["iat"]["vad_eos"], 5000);
        assert_eq!(msg["parameter"]["iat"]["sample_rate"], 16_000);
        assert_eq!(msg["payload"]["audio"]["status"], 0);
    }

    #[test]
    fn frame_message_round_trips_audio() {
        let chunk = [1u8, 2, 3, 4];
        let msg = frame_message("app", "req-1", 7, STATUS_CONTINUE, &chunk, 16_000);

        assert_eq!(msg["header"]["status"], 1);
        assert_eq!(msg["payload"]["audio"]["seq"], 7);
        assert_eq!(msg["payload"]["audio"]["status"], 1);

        let b64 = msg["payload"]["audio"]["audio"].as_str().unwrap();
        assert_eq!(BASE64.decode(b64).unwrap(), chunk);
    }

    // ---- reply parsing ---

    fn reply_json(code: i64, status: i64, text_b64: &str) -> String {
        serde_json::json!({
            "header": { "code": code, "status": status, "message": "ok" },
            "payload": { "result": { "text": text_b64 } }
        })
        .to_string()
    }

    #[test]
    fn parse_reply_decodes_base64_text() {
        let raw = reply_json(0, 1, &BASE64.encode("hello world"));
        let reply = parse_reply(&raw).unwrap();
        assert_eq!(reply.code, 0);
        assert_eq!(reply.status, 1);
        assert_eq!(reply.text.as_deref(), Some("hello world"));
    }

    #[test]
    fn parse_reply_keeps_non_base64_text_verbatim() {
        let raw = reply_json(0, 1, "!!!not base64!!!");
        let reply = parse_reply(&raw).unwrap();
        assert_eq!(reply.text.as_deref(), Some("!!!not base64!!!"));
    }

    #[test]
    fn parse_reply_without_header_code_is_parse_error() {
        let err = parse_reply(r#"{"payload": {}}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn parse_reply_rejects_invalid_json() {
        assert!(matches!(
            parse_reply("not json").unwrap_err(),
            ProviderError::Parse(_)
        ));
    }

    // ---- absorb ---

    #[test]
    fn absorb_updates_final_text_and_flags_terminal_status() {
        let p = provider_with_creds();
        let mut text = String::new();

        let partial = Message::Text(reply_json(0, 1, &BASE64.encode("hel")));
        assert!(!p.absorb(partial, &mut text).unwrap());
        assert_eq!(text, "hel");

        let last = Message::Text(reply_json(0, 2, &BASE64.encode("hello")));
        assert!(p.absorb(last, &mut text).unwrap());
        assert_eq!(text, "hello");
    }

    #[test]
    fn absorb_surfaces_protocol_errors_with_detail() {
        let p = provider_with_creds();
        let mut text = String::new();

        let raw = serde_json::json!({
            "header": { "code": 10165, "status": 0, "message": "invalid handle" }
        })
        .to_string();

        let err = p.absorb(Message::Text(raw), &mut text).unwrap_err();
        match err {
            ProviderError::Protocol(detail) => {
                assert!(detail.contains("10165"));
                assert!(detail.contains("invalid handle"));
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn absorb_treats_close_as_terminal() {
        let p = provider_with_creds();
        let mut text = String::new();
        assert!(p.absorb(Message::Close(None), &mut text).unwrap());
    }

    #[test]
    fn absorb_invokes_partial_callback() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);

        let p = provider_with_creds().with_partial(Arc::new(move |t: &str| {
            seen_cb.lock().unwrap().push(t.to_string());
        }));

        let mut text = String::new();
        let msg = Message::Text(reply_json(0, 1, &BASE64.encode("partial")));
        p.absorb(msg, &mut text).unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), ["partial"]);
    }

    // ---- transcribe guards (no network involved) ---

    #[tokio::test]
    async fn transcribe_rejects_utterances_over_60s() {
        let p = provider_with_creds();
        let audio = AudioBuffer {
            wav: Vec::new(),
            sample_rate: 16_000,
            duration_secs: 61.0,
        };

        let err = p
            .transcribe(&audio, TranscribeMode::Transcribe)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::UtteranceTooLong { max: 60, .. }
        ));
    }

    #[tokio::test]
    async fn transcribe_without_credentials_fails_fast() {
        let p = XunfeiProvider::new(XunfeiConfig::default());
        let audio = AudioBuffer {
            wav: Vec::new(),
            sample_rate: 16_000,
            duration_secs: 2.0,
        };

        let err = p
            .transcribe(&audio, TranscribeMode::Transcribe)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(_)));
    }

    #[test]
    fn provider_reports_no_native_translation() {
        assert!(!provider_with_creds().native_translate());
        assert_eq!(provider_with_creds().name(), "xunfei");
    }
}

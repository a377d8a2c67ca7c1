//! Transcription stream port.
//!
//! A transcript source turns microphone audio into a live stream of text.
//! Each stream item is the *cumulative* transcript of the capture so far
//! (not a delta); consumers replace their display text with every item.
//! The stream ends when the source drains on its own; consumers cancel by
//! dropping the stream.

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use thiserror::Error;

use super::devices::InputDeviceId;

/// Live transcript of an in-progress capture.
///
/// Items are progressively longer transcripts of the same utterance.
pub type TranscriptStream = BoxStream<'static, Result<String, TranscriptError>>;

/// Errors surfaced by transcript sources.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The requested input device is gone or cannot be opened.
    #[error("Input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The OS denied microphone access.
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// The engine failed mid-stream.
    #[error("Transcription failed: {0}")]
    Stream(String),
}

/// Port trait for speech-to-text capture.
///
/// `open` starts a capture session on the given device and hands back the
/// live stream. At most one stream per source is open at a time; the
/// orchestrator enforces this by construction (one listen handle per turn).
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Begin transcribing from `device`.
    async fn open(&self, device: &InputDeviceId) -> Result<TranscriptStream, TranscriptError>;
}

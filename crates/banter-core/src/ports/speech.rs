//! Speech synthesis port.

use async_trait::async_trait;
use thiserror::Error;

/// How a [`SpeechSynthesizer::speak`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Playback ran to the end of the utterance.
    Finished,
    /// Playback was cut short by [`SpeechSynthesizer::stop`].
    Stopped,
}

/// Errors surfaced by speech synthesizers.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Synthesis or playback failed.
    #[error("Speech playback failed: {0}")]
    Playback(String),
}

/// Port trait for turning reply text into audible speech.
///
/// Contracts implementations must uphold:
///
/// - `speak` resolves only once playback has finished or been stopped,
///   and reports which of the two happened.
/// - `speak` with empty or whitespace-only text plays nothing and resolves
///   immediately with [`SpeechOutcome::Finished`].
/// - `stop` takes effect immediately and is safe to call at any time,
///   including when nothing is playing.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` aloud, resolving when playback ends.
    async fn speak(&self, text: &str) -> Result<SpeechOutcome, SpeechError>;

    /// Halt any in-progress playback. Idempotent.
    fn stop(&self);

    /// Whether playback is currently in progress.
    fn is_speaking(&self) -> bool;
}

//! Response generation port.
//!
//! The generator is a local async capability, not a network peer: the
//! orchestrator hands it a fully-assembled [`GenerateRequest`] and consumes
//! a stream of *progressively-complete* replies. Each item is the whole
//! reply so far (not a delta); the last item before the stream ends is the
//! final text. A single-shot generator is just a one-element stream; use
//! [`reply_once`] for that.
//!
//! How the request fields are folded into an actual model prompt (persona
//! preamble, `role: content` history lines, memory facts) is the adapter's
//! business and stays out of the domain.

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use thiserror::Error;

use crate::domain::Message;

/// Everything a generator needs for one turn, snapshotted at request time.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The user's prompt for this turn (the finalized transcript).
    pub prompt: String,
    /// Conversation history, already windowed by the caller's context
    /// policy. Includes the prompt's own user message as the newest entry.
    pub history: Vec<Message>,
    /// Remembered facts, fixed for the duration of the turn.
    pub memory: String,
}

/// Stream of progressively-complete reply texts.
pub type ReplyStream = BoxStream<'static, Result<String, GenerateError>>;

/// Errors surfaced by response generators.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The backing model failed to produce a response.
    #[error("Response generation failed: {0}")]
    Backend(String),

    /// The reply stream ended without yielding any text at all.
    #[error("Reply stream ended without producing any text")]
    EmptyReply,
}

/// Port trait for reply generation.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Start generating a reply for `request`.
    async fn generate(&self, request: GenerateRequest) -> Result<ReplyStream, GenerateError>;
}

/// Wrap a single final reply as a one-element [`ReplyStream`].
///
/// For generators that produce the whole answer in one shot.
#[must_use]
pub fn reply_once(text: impl Into<String>) -> ReplyStream {
    let text = text.into();
    futures_util::stream::once(async move { Ok(text) }).boxed()
}

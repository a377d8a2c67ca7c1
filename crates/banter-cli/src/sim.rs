//! Simulated collaborators for console sessions.
//!
//! Real capture, generation, and synthesis engines stay out of this
//! workspace; these stand-ins reproduce their contracts (streaming
//! partials, pacing, an immediate `stop`) so the whole turn cycle can be
//! exercised from a terminal with no microphone and no model runtime.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use banter_core::domain::MessageRole;
use banter_core::ports::{
    GenerateError, GenerateRequest, InputDeviceId, ReplyStream, ResponseGenerator, SpeechError,
    SpeechOutcome, SpeechSynthesizer, TranscriptError, TranscriptSource, TranscriptStream,
};

/// Pause between word-prefix transcript chunks.
pub const TYPING_PACE: Duration = Duration::from_millis(30);

/// Pause between reply partials.
const REPLY_PACE: Duration = Duration::from_millis(40);

/// Simulated playback time per spoken word. Slow enough that typing a
/// line during a reply reliably lands while "speaking".
const SPEECH_PACE: Duration = Duration::from_millis(120);

// ── Utterance queue ────────────────────────────────────────────────

/// Queue of typed lines waiting to be captured.
///
/// Cloned between the talk loop (producer) and [`TypedUtterances`]
/// (consumer). Uses a std mutex; it is never held across an await.
#[derive(Debug, Clone, Default)]
pub struct UtteranceQueue {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl UtteranceQueue {
    /// Queue a line for the next capture.
    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().unwrap().push_back(line.into());
    }

    /// Drop everything queued but not yet captured.
    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }

    fn pop(&self) -> Option<String> {
        self.lines.lock().unwrap().pop_front()
    }
}

// ── Transcript source ──────────────────────────────────────────────

/// Transcript source that replays typed lines as live speech.
///
/// Each `open` takes the next queued line and streams it back as
/// cumulative word prefixes (`"hi"`, `"hi there"`, ...), paced so partial
/// transcripts are visible at the console. An empty queue yields an empty
/// stream, the equivalent of holding the talk key in silence.
pub struct TypedUtterances {
    queue: UtteranceQueue,
}

impl TypedUtterances {
    /// Create a source that captures from `queue`.
    #[must_use]
    pub const fn new(queue: UtteranceQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl TranscriptSource for TypedUtterances {
    async fn open(&self, _device: &InputDeviceId) -> Result<TranscriptStream, TranscriptError> {
        let Some(utterance) = self.queue.pop() else {
            return Ok(futures_util::stream::empty().boxed());
        };

        Ok(stream! {
            let mut heard = String::new();
            for word in utterance.split_whitespace() {
                if !heard.is_empty() {
                    heard.push(' ');
                }
                heard.push_str(word);
                yield Ok(heard.clone());
                tokio::time::sleep(TYPING_PACE).await;
            }
        }
        .boxed())
    }
}

// ── Response generator ─────────────────────────────────────────────

/// Reply generator that streams deterministic canned responses.
///
/// Not a language model: just enough variation to exercise streaming
/// partials, history windowing, and the memory snapshot end to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

#[async_trait]
impl ResponseGenerator for CannedResponder {
    async fn generate(&self, request: GenerateRequest) -> Result<ReplyStream, GenerateError> {
        let reply = compose_reply(&request);

        Ok(stream! {
            let mut spoken = String::new();
            for word in reply.split_whitespace() {
                if !spoken.is_empty() {
                    spoken.push(' ');
                }
                spoken.push_str(word);
                yield Ok(spoken.clone());
                tokio::time::sleep(REPLY_PACE).await;
            }
        }
        .boxed())
    }
}

/// Compose the reply for one request.
fn compose_reply(request: &GenerateRequest) -> String {
    let turns = request
        .history
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count();

    let mut reply = if request.prompt.trim_end().ends_with('?') {
        format!("Good question! I heard '{}'.", request.prompt)
    } else {
        format!("I heard '{}'.", request.prompt)
    };
    if turns > 1 {
        reply.push_str(&format!(" That makes {turns} turns so far."));
    }
    if !request.memory.trim().is_empty() {
        reply.push_str(" I'm keeping your notes in mind.");
    }
    reply
}

// ── Speech synthesizer ─────────────────────────────────────────────

/// Speech synthesis stand-in that paces playback by reply length.
///
/// Nothing reaches a speaker; the point is to occupy the speaking phase
/// long enough that barge-in is demonstrable at the console, and to
/// honour `stop` immediately the way a real synthesizer must.
pub struct ConsolePlayback {
    speaking: AtomicBool,
    /// Token for the utterance in flight; replaced on every `speak`.
    /// A std mutex, never held across an await.
    current: Mutex<CancellationToken>,
}

impl ConsolePlayback {
    /// Create a playback sim with nothing playing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            speaking: AtomicBool::new(false),
            current: Mutex::new(CancellationToken::new()),
        }
    }
}

impl Default for ConsolePlayback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsolePlayback {
    async fn speak(&self, text: &str) -> Result<SpeechOutcome, SpeechError> {
        let words = text.split_whitespace().count();
        if words == 0 {
            return Ok(SpeechOutcome::Finished);
        }
        let words = u32::try_from(words).unwrap_or(u32::MAX);

        let token = {
            let mut current = self.current.lock().unwrap();
            *current = CancellationToken::new();
            current.clone()
        };

        self.speaking.store(true, Ordering::SeqCst);
        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => SpeechOutcome::Stopped,
            () = tokio::time::sleep(SPEECH_PACE.saturating_mul(words)) => SpeechOutcome::Finished,
        };
        self.speaking.store(false, Ordering::SeqCst);

        Ok(outcome)
    }

    fn stop(&self) {
        self.current.lock().unwrap().cancel();
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

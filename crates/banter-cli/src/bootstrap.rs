//! Console composition root.
//!
//! The only place where the assistant's ports are bound to their console
//! implementations and the assistant task is spawned. Handlers receive a
//! composed [`Session`] and never assemble adapters themselves.

use std::sync::Arc;

use tokio::sync::mpsc;

use banter_agent::{Assistant, AssistantConfig, AssistantDeps, AssistantEvent, AssistantHandle};
use banter_core::ports::MemoryProvider;

use crate::sim::{CannedResponder, ConsolePlayback, TypedUtterances, UtteranceQueue};

/// A composed console session.
pub struct Session {
    /// Driver for the running assistant.
    pub handle: AssistantHandle,
    /// Where typed lines wait to be captured.
    pub utterances: UtteranceQueue,
}

/// Wire the simulated collaborators to an assistant and start it.
///
/// The assistant runs on a spawned task until [`AssistantHandle::shutdown`]
/// is called or every handle is dropped.
pub fn start_session(config: AssistantConfig, memory: Arc<dyn MemoryProvider>) -> Session {
    let utterances = UtteranceQueue::default();

    let deps = AssistantDeps {
        transcripts: Arc::new(TypedUtterances::new(utterances.clone())),
        generator: Arc::new(CannedResponder),
        speech: Arc::new(ConsolePlayback::new()),
        memory,
    };

    let (assistant, events) = Assistant::new(deps, config);
    let handle = assistant.handle();
    spawn_event_logger(events);
    tokio::spawn(assistant.run());

    Session { handle, utterances }
}

/// Drain assistant events into structured logs.
///
/// The talk loop renders from the published view; the event stream still
/// needs a consumer so per-turn detail is available under `RUST_LOG`.
/// The spawned task exits when the assistant drops its sender.
fn spawn_event_logger(mut events: mpsc::UnboundedReceiver<AssistantEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                AssistantEvent::StateChanged(state) => {
                    tracing::debug!(state = ?state, "turn state changed");
                }
                AssistantEvent::Transcript { text, is_final } => {
                    tracing::debug!(text = %text, is_final, "transcript");
                }
                AssistantEvent::Reply { text, is_final } => {
                    tracing::debug!(text = %text, is_final, "reply");
                }
                AssistantEvent::SpeakingStarted => tracing::debug!("speaking started"),
                AssistantEvent::SpeakingFinished => tracing::debug!("speaking finished"),
                AssistantEvent::Error(message) => tracing::warn!(message = %message, "turn error"),
            }
        }
    });
}

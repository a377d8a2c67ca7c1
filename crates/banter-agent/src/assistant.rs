//! Turn-taking assistant orchestrator.
//!
//! The assistant runs as a single spawned task that owns all conversation
//! state and drives one turn at a time through a five-state machine:
//!
//! ```text
//!   Idle → Listening → Thinking → Speaking → Idle
//!            ▲                        │
//!            └──────── barge-in ──────┘
//! ```
//!
//! `Failed` is reached from transcription or generation errors and behaves
//! like `Idle`: the next push-to-talk starts a fresh turn.
//!
//! Commands arrive through [`AssistantHandle`]s. Completions of in-flight
//! work (transcript chunks, reply chunks, playback ends, grace timers)
//! arrive as internal signals tagged with the lease of the turn that
//! started them. Cancelling a turn revokes its lease, so signals from
//! orphaned work are recognised on arrival and dropped instead of
//! corrupting the next turn.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use banter_core::domain::Message;
use banter_core::ports::{
    GenerateError, GenerateRequest, InputDeviceId, MemoryError, MemoryProvider, ResponseGenerator,
    SpeechError, SpeechOutcome, SpeechSynthesizer, TranscriptError, TranscriptSource,
    TranscriptStream,
};

use crate::error::AgentError;
use crate::history::{ContextWindow, ConversationLog};
use crate::speech_text::sanitize_for_speech;

// ── Turn state machine ─────────────────────────────────────────────

/// Current stage of the conversation turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Nothing in flight. The next turn starts from here.
    Idle,

    /// Capturing the user's speech (talk key held).
    Listening,

    /// Waiting for the grace interval and then the generated reply.
    Thinking,

    /// Playing the reply aloud.
    Speaking,

    /// The last turn ended in an error. Recovered by the next turn.
    Failed,
}

impl TurnState {
    /// Default status line shown for this state.
    #[must_use]
    pub const fn status_label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Listening => "Listening...",
            Self::Thinking => "Thinking...",
            Self::Speaking => "Speaking...",
            Self::Failed => "Error",
        }
    }
}

// ── Fixed UI texts ─────────────────────────────────────────────────

/// Greeting shown before the first interaction.
pub const WELCOME_TEXT: &str = "Welcome! Select a microphone and hold the talk key.";

/// Status line shown when listening is requested without an input device.
pub const NO_DEVICE_STATUS: &str = "Error: No microphone selected.";

/// Shown when a capture ends without any usable speech.
pub const EMPTY_CAPTURE_TEXT: &str = "I didn't hear anything. Please try again.";

/// Shown when response generation fails.
pub const GENERATION_FAILED_TEXT: &str = "Error generating response.";

/// Default grace interval between releasing the talk key and committing
/// the prompt, leaving room for in-flight transcript chunks to land.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(250);

// ── Events emitted by the assistant ────────────────────────────────

/// Events emitted by the assistant to the UI / application layer.
#[derive(Debug, Clone)]
pub enum AssistantEvent {
    /// Turn state changed.
    StateChanged(TurnState),

    /// The live transcript was updated.
    Transcript {
        /// The transcript so far.
        text: String,
        /// Whether this is the committed prompt or a streaming partial.
        is_final: bool,
    },

    /// The generated reply was updated.
    Reply {
        /// The reply so far.
        text: String,
        /// Whether this is the complete reply or a streaming partial.
        is_final: bool,
    },

    /// Reply playback started.
    SpeakingStarted,

    /// Reply playback finished or was interrupted.
    SpeakingFinished,

    /// An error occurred during the turn.
    Error(String),
}

// ── Published view ─────────────────────────────────────────────────

/// Atomic snapshot of everything a UI needs to render the assistant.
///
/// Published through a watch channel after every observable change, so a
/// renderer always sees a consistent combination of state, text, and
/// conversation.
#[derive(Debug, Clone)]
pub struct AssistantView {
    /// Current turn state.
    pub state: TurnState,
    /// Headline text: live transcript, streaming reply, or notice.
    pub display: String,
    /// Short status line for the current state.
    pub status: String,
    /// Whether reply playback is in progress.
    pub speaking: bool,
    /// The conversation so far, oldest entry first.
    pub conversation: Arc<[Message]>,
}

impl Default for AssistantView {
    fn default() -> Self {
        Self {
            state: TurnState::Idle,
            display: WELCOME_TEXT.to_string(),
            status: TurnState::Idle.status_label().to_string(),
            speaking: false,
            conversation: Arc::from(Vec::new()),
        }
    }
}

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for the assistant.
///
/// Read when a turn starts; changing the configuration never affects a
/// turn already in flight.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Input device to capture from. `None` means listening requests are
    /// refused with [`NO_DEVICE_STATUS`] until a device is selected.
    pub device: Option<InputDeviceId>,

    /// How long to wait after end-listen before committing the prompt.
    pub grace: Duration,

    /// How much history accompanies each generation request.
    pub context_window: ContextWindow,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            device: None,
            grace: DEFAULT_GRACE,
            context_window: ContextWindow::Full,
        }
    }
}

// ── Dependencies ───────────────────────────────────────────────────

/// The port implementations an assistant is wired to.
#[derive(Clone)]
pub struct AssistantDeps {
    /// Source of live transcript streams.
    pub transcripts: Arc<dyn TranscriptSource>,
    /// Reply generator.
    pub generator: Arc<dyn ResponseGenerator>,
    /// Speech synthesis and playback.
    pub speech: Arc<dyn SpeechSynthesizer>,
    /// Remembered-facts provider.
    pub memory: Arc<dyn MemoryProvider>,
}

// ── Commands and signals ───────────────────────────────────────────

/// Requests sent from handles to the assistant task.
enum Command {
    BeginListen,
    EndListen,
    SelectDevice(Option<InputDeviceId>),
    RefreshMemory,
    Shutdown,
}

/// Completions re-entering the assistant task from spawned work.
///
/// Every turn-scoped signal carries the lease of the turn that started
/// the work, so stale completions are dropped on arrival.
enum Signal {
    Transcript {
        lease: TurnLease,
        text: String,
    },
    TranscriptClosed {
        lease: TurnLease,
        error: Option<TranscriptError>,
    },
    GraceElapsed {
        lease: TurnLease,
    },
    Reply {
        lease: TurnLease,
        text: String,
    },
    ReplyClosed {
        lease: TurnLease,
        result: Result<String, GenerateError>,
    },
    SpeechClosed {
        lease: TurnLease,
        result: Result<SpeechOutcome, SpeechError>,
    },
    MemoryLoaded {
        result: Result<String, MemoryError>,
    },
}

/// Identity of one turn's in-flight work.
///
/// Minted fresh for each capture and each response phase. A signal whose
/// lease no longer matches the live operation belongs to a cancelled turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TurnLease(u64);

/// A live cancelable operation and the lease it was started under.
struct LiveOp {
    lease: TurnLease,
    cancel: CancellationToken,
}

// ── Assistant ──────────────────────────────────────────────────────

/// The turn-taking assistant actor.
///
/// Construct with [`Assistant::new`], take an [`AssistantHandle`] via
/// [`Assistant::handle`], then spawn [`Assistant::run`]. All state lives
/// inside the running task; handles talk to it over channels and observe
/// it through the published [`AssistantView`].
pub struct Assistant {
    /// Wired port implementations.
    deps: AssistantDeps,

    /// Configuration, mutable at runtime via commands.
    config: AssistantConfig,

    /// Command channel ends. The sender is cloned into handles.
    command_tx: mpsc::UnboundedSender<Command>,
    command_rx: mpsc::UnboundedReceiver<Command>,

    /// Signal channel ends. The sender is cloned into spawned work.
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,

    /// Event sender channel.
    event_tx: mpsc::UnboundedSender<AssistantEvent>,

    /// View publisher.
    view_tx: watch::Sender<AssistantView>,

    /// Current turn state.
    state: TurnState,

    /// Append-only conversation record.
    log: ConversationLog,

    /// Cached shareable snapshot of the log, refreshed on append.
    conversation_view: Arc<[Message]>,

    /// Headline text shown to the user.
    display: String,

    /// Status line shown to the user.
    status: String,

    /// Whether reply playback is in progress.
    speaking: bool,

    /// Current memory context, refreshed between turns.
    memory: String,

    /// Live transcript of the capture in progress.
    prompt: String,

    /// Source of fresh lease numbers.
    next_lease: u64,

    /// Capture in flight, if any.
    listen: Option<LiveOp>,

    /// Generation or playback in flight, if any. Both phases of one turn
    /// run under the same lease.
    respond: Option<LiveOp>,
}

impl Assistant {
    /// Create a new assistant.
    ///
    /// Returns the assistant and a receiver for [`AssistantEvent`]s.
    #[must_use]
    pub fn new(
        deps: AssistantDeps,
        config: AssistantConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AssistantEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(AssistantView::default());

        let assistant = Self {
            deps,
            config,
            command_tx,
            command_rx,
            signal_tx,
            signal_rx,
            event_tx,
            view_tx,
            state: TurnState::Idle,
            log: ConversationLog::new(),
            conversation_view: Arc::from(Vec::new()),
            display: WELCOME_TEXT.to_string(),
            status: TurnState::Idle.status_label().to_string(),
            speaking: false,
            memory: String::new(),
            prompt: String::new(),
            next_lease: 0,
            listen: None,
            respond: None,
        };

        (assistant, event_rx)
    }

    /// Create a handle for driving the assistant once it runs.
    #[must_use]
    pub fn handle(&self) -> AssistantHandle {
        AssistantHandle {
            command_tx: self.command_tx.clone(),
            view_rx: self.view_tx.subscribe(),
        }
    }

    /// Run the assistant until shutdown or until all handles are dropped.
    pub async fn run(mut self) {
        tracing::info!("Assistant started");
        self.load_memory();

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::BeginListen) => self.begin_listen(),
                    Some(Command::EndListen) => self.end_listen(),
                    Some(Command::SelectDevice(device)) => self.select_device(device),
                    Some(Command::RefreshMemory) => self.refresh_memory(),
                    Some(Command::Shutdown) | None => break,
                },

                Some(signal) = self.signal_rx.recv() => self.handle_signal(signal),
            }
        }

        self.halt();
        tracing::info!("Assistant stopped");
    }

    // ── Command handling ───────────────────────────────────────────

    /// Start capturing the user's speech.
    fn begin_listen(&mut self) {
        match self.state {
            TurnState::Listening => return,
            TurnState::Thinking => {
                tracing::debug!("begin_listen while thinking ignored");
                return;
            }
            TurnState::Speaking => self.interrupt_speech(),
            TurnState::Idle | TurnState::Failed => {}
        }

        let Some(device) = self.config.device.clone() else {
            if self.state == TurnState::Speaking {
                self.set_state(TurnState::Idle);
            }
            self.status = NO_DEVICE_STATUS.to_string();
            self.publish();
            return;
        };

        let lease = self.mint_lease();
        self.prompt.clear();
        self.display.clear();
        self.set_state(TurnState::Listening);
        self.start_capture(lease, device);
        self.publish();
    }

    /// Stop capturing and process what was heard once the grace interval
    /// has passed.
    fn end_listen(&mut self) {
        if self.state != TurnState::Listening {
            tracing::debug!(state = ?self.state, "end_listen outside Listening ignored");
            return;
        }
        let Some(op) = &self.listen else { return };

        // Stop pulling from the microphone. The lease stays valid through
        // the grace interval so in-flight chunks still land.
        op.cancel.cancel();
        let lease = op.lease;

        self.set_state(TurnState::Thinking);
        self.publish();

        let grace = self.config.grace;
        let signal_tx = self.signal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = signal_tx.send(Signal::GraceElapsed { lease });
        });
    }

    /// Change the capture device used by future turns.
    fn select_device(&mut self, device: Option<InputDeviceId>) {
        tracing::info!(device = ?device, "Input device selected");
        self.config.device = device;
    }

    /// Cut off playback and revoke the turn it belonged to.
    fn interrupt_speech(&mut self) {
        tracing::debug!("Barge-in, stopping playback");
        if let Some(op) = self.respond.take() {
            op.cancel.cancel();
        }
        self.deps.speech.stop();
        if self.speaking {
            self.speaking = false;
            self.emit(AssistantEvent::SpeakingFinished);
        }
    }

    // ── Signal handling ────────────────────────────────────────────

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Transcript { lease, text } => self.apply_transcript(lease, text),
            Signal::TranscriptClosed { lease, error } => self.capture_closed(lease, error),
            Signal::GraceElapsed { lease } => self.grace_elapsed(lease),
            Signal::Reply { lease, text } => self.apply_reply(lease, text),
            Signal::ReplyClosed { lease, result } => self.generation_closed(lease, result),
            Signal::SpeechClosed { lease, result } => self.speech_closed(lease, result),
            Signal::MemoryLoaded { result } => self.memory_loaded(result),
        }
    }

    /// A cumulative transcript chunk arrived from the capture.
    fn apply_transcript(&mut self, lease: TurnLease, text: String) {
        if !self.listen_is_current(lease) {
            tracing::debug!(lease = lease.0, "Stale transcript chunk ignored");
            return;
        }

        self.prompt = text;
        self.display.clone_from(&self.prompt);
        self.emit(AssistantEvent::Transcript {
            text: self.prompt.clone(),
            is_final: false,
        });
        self.publish();
    }

    /// The transcript stream ended, cleanly or with an error.
    fn capture_closed(&mut self, lease: TurnLease, error: Option<TranscriptError>) {
        if !self.listen_is_current(lease) {
            tracing::debug!(lease = lease.0, "Stale capture end ignored");
            return;
        }

        match error {
            None => {
                // The source drained on its own. Whatever was captured
                // stays in the prompt until end-listen commits it.
                tracing::debug!("Transcript stream closed");
            }
            Some(e) => {
                tracing::warn!(error = %e, "Transcription failed");
                self.listen = None;
                self.display = format!("Error during transcription: {e}");
                self.emit(AssistantEvent::Error(self.display.clone()));
                self.set_state(TurnState::Failed);
                self.publish();
            }
        }
    }

    /// The grace interval after end-listen has passed; commit the prompt.
    fn grace_elapsed(&mut self, lease: TurnLease) {
        if !self.listen_is_current(lease) {
            tracing::debug!(lease = lease.0, "Stale grace timer ignored");
            return;
        }
        self.listen = None;

        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            self.display = EMPTY_CAPTURE_TEXT.to_string();
            self.set_state(TurnState::Idle);
            self.publish();
            return;
        }

        self.emit(AssistantEvent::Transcript {
            text: prompt.clone(),
            is_final: true,
        });
        self.push_message(Message::user(prompt.clone()));
        self.start_generation(prompt);
        self.publish();
    }

    /// A progressively-complete reply chunk arrived from the generator.
    fn apply_reply(&mut self, lease: TurnLease, text: String) {
        if !self.respond_is_current(lease) {
            tracing::debug!(lease = lease.0, "Stale reply chunk ignored");
            return;
        }

        self.display.clone_from(&text);
        self.emit(AssistantEvent::Reply {
            text,
            is_final: false,
        });
        self.publish();
    }

    /// Generation finished with the final reply text or an error.
    fn generation_closed(&mut self, lease: TurnLease, result: Result<String, GenerateError>) {
        if !self.respond_is_current(lease) {
            tracing::debug!(lease = lease.0, "Stale generation result ignored");
            return;
        }

        match result {
            Ok(reply) => {
                self.display.clone_from(&reply);
                let speech_text = sanitize_for_speech(&reply);
                self.push_message(Message::assistant(reply.clone()));
                self.emit(AssistantEvent::Reply {
                    text: reply,
                    is_final: true,
                });

                self.set_state(TurnState::Speaking);
                self.speaking = true;
                self.emit(AssistantEvent::SpeakingStarted);
                self.start_speech(lease, speech_text);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Response generation failed");
                self.respond = None;
                self.display = GENERATION_FAILED_TEXT.to_string();
                self.emit(AssistantEvent::Error(e.to_string()));
                self.set_state(TurnState::Failed);
            }
        }
        self.publish();
    }

    /// Playback ended, naturally or via stop.
    fn speech_closed(&mut self, lease: TurnLease, result: Result<SpeechOutcome, SpeechError>) {
        if !self.respond_is_current(lease) {
            tracing::debug!(lease = lease.0, "Stale speech completion ignored");
            return;
        }

        self.respond = None;
        self.speaking = false;
        self.emit(AssistantEvent::SpeakingFinished);
        match result {
            Ok(outcome) => tracing::debug!(outcome = ?outcome, "Playback ended"),
            // Playback trouble is not worth failing the turn over; the
            // reply is already on screen and in the log.
            Err(e) => tracing::warn!(error = %e, "Speech playback failed"),
        }
        self.set_state(TurnState::Idle);
        self.publish();
    }

    /// A memory fetch completed. Applied only between turns.
    fn memory_loaded(&mut self, result: Result<String, MemoryError>) {
        if !matches!(self.state, TurnState::Idle | TurnState::Failed) {
            tracing::debug!("Memory refresh landed mid-turn, dropped");
            return;
        }

        match result {
            Ok(text) => {
                tracing::debug!(len = text.len(), "Memory context updated");
                self.memory = text;
            }
            Err(e) => tracing::warn!(error = %e, "Memory refresh failed"),
        }
    }

    // ── Spawned work ───────────────────────────────────────────────

    /// Open the transcript stream and relay its items as signals.
    ///
    /// Cancellation means the talk key was released, not that interest is
    /// gone: the task keeps flushing the source until the grace deadline
    /// under the same lease, so a final in-flight chunk still lands.
    fn start_capture(&mut self, lease: TurnLease, device: InputDeviceId) {
        let cancel = CancellationToken::new();
        self.listen = Some(LiveOp {
            lease,
            cancel: cancel.clone(),
        });

        let source = Arc::clone(&self.deps.transcripts);
        let signal_tx = self.signal_tx.clone();
        let grace = self.config.grace;

        tokio::spawn(async move {
            let mut opening = source.open(&device);
            let mut stream = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    // Released before the source finished opening. The open
                    // gets the grace interval too; an instant release must
                    // not lose speech the source already has ready.
                    let deadline = tokio::time::Instant::now() + grace;
                    match tokio::time::timeout_at(deadline, &mut opening).await {
                        Ok(Ok(mut stream)) => {
                            drain_until(deadline, &mut stream, lease, &signal_tx).await;
                        }
                        Ok(Err(e)) => {
                            tracing::debug!(error = %e, "Capture open failed after release");
                        }
                        Err(_) => {
                            tracing::debug!("Capture open outlived the grace interval");
                        }
                    }
                    return;
                }
                opened = &mut opening => match opened {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = signal_tx.send(Signal::TranscriptClosed {
                            lease,
                            error: Some(e),
                        });
                        return;
                    }
                },
            };

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        let deadline = tokio::time::Instant::now() + grace;
                        drain_until(deadline, &mut stream, lease, &signal_tx).await;
                        return;
                    }
                    item = stream.next() => match item {
                        Some(Ok(text)) => {
                            let _ = signal_tx.send(Signal::Transcript { lease, text });
                        }
                        Some(Err(e)) => {
                            let _ = signal_tx.send(Signal::TranscriptClosed {
                                lease,
                                error: Some(e),
                            });
                            return;
                        }
                        None => {
                            let _ = signal_tx.send(Signal::TranscriptClosed {
                                lease,
                                error: None,
                            });
                            return;
                        }
                    },
                }
            }
        });
    }

    /// Start generating a reply for the committed prompt.
    fn start_generation(&mut self, prompt: String) {
        let lease = self.mint_lease();
        let cancel = CancellationToken::new();
        self.respond = Some(LiveOp {
            lease,
            cancel: cancel.clone(),
        });

        // Snapshot everything the turn needs now; configuration and memory
        // changes made later must not leak into this turn.
        let request = GenerateRequest {
            prompt,
            history: self.config.context_window.select(self.log.entries()).to_vec(),
            memory: self.memory.clone(),
        };
        let generator = Arc::clone(&self.deps.generator);
        let signal_tx = self.signal_tx.clone();

        tokio::spawn(async move {
            let mut stream = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                opened = generator.generate(request) => match opened {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = signal_tx.send(Signal::ReplyClosed {
                            lease,
                            result: Err(e),
                        });
                        return;
                    }
                },
            };

            let mut latest: Option<String> = None;
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    item = stream.next() => match item {
                        Some(Ok(text)) => {
                            let _ = signal_tx.send(Signal::Reply {
                                lease,
                                text: text.clone(),
                            });
                            latest = Some(text);
                        }
                        Some(Err(e)) => {
                            let _ = signal_tx.send(Signal::ReplyClosed {
                                lease,
                                result: Err(e),
                            });
                            return;
                        }
                        None => {
                            let result = latest.ok_or(GenerateError::EmptyReply);
                            let _ = signal_tx.send(Signal::ReplyClosed { lease, result });
                            return;
                        }
                    },
                }
            }
        });
    }

    /// Play the reply aloud and report how playback ended.
    ///
    /// No cancellation token here: barge-in and shutdown go through
    /// [`SpeechSynthesizer::stop`], which resolves the in-flight `speak`.
    fn start_speech(&self, lease: TurnLease, text: String) {
        let speech = Arc::clone(&self.deps.speech);
        let signal_tx = self.signal_tx.clone();

        tokio::spawn(async move {
            let result = speech.speak(&text).await;
            let _ = signal_tx.send(Signal::SpeechClosed { lease, result });
        });
    }

    /// One-time memory setup plus the initial fetch.
    fn load_memory(&self) {
        let memory = Arc::clone(&self.deps.memory);
        let signal_tx = self.signal_tx.clone();

        tokio::spawn(async move {
            let result = match memory.prepare().await {
                Ok(()) => memory.recall().await,
                Err(e) => Err(e),
            };
            let _ = signal_tx.send(Signal::MemoryLoaded { result });
        });
    }

    /// Fetch the memory context again.
    fn refresh_memory(&self) {
        let memory = Arc::clone(&self.deps.memory);
        let signal_tx = self.signal_tx.clone();

        tokio::spawn(async move {
            let result = memory.recall().await;
            let _ = signal_tx.send(Signal::MemoryLoaded { result });
        });
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Cancel everything in flight on the way out.
    fn halt(&mut self) {
        if let Some(op) = self.listen.take() {
            op.cancel.cancel();
        }
        if let Some(op) = self.respond.take() {
            op.cancel.cancel();
        }
        self.deps.speech.stop();
        if self.speaking {
            self.speaking = false;
            self.emit(AssistantEvent::SpeakingFinished);
        }
        self.set_state(TurnState::Idle);
        self.publish();
    }

    fn mint_lease(&mut self) -> TurnLease {
        self.next_lease += 1;
        TurnLease(self.next_lease)
    }

    fn listen_is_current(&self, lease: TurnLease) -> bool {
        self.listen.as_ref().is_some_and(|op| op.lease == lease)
    }

    fn respond_is_current(&self, lease: TurnLease) -> bool {
        self.respond.as_ref().is_some_and(|op| op.lease == lease)
    }

    /// Append to the log and refresh the shared snapshot.
    fn push_message(&mut self, message: Message) {
        self.log.append(message);
        self.conversation_view = self.log.snapshot();
    }

    /// Transition to a new state, updating the status line and emitting a
    /// state-change event.
    fn set_state(&mut self, new_state: TurnState) {
        if self.state != new_state {
            tracing::debug!(old = ?self.state, new = ?new_state, "Turn state transition");
            self.state = new_state;
            self.status = new_state.status_label().to_string();
            self.emit(AssistantEvent::StateChanged(new_state));
        }
    }

    /// Emit an event (best-effort; if the receiver is dropped, log and move on).
    fn emit(&self, event: AssistantEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Assistant event receiver dropped");
        }
    }

    /// Publish the current view snapshot.
    fn publish(&self) {
        self.view_tx.send_replace(AssistantView {
            state: self.state,
            display: self.display.clone(),
            status: self.status.clone(),
            speaking: self.speaking,
            conversation: Arc::clone(&self.conversation_view),
        });
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Forward transcript chunks until the stream drains or `deadline` passes.
///
/// Called when the talk key is released. The lease stays valid for one
/// grace interval past the release, so chunks the source can still produce
/// inside that window land in the prompt; anything slower is abandoned.
async fn drain_until(
    deadline: tokio::time::Instant,
    stream: &mut TranscriptStream,
    lease: TurnLease,
    signal_tx: &mpsc::UnboundedSender<Signal>,
) {
    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(Ok(text))) => {
                let _ = signal_tx.send(Signal::Transcript { lease, text });
            }
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "Transcript error after release dropped");
                return;
            }
            Ok(None) => return,
            Err(_) => {
                tracing::debug!("Capture source still busy when the grace interval ended");
                return;
            }
        }
    }
}

// ── Handle ─────────────────────────────────────────────────────────

/// Cloneable driver for a running [`Assistant`].
///
/// Commands are fire-and-forget; their effects show up in the published
/// [`AssistantView`] and the event stream.
#[derive(Clone)]
pub struct AssistantHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    view_rx: watch::Receiver<AssistantView>,
}

impl AssistantHandle {
    /// Start capturing speech (push-to-talk pressed).
    ///
    /// Interrupts playback when called while the assistant is speaking.
    pub fn begin_listen(&self) -> Result<(), AgentError> {
        self.send(Command::BeginListen)
    }

    /// Stop capturing and process the result (push-to-talk released).
    pub fn end_listen_and_process(&self) -> Result<(), AgentError> {
        self.send(Command::EndListen)
    }

    /// Select the input device used by future turns.
    pub fn select_device(&self, device: Option<InputDeviceId>) -> Result<(), AgentError> {
        self.send(Command::SelectDevice(device))
    }

    /// Refresh the memory context. Applied once the assistant is idle.
    pub fn refresh_memory(&self) -> Result<(), AgentError> {
        self.send(Command::RefreshMemory)
    }

    /// Shut the assistant down, cancelling any turn in flight.
    pub fn shutdown(&self) -> Result<(), AgentError> {
        self.send(Command::Shutdown)
    }

    /// Snapshot of the current view.
    #[must_use]
    pub fn view(&self) -> AssistantView {
        self.view_rx.borrow().clone()
    }

    /// Subscribe to view updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AssistantView> {
        self.view_rx.clone()
    }

    fn send(&self, command: Command) -> Result<(), AgentError> {
        self.command_tx.send(command).map_err(|_| AgentError::Stopped)
    }
}

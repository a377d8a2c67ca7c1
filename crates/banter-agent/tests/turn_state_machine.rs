//! Integration tests for the assistant turn state machine.
//!
//! These tests drive a running assistant through whole turns using mock
//! ports. No audio hardware, model backend, or wall-clock waiting is
//! involved: transcript and reply streams are scripted, playback is
//! simulated, and the tokio clock starts paused so grace intervals elapse
//! instantly.
//!
//! # What is tested
//!
//! - A full turn walks Idle → Listening → Thinking → Speaking → Idle and
//!   appends a user/assistant entry pair
//! - Reply partials stream to the display before the final text
//! - Chunks still in flight when the talk key is released land during the
//!   grace interval and reach the committed prompt
//! - Empty captures produce a notice and leave the conversation untouched
//! - Listening without a configured device reports the device status line
//! - Transcription and generation failures reach Failed and recover on the
//!   next turn
//! - Playback failure ends the turn at Idle with the reply kept
//! - Barge-in during playback goes straight back to Listening, and the
//!   orphaned playback completion is discarded
//! - `begin_listen` during Listening or Thinking is ignored
//! - Memory and windowed history reach the generator, snapshotted per turn
//! - Shutdown refuses further commands

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use banter_agent::{
    Assistant, AssistantConfig, AssistantDeps, AssistantEvent, AssistantHandle, AssistantView,
    ContextWindow, EMPTY_CAPTURE_TEXT, GENERATION_FAILED_TEXT, NO_DEVICE_STATUS, TurnState,
    WELCOME_TEXT, sanitize_for_speech,
};
use banter_core::domain::MessageRole;
use banter_core::ports::{
    GenerateError, GenerateRequest, InputDeviceId, MemoryError, MemoryProvider, ReplyStream,
    ResponseGenerator, SpeechError, SpeechOutcome, SpeechSynthesizer, StaticMemory,
    TranscriptError, TranscriptSource, TranscriptStream,
};

// ── Mock ports ─────────────────────────────────────────────────────

/// Transcript source that replays one scripted stream per `open` call.
struct ScriptedTranscripts {
    scripts: Mutex<VecDeque<Vec<Result<String, TranscriptError>>>>,
}

impl ScriptedTranscripts {
    fn new(scripts: Vec<Vec<Result<String, TranscriptError>>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
        }
    }
}

#[async_trait]
impl TranscriptSource for ScriptedTranscripts {
    async fn open(&self, _device: &InputDeviceId) -> Result<TranscriptStream, TranscriptError> {
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(stream::iter(script).boxed())
    }
}

/// Transcript source whose `open` always fails.
struct BrokenMicrophone;

#[async_trait]
impl TranscriptSource for BrokenMicrophone {
    async fn open(&self, _device: &InputDeviceId) -> Result<TranscriptStream, TranscriptError> {
        Err(TranscriptError::DeviceUnavailable("unplugged".to_string()))
    }
}

/// Generator that replays one scripted reply stream per request and
/// records every request it receives.
struct ScriptedGenerator {
    scripts: Mutex<VecDeque<Vec<Result<String, GenerateError>>>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedGenerator {
    fn new(scripts: Vec<Vec<Result<String, GenerateError>>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerateRequest) -> Result<ReplyStream, GenerateError> {
        self.requests.lock().unwrap().push(request);
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(stream::iter(script).boxed())
    }
}

/// Generator whose reply stream never yields, pinning the turn in Thinking.
struct PendingGenerator;

#[async_trait]
impl ResponseGenerator for PendingGenerator {
    async fn generate(&self, _request: GenerateRequest) -> Result<ReplyStream, GenerateError> {
        Ok(stream::pending().boxed())
    }
}

/// Synthesizer that finishes instantly and records what it was asked to say.
#[derive(Default)]
struct InstantSpeech {
    spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SpeechSynthesizer for InstantSpeech {
    async fn speak(&self, text: &str) -> Result<SpeechOutcome, SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(SpeechOutcome::Finished)
    }

    fn stop(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Synthesizer that keeps playing until `stop` is called.
struct ManualSpeech {
    stopper: CancellationToken,
    speaking: Arc<AtomicBool>,
}

impl ManualSpeech {
    fn new() -> Self {
        Self {
            stopper: CancellationToken::new(),
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ManualSpeech {
    async fn speak(&self, _text: &str) -> Result<SpeechOutcome, SpeechError> {
        self.speaking.store(true, Ordering::SeqCst);
        self.stopper.cancelled().await;
        self.speaking.store(false, Ordering::SeqCst);
        Ok(SpeechOutcome::Stopped)
    }

    fn stop(&self) {
        self.stopper.cancel();
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// Synthesizer whose playback always fails.
struct FaultySpeech;

#[async_trait]
impl SpeechSynthesizer for FaultySpeech {
    async fn speak(&self, _text: &str) -> Result<SpeechOutcome, SpeechError> {
        Err(SpeechError::Playback("no audio output".into()))
    }

    fn stop(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Memory provider whose facts the test can change between turns.
struct SwappableMemory {
    facts: Arc<Mutex<String>>,
}

impl SwappableMemory {
    fn new(facts: &str) -> Self {
        Self {
            facts: Arc::new(Mutex::new(facts.to_string())),
        }
    }

    fn set(&self, facts: &str) {
        *self.facts.lock().unwrap() = facts.to_string();
    }
}

#[async_trait]
impl MemoryProvider for SwappableMemory {
    async fn prepare(&self) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn recall(&self) -> Result<String, MemoryError> {
        Ok(self.facts.lock().unwrap().clone())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn mic() -> InputDeviceId {
    InputDeviceId::new("mock-mic")
}

fn talk_config() -> AssistantConfig {
    AssistantConfig {
        device: Some(mic()),
        ..AssistantConfig::default()
    }
}

/// Build deps around scripted capture and reply streams, returning the
/// recorded generator requests and spoken texts alongside.
fn scripted_deps(
    captures: Vec<Vec<Result<String, TranscriptError>>>,
    replies: Vec<Vec<Result<String, GenerateError>>>,
) -> (
    AssistantDeps,
    Arc<Mutex<Vec<GenerateRequest>>>,
    Arc<Mutex<Vec<String>>>,
) {
    let generator = ScriptedGenerator::new(replies);
    let requests = Arc::clone(&generator.requests);
    let speech = InstantSpeech::default();
    let spoken = Arc::clone(&speech.spoken);

    let deps = AssistantDeps {
        transcripts: Arc::new(ScriptedTranscripts::new(captures)),
        generator: Arc::new(generator),
        speech: Arc::new(speech),
        memory: Arc::new(StaticMemory::default()),
    };
    (deps, requests, spoken)
}

fn spawn_assistant(
    deps: AssistantDeps,
    config: AssistantConfig,
) -> (
    AssistantHandle,
    mpsc::UnboundedReceiver<AssistantEvent>,
    watch::Receiver<AssistantView>,
) {
    let (assistant, events) = Assistant::new(deps, config);
    let handle = assistant.handle();
    let views = handle.subscribe();
    tokio::spawn(assistant.run());
    (handle, events, views)
}

/// Receive events until `target` is reached, returning everything seen.
async fn wait_for_state(
    events: &mut mpsc::UnboundedReceiver<AssistantEvent>,
    target: TurnState,
) -> Vec<AssistantEvent> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {target:?}, saw {seen:?}"))
            .expect("event channel closed");
        let matched = matches!(event, AssistantEvent::StateChanged(s) if s == target);
        seen.push(event);
        if matched {
            return seen;
        }
    }
}

/// Wait until the published view satisfies `predicate`.
async fn wait_for_view<F>(
    views: &mut watch::Receiver<AssistantView>,
    what: &str,
    predicate: F,
) -> AssistantView
where
    F: FnMut(&AssistantView) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), views.wait_for(predicate))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .expect("view channel closed")
        .clone()
}

/// Drain all pending events from the event receiver and return them.
fn drain_events(rx: &mut mpsc::UnboundedReceiver<AssistantEvent>) -> Vec<AssistantEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

/// Collect only the TurnState values from StateChanged events.
fn states_from(events: &[AssistantEvent]) -> Vec<TurnState> {
    events
        .iter()
        .filter_map(|e| {
            if let AssistantEvent::StateChanged(s) = e {
                Some(*s)
            } else {
                None
            }
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn initial_view_shows_welcome() {
    let (deps, _, _) = scripted_deps(vec![], vec![]);
    let (handle, _events, _views) = spawn_assistant(deps, talk_config());

    let view = handle.view();
    assert_eq!(view.state, TurnState::Idle);
    assert_eq!(view.display, WELCOME_TEXT);
    assert_eq!(view.status, "Idle");
    assert!(view.conversation.is_empty());
}

#[tokio::test(start_paused = true)]
async fn full_turn_appends_paired_entries() {
    let reply = "Hi there! *waves*";
    let (deps, _, spoken) = scripted_deps(
        vec![vec![Ok("hello".into()), Ok("hello there".into())]],
        vec![vec![Ok("Hi".into()), Ok(reply.into())]],
    );
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "live transcript", |v| v.display == "hello there").await;
    handle.end_listen_and_process().unwrap();

    let seen = wait_for_state(&mut events, TurnState::Idle).await;

    assert_eq!(
        states_from(&seen),
        vec![
            TurnState::Listening,
            TurnState::Thinking,
            TurnState::Speaking,
            TurnState::Idle,
        ]
    );
    assert!(seen.iter().any(|e| matches!(e, AssistantEvent::SpeakingStarted)));
    assert!(seen.iter().any(|e| matches!(e, AssistantEvent::SpeakingFinished)));

    let view = handle.view();
    assert_eq!(view.display, reply);
    assert!(!view.speaking);
    assert_eq!(view.conversation.len(), 2);
    assert_eq!(view.conversation[0].role, MessageRole::User);
    assert_eq!(view.conversation[0].content, "hello there");
    assert_eq!(view.conversation[1].role, MessageRole::Assistant);
    assert_eq!(view.conversation[1].content, reply);

    // Playback gets the cleaned-up text, not the raw reply.
    assert_eq!(*spoken.lock().unwrap(), vec![sanitize_for_speech(reply)]);
}

#[tokio::test(start_paused = true)]
async fn reply_partials_stream_to_display() {
    let (deps, _, _) = scripted_deps(
        vec![vec![Ok("what is two plus two".into())]],
        vec![vec![
            Ok("Two".into()),
            Ok("Two plus two".into()),
            Ok("Two plus two is four.".into()),
        ]],
    );
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "live transcript", |v| {
        v.display == "what is two plus two"
    })
    .await;
    handle.end_listen_and_process().unwrap();
    let seen = wait_for_state(&mut events, TurnState::Idle).await;

    let partials: Vec<&str> = seen
        .iter()
        .filter_map(|e| match e {
            AssistantEvent::Reply {
                text,
                is_final: false,
            } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(partials, vec!["Two", "Two plus two", "Two plus two is four."]);

    assert!(seen.iter().any(|e| matches!(
        e,
        AssistantEvent::Reply { text, is_final: true } if text == "Two plus two is four."
    )));
    assert_eq!(handle.view().display, "Two plus two is four.");
}

#[tokio::test(start_paused = true)]
async fn chunks_in_flight_at_release_land_during_grace() {
    let (deps, _, _) = scripted_deps(
        vec![vec![Ok("hi".into()), Ok("hi there".into())]],
        vec![vec![Ok("Hello!".into())]],
    );
    let (handle, mut events, _views) = spawn_assistant(deps, talk_config());

    // Release immediately: neither chunk has been applied yet, so both are
    // still in flight when the grace interval starts.
    handle.begin_listen().unwrap();
    handle.end_listen_and_process().unwrap();
    let seen = wait_for_state(&mut events, TurnState::Idle).await;

    // The chunks landed after Thinking began, and the newest one became
    // the committed prompt.
    let thinking_at = seen
        .iter()
        .position(|e| matches!(e, AssistantEvent::StateChanged(TurnState::Thinking)))
        .expect("turn reached Thinking");
    let chunk_at = seen
        .iter()
        .position(|e| matches!(
            e,
            AssistantEvent::Transcript { text, is_final: false } if text == "hi there"
        ))
        .expect("late chunk was applied");
    assert!(thinking_at < chunk_at, "chunk should land inside the grace interval");
    assert!(seen.iter().any(|e| matches!(
        e,
        AssistantEvent::Transcript { text, is_final: true } if text == "hi there"
    )));

    let view = handle.view();
    assert_eq!(view.conversation.len(), 2);
    assert_eq!(view.conversation[0].content, "hi there");
    assert_eq!(view.conversation[1].content, "Hello!");
}

#[tokio::test(start_paused = true)]
async fn empty_capture_reports_notice_without_entries() {
    let (deps, requests, _) = scripted_deps(vec![vec![Ok("   ".into())]], vec![]);
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "blank transcript", |v| v.display == "   ").await;
    handle.end_listen_and_process().unwrap();
    let seen = wait_for_state(&mut events, TurnState::Idle).await;

    assert_eq!(
        states_from(&seen),
        vec![TurnState::Listening, TurnState::Thinking, TurnState::Idle]
    );

    let view = handle.view();
    assert_eq!(view.display, EMPTY_CAPTURE_TEXT);
    assert!(view.conversation.is_empty());
    assert!(requests.lock().unwrap().is_empty(), "generator must not run");
}

#[tokio::test(start_paused = true)]
async fn listening_without_device_reports_status() {
    let (deps, _, _) = scripted_deps(vec![vec![Ok("now it works".into())]], vec![vec![Ok(
        "Good.".into(),
    )]]);
    let config = AssistantConfig {
        device: None,
        ..AssistantConfig::default()
    };
    let (handle, mut events, mut views) = spawn_assistant(deps, config);

    handle.begin_listen().unwrap();
    let view = wait_for_view(&mut views, "device status", |v| v.status == NO_DEVICE_STATUS).await;
    assert_eq!(view.state, TurnState::Idle);

    // Selecting a device unblocks listening.
    handle.select_device(Some(mic())).unwrap();
    handle.begin_listen().unwrap();
    let seen = wait_for_state(&mut events, TurnState::Listening).await;
    assert_eq!(states_from(&seen), vec![TurnState::Listening]);
}

#[tokio::test(start_paused = true)]
async fn transcription_failure_fails_turn_and_recovers() {
    let (deps, _, _) = scripted_deps(
        vec![
            vec![
                Ok("hi".into()),
                Err(TranscriptError::Stream("decoder died".into())),
            ],
            vec![Ok("hello again".into())],
        ],
        vec![vec![Ok("Welcome back.".into())]],
    );
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_state(&mut events, TurnState::Failed).await;

    let view = handle.view();
    assert!(view.display.starts_with("Error during transcription:"));
    assert!(view.display.contains("decoder died"));
    assert_eq!(view.status, "Error");
    assert!(view.conversation.is_empty());

    // The next push-to-talk starts a clean turn.
    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "second capture", |v| v.display == "hello again").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Idle).await;

    let view = handle.view();
    assert_eq!(view.conversation.len(), 2);
    assert_eq!(view.conversation[1].content, "Welcome back.");
}

#[tokio::test(start_paused = true)]
async fn unopenable_device_fails_turn() {
    let deps = AssistantDeps {
        transcripts: Arc::new(BrokenMicrophone),
        generator: Arc::new(ScriptedGenerator::new(vec![])),
        speech: Arc::new(InstantSpeech::default()),
        memory: Arc::new(StaticMemory::default()),
    };
    let (handle, mut events, _views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_state(&mut events, TurnState::Failed).await;

    let view = handle.view();
    assert!(view.display.contains("unplugged"));
}

#[tokio::test(start_paused = true)]
async fn generation_failure_keeps_lone_user_entry() {
    let (deps, _, _) = scripted_deps(
        vec![vec![Ok("tell me a joke".into())], vec![Ok("try again".into())]],
        vec![
            vec![Err(GenerateError::Backend("model exploded".into()))],
            vec![Ok("Second time lucky.".into())],
        ],
    );
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "first capture", |v| v.display == "tell me a joke").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Failed).await;

    let view = handle.view();
    assert_eq!(view.display, GENERATION_FAILED_TEXT);
    assert_eq!(view.status, "Error");
    assert_eq!(view.conversation.len(), 1, "user entry stays in the log");
    assert_eq!(view.conversation[0].role, MessageRole::User);

    // Recovery on the next turn.
    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "second capture", |v| v.display == "try again").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Idle).await;
    assert_eq!(handle.view().conversation.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn reply_stream_without_text_fails_turn() {
    let (deps, _, _) = scripted_deps(vec![vec![Ok("anyone there".into())]], vec![vec![]]);
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "capture", |v| v.display == "anyone there").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Failed).await;

    assert_eq!(handle.view().display, GENERATION_FAILED_TEXT);
}

#[tokio::test(start_paused = true)]
async fn playback_failure_still_completes_the_turn() {
    let deps = AssistantDeps {
        transcripts: Arc::new(ScriptedTranscripts::new(vec![vec![Ok(
            "read this aloud".into(),
        )]])),
        generator: Arc::new(ScriptedGenerator::new(vec![vec![Ok("Reading it.".into())]])),
        speech: Arc::new(FaultySpeech),
        memory: Arc::new(StaticMemory::default()),
    };
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "capture", |v| v.display == "read this aloud").await;
    handle.end_listen_and_process().unwrap();
    let seen = wait_for_state(&mut events, TurnState::Idle).await;

    // The reply is already on screen and in the log; a broken speaker must
    // not turn that into a failed turn.
    assert_eq!(
        states_from(&seen),
        vec![
            TurnState::Listening,
            TurnState::Thinking,
            TurnState::Speaking,
            TurnState::Idle,
        ]
    );
    assert!(seen.iter().any(|e| matches!(e, AssistantEvent::SpeakingFinished)));
    assert!(!seen.iter().any(|e| matches!(e, AssistantEvent::Error(_))));

    let view = handle.view();
    assert_eq!(view.display, "Reading it.");
    assert!(!view.speaking);
    assert_eq!(view.conversation.len(), 2);
    assert_eq!(view.conversation[1].content, "Reading it.");
}

#[tokio::test(start_paused = true)]
async fn barge_in_goes_straight_to_listening() {
    let generator = ScriptedGenerator::new(vec![vec![Ok("A long, long story.".into())]]);
    let deps = AssistantDeps {
        transcripts: Arc::new(ScriptedTranscripts::new(vec![
            vec![Ok("tell me a story".into())],
            vec![Ok("never mind".into())],
        ])),
        generator: Arc::new(generator),
        speech: Arc::new(ManualSpeech::new()),
        memory: Arc::new(StaticMemory::default()),
    };
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "capture", |v| v.display == "tell me a story").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Speaking).await;

    // Press the talk key while the reply is playing.
    handle.begin_listen().unwrap();
    let seen = wait_for_state(&mut events, TurnState::Listening).await;

    assert_eq!(
        states_from(&seen),
        vec![TurnState::Listening],
        "barge-in must not pass through Idle"
    );
    assert!(seen.iter().any(|e| matches!(e, AssistantEvent::SpeakingFinished)));

    let view = handle.view();
    assert_eq!(view.state, TurnState::Listening);
    assert!(!view.speaking);

    // The orphaned playback completion must not drag the new turn to Idle.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let late = drain_events(&mut events);
    assert!(
        !states_from(&late).contains(&TurnState::Idle),
        "stale playback completion leaked through: {late:?}"
    );
    assert_eq!(handle.view().state, TurnState::Listening);
}

#[tokio::test(start_paused = true)]
async fn begin_listen_while_listening_keeps_the_capture() {
    // A second script that must never be opened.
    let (deps, requests, _) = scripted_deps(
        vec![
            vec![Ok("first capture".into())],
            vec![Ok("REOPENED".into())],
        ],
        vec![vec![Ok("Noted.".into())]],
    );
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "capture", |v| v.display == "first capture").await;
    drain_events(&mut events);

    // Pressing the talk key again while already listening does nothing.
    handle.begin_listen().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(states_from(&drain_events(&mut events)).is_empty());
    assert_eq!(handle.view().display, "first capture");

    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Idle).await;

    let view = handle.view();
    assert_eq!(view.conversation[0].content, "first capture");
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn begin_listen_while_thinking_is_ignored() {
    let deps = AssistantDeps {
        transcripts: Arc::new(ScriptedTranscripts::new(vec![vec![Ok("hold on".into())]])),
        generator: Arc::new(PendingGenerator),
        speech: Arc::new(InstantSpeech::default()),
        memory: Arc::new(StaticMemory::default()),
    };
    let (handle, mut events, mut views) = spawn_assistant(deps, talk_config());

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "capture", |v| v.display == "hold on").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Thinking).await;

    handle.begin_listen().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(states_from(&drain_events(&mut events)).is_empty());
    assert_eq!(handle.view().state, TurnState::Thinking);
}

#[tokio::test(start_paused = true)]
async fn memory_and_windowed_history_reach_generator() {
    let memory = SwappableMemory::new("The user's name is Ada.");
    let facts = Arc::clone(&memory.facts);
    let generator = ScriptedGenerator::new(vec![
        vec![Ok("Hello Ada.".into())],
        vec![Ok("Tea it is.".into())],
    ]);
    let requests = Arc::clone(&generator.requests);

    let deps = AssistantDeps {
        transcripts: Arc::new(ScriptedTranscripts::new(vec![
            vec![Ok("hello".into())],
            vec![Ok("make tea".into())],
        ])),
        generator: Arc::new(generator),
        speech: Arc::new(InstantSpeech::default()),
        memory: Arc::new(SwappableMemory {
            facts: Arc::clone(&facts),
        }),
    };
    let config = AssistantConfig {
        context_window: ContextWindow::RecentMessages(2),
        ..talk_config()
    };
    let (handle, mut events, mut views) = spawn_assistant(deps, config);

    // Let the initial memory load land before the first turn.
    tokio::time::sleep(Duration::from_millis(10)).await;

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "first capture", |v| v.display == "hello").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Idle).await;

    {
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "hello");
        assert_eq!(requests[0].memory, "The user's name is Ada.");
        // The freshly appended user message is the newest history entry.
        assert_eq!(requests[0].history.len(), 1);
        assert_eq!(requests[0].history[0].content, "hello");
    }

    // Change the facts between turns and refresh.
    memory.set("The user's name is Ada. She prefers tea.");
    handle.refresh_memory().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    handle.begin_listen().unwrap();
    wait_for_view(&mut views, "second capture", |v| v.display == "make tea").await;
    handle.end_listen_and_process().unwrap();
    wait_for_state(&mut events, TurnState::Idle).await;

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].memory, "The user's name is Ada. She prefers tea.");
    // Window of two out of [user, assistant, user].
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[0].role, MessageRole::Assistant);
    assert_eq!(requests[1].history[0].content, "Hello Ada.");
    assert_eq!(requests[1].history[1].role, MessageRole::User);
    assert_eq!(requests[1].history[1].content, "make tea");
}

#[tokio::test(start_paused = true)]
async fn shutdown_refuses_further_commands() {
    let (deps, _, _) = scripted_deps(vec![], vec![]);
    let (handle, mut events, _views) = spawn_assistant(deps, talk_config());

    handle.shutdown().unwrap();

    // The event channel closes once the assistant task exits.
    let closed = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for shutdown");
    assert!(closed.is_none());

    assert!(handle.begin_listen().is_err());
}

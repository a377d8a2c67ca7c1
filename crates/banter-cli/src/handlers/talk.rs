//! Talk command handler: the interactive console session.
//!
//! Each typed line is one push-to-talk turn: the line is queued for the
//! simulated capture, the talk key is "pressed", and once the whole line
//! has streamed through the live transcript the key is "released". The
//! reply then streams and plays without blocking the loop, so typing the
//! next line during playback barges in, exactly as holding the real talk
//! key would.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use banter_agent::{AssistantConfig, AssistantView, ContextWindow, TurnState};
use banter_core::domain::Message;
use banter_core::ports::{DeviceRegistry, InputDeviceId, MemoryProvider, StaticMemory};

use crate::bootstrap::{Session, start_session};
use crate::facts::FactsFile;
use crate::sim;

/// Command words recognised by the talk loop.
const QUIT_COMMAND: &str = "/quit";
const REFRESH_COMMAND: &str = "/refresh";

/// How long to wait for the assistant to accept a begin-listen.
const LISTEN_ACK_WAIT: Duration = Duration::from_millis(500);

/// Arguments for the talk command.
#[derive(Debug, Clone)]
pub struct TalkArgs {
    pub device: Option<String>,
    pub memory_file: Option<PathBuf>,
    pub save_transcript: Option<PathBuf>,
    pub grace_ms: u64,
    pub history_window: Option<usize>,
}

/// Execute the talk command.
pub async fn execute(registry: &dyn DeviceRegistry, args: TalkArgs) -> Result<()> {
    let device = resolve_device(registry, args.device.as_deref()).await?;
    match &device {
        Some(id) => println!("Using input device: {id}"),
        None => println!("No input device available; captures will be refused until one is."),
    }

    let memory: Arc<dyn MemoryProvider> = match &args.memory_file {
        Some(path) => Arc::new(FactsFile::new(path)),
        None => Arc::new(StaticMemory::default()),
    };

    let config = AssistantConfig {
        device,
        grace: Duration::from_millis(args.grace_ms),
        context_window: args
            .history_window
            .map_or(ContextWindow::Full, ContextWindow::RecentMessages),
    };

    let session = start_session(config, memory);
    run_loop(&session).await?;

    if let Some(path) = &args.save_transcript {
        let conversation = session.handle.view().conversation;
        save_transcript(path, &conversation)?;
    }
    let _ = session.handle.shutdown();
    Ok(())
}

/// Pick the capture device for the session.
///
/// An explicit name must match a listed device; without one the system
/// default is used when it exists. `Ok(None)` leaves the assistant in its
/// no-microphone state.
async fn resolve_device(
    registry: &dyn DeviceRegistry,
    requested: Option<&str>,
) -> Result<Option<InputDeviceId>> {
    let Some(name) = requested else {
        return Ok(registry.default_device().await?.map(|d| d.id));
    };

    let devices = registry.list().await?;
    if let Some(device) = devices.iter().find(|d| d.name.eq_ignore_ascii_case(name)) {
        return Ok(Some(device.id.clone()));
    }

    if devices.is_empty() {
        bail!("No input device named '{name}'; no input devices were found at all");
    }
    let known: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
    bail!(
        "No input device named '{name}'. Known devices: {}",
        known.join(", ")
    );
}

/// Read stdin lines and turn them into conversation turns until
/// `/quit` or end of input.
async fn run_loop(session: &Session) -> Result<()> {
    println!();
    println!("Type a line and press Enter to speak it.");
    println!("  {REFRESH_COMMAND}  reload remembered facts");
    println!("  {QUIT_COMMAND}     end the session");
    println!();

    let renderer = tokio::spawn(render_views(session.handle.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            QUIT_COMMAND => break,
            REFRESH_COMMAND => {
                session.handle.refresh_memory()?;
                println!("(memory will refresh before the next turn)");
            }
            _ => speak_line(session, line).await?,
        }
    }

    renderer.abort();
    Ok(())
}

/// Run one push-to-talk turn for a typed line.
async fn speak_line(session: &Session, line: &str) -> Result<()> {
    // The capture echoes words back with single spaces; compare against
    // the same shape.
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");

    if session.handle.view().state == TurnState::Thinking {
        println!("(one moment, still working on the last turn)");
        return Ok(());
    }

    session.utterances.push(line.clone());
    session.handle.begin_listen()?;

    let mut views = session.handle.subscribe();

    // The capture clears the display when it opens. If Listening never
    // arrives the assistant refused the turn (no device, or a busy race)
    // and the queued line has to come back out.
    let refused = tokio::time::timeout(
        LISTEN_ACK_WAIT,
        views.wait_for(|v| v.state == TurnState::Listening),
    )
    .await
    .is_err();
    if refused {
        session.utterances.clear();
        return Ok(());
    }

    // Hold the key until the whole line is on display, then release. A
    // failed capture leaves Listening on its own; the timeout is only a
    // backstop.
    let _ = tokio::time::timeout(
        capture_budget(&line),
        views.wait_for(|v| v.state != TurnState::Listening || v.display == line),
    )
    .await;

    if session.handle.view().state == TurnState::Listening {
        session.handle.end_listen_and_process()?;
    }
    Ok(())
}

/// Generous upper bound on how long a line takes to stream through the
/// simulated capture.
fn capture_budget(line: &str) -> Duration {
    let words = u32::try_from(line.split_whitespace().count()).unwrap_or(u32::MAX);
    sim::TYPING_PACE.saturating_mul(words.saturating_mul(2)) + Duration::from_secs(1)
}

// ── Rendering ──────────────────────────────────────────────────────

/// Render published view snapshots to the console.
///
/// Streaming text rewrites one transient line in place; latest snapshot
/// wins, exactly like the display field itself. Notices and error text
/// get their own scrollback lines, as do statuses beyond the implicit
/// state labels (the no-microphone message).
async fn render_views(mut views: watch::Receiver<AssistantView>) {
    let mut shown = views.borrow().clone();
    let mut live = TransientLine::default();

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();

        if view.status != shown.status && view.status != view.state.status_label() {
            live.finish();
            println!("-- {}", view.status);
        }

        if view.display == shown.display {
            // A turn just ended; leave its last line standing.
            if matches!(view.state, TurnState::Idle | TurnState::Failed) {
                live.finish();
            }
        } else {
            match view.state {
                TurnState::Listening => live.rewrite(&format!("you: {}", view.display)),
                TurnState::Thinking | TurnState::Speaking => {
                    live.rewrite(&format!("banter: {}", view.display));
                }
                TurnState::Idle | TurnState::Failed => {
                    live.finish();
                    println!("{}", view.display);
                }
            }
        }

        shown = view;
    }
}

/// One console line rewritten in place as streaming text refines.
#[derive(Debug, Default)]
struct TransientLine {
    width: usize,
}

impl TransientLine {
    /// Replace the line's contents, padding over any leftover characters.
    fn rewrite(&mut self, text: &str) {
        let len = text.chars().count();
        let pad = self.width.saturating_sub(len);
        print!("\r{text}{:pad$}", "");
        let _ = std::io::stdout().flush();
        self.width = len;
    }

    /// Commit the line to the scrollback.
    fn finish(&mut self) {
        if self.width > 0 {
            println!();
            self.width = 0;
        }
    }
}

// ── Transcript export ──────────────────────────────────────────────

/// Export the conversation as pretty-printed JSON.
fn save_transcript(path: &Path, conversation: &[Message]) -> Result<()> {
    let json = serde_json::to_string_pretty(conversation).context("Failed to encode transcript")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
    println!("Transcript written to {}", path.display());
    Ok(())
}

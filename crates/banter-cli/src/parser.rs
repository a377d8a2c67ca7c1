//! CLI parser: the root argument structure and its subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface definition for the banter voice assistant.
#[derive(Parser)]
#[command(name = "banter")]
#[command(about = "Push-to-talk voice assistant, runnable end to end at the console")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List audio input devices
    Devices,

    /// Hold a typed conversation with the assistant
    Talk {
        /// Input device name (defaults to the system default device)
        #[arg(short, long, env = "BANTER_DEVICE")]
        device: Option<String>,

        /// Read remembered facts from this file (re-read on /refresh)
        #[arg(long, value_name = "PATH")]
        memory_file: Option<PathBuf>,

        /// Write the conversation as JSON when the session ends
        #[arg(long, value_name = "PATH")]
        save_transcript: Option<PathBuf>,

        /// Milliseconds to wait for late transcript chunks after a capture ends
        #[arg(long, default_value_t = 250)]
        grace_ms: u64,

        /// Send only the newest N messages of history to the responder
        #[arg(long, value_name = "N")]
        history_window: Option<usize>,
    },
}

//! Console frontend for the banter voice assistant.
//!
//! Wires the orchestrator in `banter-agent` to console-friendly
//! collaborators: typed lines stand in for captured speech, a canned
//! responder stands in for the model, and playback is simulated pacing.
//! The turn cycle itself (partial transcripts, the grace interval,
//! streaming replies, barge-in) runs for real.

#![deny(unused_crate_dependencies)]

// Used by main.rs only: device enumeration, env loading, logging setup.
use banter_audio as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod facts;
pub mod handlers;
pub mod parser;
pub mod sim;

// Re-export primary types for convenient access
pub use bootstrap::{Session, start_session};
pub use facts::FactsFile;
pub use parser::{Cli, Commands};

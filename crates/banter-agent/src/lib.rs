//! Turn-taking orchestration for the banter voice assistant.
//!
//! This crate turns the ports defined in `banter-core` into a working
//! conversation loop: push-to-talk capture, a grace interval for late
//! transcript chunks, streaming reply generation, spoken playback with
//! barge-in, and an append-only conversation log. See [`assistant`] for
//! the state machine itself.

#![deny(unused_crate_dependencies)]

// async-trait is exercised by the integration tests' mock ports.
#[cfg(test)]
use async_trait as _;

pub mod assistant;
pub mod error;
pub mod history;
pub mod speech_text;

// Re-export key types for convenience
pub use assistant::{
    Assistant, AssistantConfig, AssistantDeps, AssistantEvent, AssistantHandle, AssistantView,
    DEFAULT_GRACE, EMPTY_CAPTURE_TEXT, GENERATION_FAILED_TEXT, NO_DEVICE_STATUS, TurnState,
    WELCOME_TEXT,
};
pub use error::AgentError;
pub use history::{ContextWindow, ConversationLog};
pub use speech_text::sanitize_for_speech;

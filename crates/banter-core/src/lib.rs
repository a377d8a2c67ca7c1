//! Core domain types and port definitions for banter.
//!
//! This crate is the hexagon's center: conversation types plus the traits
//! (`ports`) that adapters implement. It knows nothing about audio
//! backends, model runtimes, or terminals; those live in adapter crates
//! that depend on this one.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{Message, MessageRole};
pub use ports::{
    DeviceError, DeviceRegistry, GenerateError, GenerateRequest, InputDevice, InputDeviceId,
    MemoryError, MemoryProvider, ReplyStream, ResponseGenerator, SpeechError, SpeechOutcome,
    SpeechSynthesizer, StaticMemory, TranscriptError, TranscriptSource, TranscriptStream,
    reply_once,
};

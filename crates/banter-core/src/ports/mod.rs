//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the assistant core expects from the world
//! around it. They contain no implementation details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No audio-backend or model-backend types in any signature
//! - Streams are `BoxStream`s of domain items; adapters own their pacing
//! - Every port carries its own error enum

pub mod devices;
pub mod generate;
pub mod memory;
pub mod speech;
pub mod transcript;

pub use devices::{DeviceError, DeviceRegistry, InputDevice, InputDeviceId};
pub use generate::{GenerateError, GenerateRequest, ReplyStream, ResponseGenerator, reply_once};
pub use memory::{MemoryError, MemoryProvider, StaticMemory};
pub use speech::{SpeechError, SpeechOutcome, SpeechSynthesizer};
pub use transcript::{TranscriptError, TranscriptSource, TranscriptStream};

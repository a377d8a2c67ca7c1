//! Domain types for the banter core.

pub mod chat;

pub use chat::{Message, MessageRole};

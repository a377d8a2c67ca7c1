//! Long-term memory port.
//!
//! Memory is free-form text handed to the response generator alongside the
//! conversation history. Providers may back it with anything from a flat
//! file to a vector store; the orchestrator only ever asks for the whole
//! context as one string.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by memory providers.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backing store could not be reached or read.
    #[error("Memory unavailable: {0}")]
    Unavailable(String),
}

/// Port trait for remembered-facts retrieval.
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// Perform any one-time setup (open stores, warm caches).
    ///
    /// Called once at startup, before the first [`recall`](Self::recall).
    async fn prepare(&self) -> Result<(), MemoryError>;

    /// Return the current remembered context as a single text block.
    ///
    /// An empty string means "no memories"; that is not an error.
    async fn recall(&self) -> Result<String, MemoryError>;
}

/// Memory provider backed by a fixed block of text.
///
/// Useful for tests and for wiring a facts file straight into the
/// assistant without a real store behind it.
#[derive(Debug, Clone, Default)]
pub struct StaticMemory {
    facts: String,
}

impl StaticMemory {
    /// Create a provider that always recalls `facts`.
    #[must_use]
    pub fn new(facts: impl Into<String>) -> Self {
        Self { facts: facts.into() }
    }
}

#[async_trait]
impl MemoryProvider for StaticMemory {
    async fn prepare(&self) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn recall(&self) -> Result<String, MemoryError> {
        Ok(self.facts.clone())
    }
}

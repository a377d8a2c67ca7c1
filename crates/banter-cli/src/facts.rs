//! File-backed remembered facts.

use std::path::PathBuf;

use async_trait::async_trait;

use banter_core::ports::{MemoryError, MemoryProvider};

/// Memory provider that reads a plain-text facts file on every recall.
///
/// Because the file is re-read rather than cached, editing it and issuing
/// `/refresh` in the talk loop changes what the responder is told.
#[derive(Debug, Clone)]
pub struct FactsFile {
    path: PathBuf,
}

impl FactsFile {
    /// Create a provider reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MemoryProvider for FactsFile {
    async fn prepare(&self) -> Result<(), MemoryError> {
        // Surface a bad path at startup rather than mid-conversation.
        tokio::fs::metadata(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| MemoryError::Unavailable(format!("{}: {e}", self.path.display())))
    }

    async fn recall(&self) -> Result<String, MemoryError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map(|facts| facts.trim().to_string())
            .map_err(|e| MemoryError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}

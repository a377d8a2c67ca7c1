//! Agent-side error types.

use thiserror::Error;

/// Errors returned when driving a running assistant through its handle.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The assistant task has shut down and no longer accepts commands.
    #[error("Assistant is no longer running")]
    Stopped,
}

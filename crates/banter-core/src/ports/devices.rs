//! Audio input device registry port.
//!
//! The agent never enumerates hardware itself; the frontend lists devices
//! through this port, picks one, and hands the agent a ready
//! [`InputDeviceId`] that flows unchanged into each turn's transcription
//! call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier for an audio input device.
///
/// Opaque to the agent; registries decide what goes inside (the cpal
/// adapter uses the device name, which is the only stable handle cpal
/// exposes across hosts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputDeviceId(String);

impl InputDeviceId {
    /// Create a device id from its registry-assigned string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InputDeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An audio input device visible to the OS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDevice {
    /// Registry identifier, passed back when opening a transcript stream.
    pub id: InputDeviceId,
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the system default input device.
    pub is_default: bool,
}

/// Errors returned by device registry operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The audio host could not be queried.
    #[error("Failed to enumerate input devices: {0}")]
    Host(String),
}

/// Port trait for input device enumeration.
///
/// Consumed by the frontend only; the orchestrator receives an
/// already-selected [`InputDeviceId`] via its configuration.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// List available audio input devices.
    async fn list(&self) -> Result<Vec<InputDevice>, DeviceError>;

    /// The system default input device, if one exists.
    async fn default_device(&self) -> Result<Option<InputDevice>, DeviceError>;
}

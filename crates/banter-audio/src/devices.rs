//! Input device discovery via `cpal`.
//!
//! `cpal` has no stable device identifiers, so devices are addressed by
//! name. That matches how the host APIs behave in practice and keeps the
//! identifier meaningful in config files and on the command line.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};

use banter_core::ports::{DeviceError, DeviceRegistry, InputDevice, InputDeviceId};

/// Device registry backed by the default `cpal` host.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalDeviceRegistry;

impl CpalDeviceRegistry {
    /// Create a registry over the platform's default audio host.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn enumerate() -> Result<Vec<InputDevice>, DeviceError> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| DeviceError::Host(e.to_string()))?;

        let mut names = Vec::new();
        for device in devices {
            match device.name() {
                Ok(name) => names.push(name),
                Err(e) => tracing::debug!(error = %e, "Skipping unnameable input device"),
            }
        }

        Ok(to_input_devices(names, default_name.as_deref()))
    }
}

#[async_trait]
impl DeviceRegistry for CpalDeviceRegistry {
    async fn list(&self) -> Result<Vec<InputDevice>, DeviceError> {
        let devices = Self::enumerate()?;
        tracing::debug!(count = devices.len(), "Enumerated input devices");
        Ok(devices)
    }

    async fn default_device(&self) -> Result<Option<InputDevice>, DeviceError> {
        Ok(Self::enumerate()?.into_iter().find(|d| d.is_default))
    }
}

/// Build the device list from raw names, marking the default.
fn to_input_devices(names: Vec<String>, default_name: Option<&str>) -> Vec<InputDevice> {
    names
        .into_iter()
        .map(|name| InputDevice {
            id: InputDeviceId::new(name.as_str()),
            is_default: default_name == Some(name.as_str()),
            name,
        })
        .collect()
}

//! Devices command handler.
//!
//! Lists the audio input devices visible to the platform host, marking
//! the system default the assistant preselects.

use anyhow::Result;

use banter_core::ports::{DeviceRegistry, InputDevice};

/// Execute the devices command.
pub async fn execute(registry: &dyn DeviceRegistry) -> Result<()> {
    let devices = registry.list().await?;
    print!("{}", render_device_list(&devices));
    Ok(())
}

/// Format the device list for the terminal.
#[must_use]
fn render_device_list(devices: &[InputDevice]) -> String {
    use std::fmt::Write;

    if devices.is_empty() {
        return "No audio input devices found.\n".to_string();
    }

    let mut out = format!("Found {} input device(s):\n\n", devices.len());
    for device in devices {
        let marker = if device.is_default { '*' } else { ' ' };
        let _ = writeln!(out, "  {marker} {}", device.name);
    }
    if devices.iter().any(|d| d.is_default) {
        out.push_str("\n* system default. Use `banter talk --device NAME` to pick another.\n");
    }
    out
}

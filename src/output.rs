//! Text and JSON rendering of refresh results

use adbm_app::RefreshOutcome;
use adbm_core::prelude::*;
use adbm_core::DeviceList;

pub const ADB_NOT_FOUND: &str = "adb not found";
pub const NO_PHONES_FOUND: &str = "No phones found";

/// One line per device: label, status, and the id when it differs from the label
pub fn render_devices(devices: &DeviceList) -> String {
    if devices.is_empty() {
        return format!("{}\n", NO_PHONES_FOUND);
    }

    let width = devices.iter().map(|d| d.label().len()).max().unwrap_or(0);
    let mut text = String::new();
    for device in devices.iter() {
        let mut line = format!(
            "{:<width$}  {:<7}",
            device.label(),
            device.status_label(),
            width = width
        );
        if device.label() != device.id {
            line.push_str(&format!("  {}", device.id));
        }
        text.push_str(line.trim_end());
        text.push('\n');
    }
    text
}

/// Render a refresh outcome for the terminal
pub fn render_outcome(outcome: &RefreshOutcome) -> String {
    match outcome {
        RefreshOutcome::ToolNotFound { .. } => format!("{}\n", ADB_NOT_FOUND),
        RefreshOutcome::Devices(devices) => render_devices(devices),
        RefreshOutcome::InFlight => "A refresh is already running\n".to_string(),
    }
}

pub fn devices_json(devices: &DeviceList) -> Result<String> {
    Ok(serde_json::to_string_pretty(devices)?)
}

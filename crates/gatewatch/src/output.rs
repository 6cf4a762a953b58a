//! Terminal output helpers: event lines and device tables.

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use gatewatch_api::orchestrator::OrchestratorDevice;
use gatewatch_core::{AccessEvent, ConnectionState, EventStatus};

/// One line per event: time, status, topic, message.
pub fn print_event(event: &AccessEvent, raw: bool) {
    let status = match event.status {
        EventStatus::Success => "success".green().to_string(),
        EventStatus::Failure => "failure".red().to_string(),
        EventStatus::Info => "info".dimmed().to_string(),
    };

    println!(
        "{}  {status:<7}  {}  {}",
        event.iso_timestamp.dimmed(),
        event.topic.cyan(),
        event.message,
    );

    if raw && !event.raw.is_empty() {
        println!("    {}", event.raw.dimmed());
    }
}

/// Announce a connection-state transition on stderr.
pub fn print_connection(state: ConnectionState, last_error: Option<&str>) {
    match state {
        ConnectionState::Connecting => eprintln!("{}", "connecting...".dimmed()),
        ConnectionState::Connected => eprintln!("{}", "connected".green()),
        ConnectionState::Error => match last_error {
            Some(message) => eprintln!("{} {message}", "stream error:".red()),
            None => eprintln!("{}", "stream error".red()),
        },
        ConnectionState::Idle => eprintln!("{}", "disconnected".dimmed()),
    }
}

// ── Device table ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "READY")]
    ready: String,
}

pub fn device_table(devices: &[OrchestratorDevice]) -> String {
    let rows: Vec<DeviceRow> = devices
        .iter()
        .map(|device| DeviceRow {
            id: device.id.clone(),
            kind: device.kind.clone(),
            status: device.status.clone().unwrap_or_else(|| "-".into()),
            ready: if device.ready { "yes".into() } else { "no".into() },
        })
        .collect();

    Table::new(rows).with(Style::sharp()).to_string()
}

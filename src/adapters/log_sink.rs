//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART0 / USB-CDC console on the device, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::SettingsLoaded { valid } => {
                info!("SETTINGS | loaded, valid={}", valid);
            }
            AppEvent::SettingsSaved {
                bytes_written,
                committed,
            } => {
                info!(
                    "SETTINGS | saved, changed={} committed={}",
                    bytes_written, committed
                );
            }
            AppEvent::BootstrapFinished {
                mode,
                state,
                elapsed_ms,
            } => {
                info!(
                    "NET | mode={:?} state={:?} after {} ms",
                    mode, state, elapsed_ms
                );
            }
            AppEvent::ListenerConnected { client } => {
                info!("WS | client #{} connected", client);
            }
            AppEvent::ListenerDisconnected { client } => {
                info!("WS | client #{} disconnected", client);
            }
            AppEvent::CommandsForwarded { client, len } => {
                info!("BRIDGE | {} command byte(s) from #{} -> serial", len, client);
            }
            AppEvent::CommandDropped { client } => {
                info!("BRIDGE | message from #{} has no valid commands, dropped", client);
            }
            AppEvent::CommandRejected { client } => {
                warn!("BRIDGE | message from #{} is not JSON", client);
            }
            AppEvent::SerialWriteFailed { client, len } => {
                warn!("BRIDGE | serial write of {} byte(s) from #{} failed", len, client);
            }
            AppEvent::TelemetryForwarded { len, listeners } => {
                info!("BRIDGE | {} byte line -> {} listener(s)", len, listeners);
            }
        }
    }
}

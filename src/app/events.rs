//! Outbound application events.
//!
//! The domain components emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them; on the device they become log lines.

use crate::app::bootstrap::{NetworkMode, NetworkState};
use crate::events::ClientId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Settings were read from the store (`valid == false` means defaults
    /// were restored).
    SettingsLoaded { valid: bool },

    /// Settings were written; `bytes_written` counts bytes that changed.
    SettingsSaved { bytes_written: usize, committed: bool },

    /// Network bootstrap reached its terminal state.
    BootstrapFinished {
        mode: NetworkMode,
        state: NetworkState,
        elapsed_ms: u64,
    },

    /// A network listener connected.
    ListenerConnected { client: ClientId },

    /// A network listener disconnected.
    ListenerDisconnected { client: ClientId },

    /// A command batch was written to the peripheral.
    CommandsForwarded { client: ClientId, len: usize },

    /// A message parsed as JSON but did not match the command schema.
    CommandDropped { client: ClientId },

    /// A message was not JSON; the sender was told so.
    CommandRejected { client: ClientId },

    /// The peripheral write failed.
    SerialWriteFailed { client: ClientId, len: usize },

    /// A telemetry line was broadcast.
    TelemetryForwarded { len: usize, listeners: usize },
}

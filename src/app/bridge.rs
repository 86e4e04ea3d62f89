//! Command/telemetry bridge.
//!
//! Two independent directions over one full-duplex serial link:
//!
//! - **inbound**: a listener sends `{"commands":[128,131,...]}`; the
//!   opcodes go to the peripheral in a single `write`.
//! - **outbound**: newline-terminated telemetry from the peripheral is sent
//!   to every connected listener as one binary frame per line.
//!
//! Events reach the bridge already serialized by the
//! [`EventQueue`](crate::events::EventQueue), so batches from different
//! listeners never interleave inside one write.

use core::fmt;

use heapless::Vec;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::events::{BridgeEvent, ClientId};
use crate::serial::LineDecoder;

use super::events::AppEvent;
use super::ports::{EventSink, ListenerPort, SerialPort};

/// Most opcodes accepted in one message.
pub const MAX_BATCH_LEN: usize = 128;

/// Serial bytes consumed per [`CommandBridge::poll_serial`] call.
pub const SERIAL_POLL_BUDGET: usize = 256;

/// Reply sent to a listener whose message is not JSON.
pub const INVALID_JSON_REPLY: &str = "Invalid JSON";

/// Ordered opcodes for one peripheral write.
pub type CommandBatch = Vec<u8, MAX_BATCH_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandParseError {
    /// Not a JSON document at all.
    InvalidJson,
    /// JSON, but no `commands` array of bytes.
    Schema,
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "invalid JSON"),
            Self::Schema => write!(f, "expected {{\"commands\": [0..=255, ...]}}"),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// `len` bytes written in one call.
    Forwarded { len: usize },
    /// Valid message with an empty batch; nothing written.
    Empty,
    /// Schema mismatch; dropped silently.
    Dropped,
    /// Not JSON; the sender was told.
    Rejected,
    /// The serial write failed or was short.
    WriteFailed,
}

/// Parse `{"commands": [...]}` into a batch.
///
/// Every element must be an integer in `0..=255`; a single bad element
/// rejects the whole message.
pub fn parse_command_message(payload: &[u8]) -> Result<CommandBatch, CommandParseError> {
    let doc: Value = serde_json::from_slice(payload).map_err(|_| CommandParseError::InvalidJson)?;
    let commands = doc
        .as_object()
        .and_then(|obj| obj.get("commands"))
        .ok_or(CommandParseError::Schema)?;
    CommandBatch::deserialize(commands).map_err(|_| CommandParseError::Schema)
}

pub struct CommandBridge<P: SerialPort, L: ListenerPort> {
    serial: P,
    listeners: L,
    decoder: LineDecoder,
}

impl<P: SerialPort, L: ListenerPort> CommandBridge<P, L> {
    pub fn new(serial: P, listeners: L) -> Self {
        Self {
            serial,
            listeners,
            decoder: LineDecoder::new(),
        }
    }

    pub fn serial(&self) -> &P {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut P {
        &mut self.serial
    }

    pub fn listeners(&self) -> &L {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut L {
        &mut self.listeners
    }

    /// Dispatch one queued event to its handler.
    pub fn handle_event(&mut self, event: BridgeEvent, sink: &mut impl EventSink) {
        match event {
            BridgeEvent::Connected { client } => self.on_connect(client, sink),
            BridgeEvent::Disconnected { client } => self.on_disconnect(client, sink),
            BridgeEvent::Message { client, payload } => {
                self.on_message(client, &payload, sink);
            }
        }
    }

    pub fn on_connect(&mut self, client: ClientId, sink: &mut impl EventSink) {
        if !self.listeners.attach(client) {
            warn!("Bridge: client #{} gone before it could be attached", client);
            return;
        }
        sink.emit(&AppEvent::ListenerConnected { client });
    }

    pub fn on_disconnect(&mut self, client: ClientId, sink: &mut impl EventSink) {
        self.listeners.detach(client);
        sink.emit(&AppEvent::ListenerDisconnected { client });
    }

    /// Parse a listener message and forward its batch to the peripheral.
    pub fn on_message(
        &mut self,
        client: ClientId,
        payload: &[u8],
        sink: &mut impl EventSink,
    ) -> InboundOutcome {
        let batch = match parse_command_message(payload) {
            Ok(batch) => batch,
            Err(CommandParseError::Schema) => {
                sink.emit(&AppEvent::CommandDropped { client });
                return InboundOutcome::Dropped;
            }
            Err(CommandParseError::InvalidJson) => {
                if let Err(e) = self.listeners.send_text(client, INVALID_JSON_REPLY) {
                    warn!("Bridge: could not answer client #{} ({})", client, e);
                }
                sink.emit(&AppEvent::CommandRejected { client });
                return InboundOutcome::Rejected;
            }
        };

        if batch.is_empty() {
            debug!("Bridge: empty batch from client #{}", client);
            return InboundOutcome::Empty;
        }

        let len = batch.len();
        match self.serial.write(&batch) {
            Ok(n) if n == len => {
                sink.emit(&AppEvent::CommandsForwarded { client, len });
                InboundOutcome::Forwarded { len }
            }
            Ok(n) => {
                warn!("Bridge: short serial write ({} of {} bytes)", n, len);
                sink.emit(&AppEvent::SerialWriteFailed { client, len });
                InboundOutcome::WriteFailed
            }
            Err(e) => {
                warn!("Bridge: serial write failed ({})", e);
                sink.emit(&AppEvent::SerialWriteFailed { client, len });
                InboundOutcome::WriteFailed
            }
        }
    }

    /// Read what the peripheral has sent and broadcast every complete line.
    ///
    /// Returns the number of lines forwarded.  Partial lines stay buffered
    /// for the next call.
    pub fn poll_serial(&mut self, sink: &mut impl EventSink) -> usize {
        let mut forwarded = 0;
        let mut consumed = 0;
        let mut chunk = [0u8; 64];

        while consumed < SERIAL_POLL_BUDGET && self.serial.available() {
            let n = match self.serial.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("Bridge: serial read failed ({})", e);
                    break;
                }
            };
            consumed += n;

            for &byte in &chunk[..n] {
                if let Some(line) = self.decoder.feed_byte(byte) {
                    let listeners = self.listeners.broadcast_binary(line);
                    sink.emit(&AppEvent::TelemetryForwarded {
                        len: line.len(),
                        listeners,
                    });
                    forwarded += 1;
                }
            }
        }

        if forwarded > 0 {
            debug!("Bridge: {} telemetry line(s) this poll", forwarded);
        }
        forwarded
    }

    /// Drop any partially assembled telemetry line.
    pub fn reset_telemetry(&mut self) {
        if self.decoder.pending() > 0 {
            info!("Bridge: discarding {} buffered telemetry bytes", self.decoder.pending());
        }
        self.decoder.reset();
    }
}

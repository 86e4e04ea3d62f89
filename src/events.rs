//! Inbound bridge events.
//!
//! Events are produced by the HTTP server task (WebSocket connect,
//! disconnect, message) and consumed by the main loop, which handles them
//! one at a time in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ WS connect  │────▶│              │     │              │
//! │ WS message  │────▶│  EventQueue  │────▶│  Main Loop   │
//! │ WS close    │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Serial availability is not queued; the main loop polls the UART once per
//! iteration after draining this queue.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

/// Identifier of a connected network listener (the HTTP session socket).
pub type ClientId = i32;

/// Largest inbound message accepted from the network.
pub const MAX_MESSAGE_LEN: usize = 512;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// One event per kind of network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Connected { client: ClientId },
    Disconnected { client: ClientId },
    Message {
        client: ClientId,
        payload: Vec<u8, MAX_MESSAGE_LEN>,
    },
}

impl BridgeEvent {
    /// Build a message event, or `None` if the payload does not fit.
    pub fn message(client: ClientId, data: &[u8]) -> Option<Self> {
        let payload = Vec::from_slice(data).ok()?;
        Some(Self::Message { client, payload })
    }

    pub fn client(&self) -> ClientId {
        match self {
            Self::Connected { client }
            | Self::Disconnected { client }
            | Self::Message { client, .. } => *client,
        }
    }
}

/// Bounded multi-producer queue between the network task and the main loop.
///
/// `new` is `const`, so the firmware keeps one in a `static`; tests build
/// their own.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, BridgeEvent, EVENT_QUEUE_CAP>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue an event.  Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: BridgeEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("Events: queue full, dropping event");
                false
            }
        }
    }

    /// Pop the oldest pending event.
    pub fn pop(&self) -> Option<BridgeEvent> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, oldest first.
    pub fn drain(&self, mut handler: impl FnMut(BridgeEvent)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

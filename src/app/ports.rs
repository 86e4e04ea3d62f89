//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SettingsManager / NetworkBootstrap / CommandBridge
//! ```
//!
//! Driven adapters (EEPROM, radio, mDNS, UART, WebSocket listeners, event
//! sinks) implement these traits.  The domain components consume them via
//! generics, so none of them touches ESP-IDF directly and every one of them
//! runs on the host against mocks.

use core::fmt;
use core::net::Ipv4Addr;

use crate::events::ClientId;

// ───────────────────────────────────────────────────────────────
// Persistent record store (driven adapter: domain ↔ EEPROM / NVS)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable non-volatile storage.
///
/// Writes land in a staging area and only become durable on
/// [`commit`](RecordStorePort::commit).
pub trait RecordStorePort {
    /// Number of addressable bytes.
    fn capacity(&self) -> usize;

    fn read_byte(&self, address: usize) -> Result<u8, StoreError>;

    fn write_byte(&mut self, address: usize, value: u8) -> Result<(), StoreError>;

    /// Flush staged writes to the medium.
    fn commit(&mut self) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → WiFi driver)
// ───────────────────────────────────────────────────────────────

/// Link state of the client-mode radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Client mode not started.
    Idle,
    /// Association / DHCP in progress.
    Connecting,
    /// Associated and holding an address.
    Connected,
    /// The driver gave up (wrong credentials, network absent).
    Failed,
}

/// Self-hosted access-point parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPointConfig<'a> {
    pub ssid: &'a str,
    /// `None` broadcasts an open network.
    pub password: Option<&'a str>,
    pub address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub prefix_len: u8,
}

/// WiFi radio operations used by the network bootstrap.
pub trait RadioPort {
    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError>;

    /// Start a client-mode connection.  `None` joins an open network.
    /// Returns as soon as the attempt is under way.
    fn begin_client(&mut self, ssid: &str, password: Option<&str>) -> Result<(), RadioError>;

    fn status(&mut self) -> LinkStatus;

    /// Tear down any client-mode state, partial or complete.
    fn disconnect(&mut self);

    fn start_access_point(&mut self, config: &AccessPointConfig<'_>) -> Result<(), RadioError>;

    /// Address currently held by the active interface, if any.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Discovery port (driven adapter: domain → mDNS responder)
// ───────────────────────────────────────────────────────────────

/// A service to advertise on the local network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceAdvert<'a> {
    pub hostname: &'a str,
    pub service: &'a str,
    pub proto: &'a str,
    pub port: u16,
}

pub trait DiscoveryPort {
    /// Start the responder under `advert.hostname` and register the service.
    fn advertise(&mut self, advert: &ServiceAdvert<'_>) -> Result<(), DiscoveryError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Pair with [`embedded_hal::delay::DelayNs`]
/// for poll-sleep loops.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Serial port (driven adapter: domain ↔ UART peripheral)
// ───────────────────────────────────────────────────────────────

/// Full-duplex byte stream to the downstream peripheral.
pub trait SerialPort {
    /// Write the whole buffer in a single driver call.
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError>;

    /// Read whatever is buffered, up to `buf.len()` bytes.  Returns 0 when
    /// nothing is pending (never blocks).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// Whether at least one byte is waiting to be read.
    fn available(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Listener port (driven adapter: domain → WebSocket clients)
// ───────────────────────────────────────────────────────────────

/// The set of currently connected network listeners.
///
/// Owned by the main loop.  The network task never touches it directly; a
/// listener becomes reachable only once its connect event is handled.
pub trait ListenerPort {
    /// Start delivering to `client`.  Returns `false` if no transport is
    /// waiting for it.
    fn attach(&mut self, client: ClientId) -> bool;

    /// Stop delivering to `client` and release its transport.
    fn detach(&mut self, client: ClientId);

    /// Send one binary frame to every connected listener.
    /// Returns how many listeners accepted it.
    fn broadcast_binary(&mut self, frame: &[u8]) -> usize;

    /// Send a text frame to a single listener.
    fn send_text(&mut self, client: ClientId, text: &str) -> Result<(), ListenerError>;

    fn listener_count(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RecordStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Address beyond the store's capacity.
    OutOfRange { address: usize },
    /// Staged bytes could not be flushed.
    CommitFailed,
    /// Generic I/O error from the backend.
    IoError,
}

/// Errors from [`RadioPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// SSID or password does not fit the driver's buffers.
    InvalidCredentials,
    /// The driver rejected the request.
    Driver,
}

/// Errors from [`DiscoveryPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryError {
    ResponderInit,
    ServiceRegistration,
}

/// Errors from [`SerialPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// The driver accepted fewer bytes than requested.
    ShortWrite { written: usize },
    Io,
}

/// Errors from [`ListenerPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerError {
    UnknownClient,
    SendFailed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { address } => write!(f, "address {} out of range", address),
            Self::CommitFailed => write!(f, "commit failed"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "credentials do not fit driver limits"),
            Self::Driver => write!(f, "WiFi driver error"),
        }
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResponderInit => write!(f, "mDNS responder init failed"),
            Self::ServiceRegistration => write!(f, "mDNS service registration failed"),
        }
    }
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortWrite { written } => write!(f, "short write ({} bytes)", written),
            Self::Io => write!(f, "UART I/O error"),
        }
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownClient => write!(f, "unknown listener"),
            Self::SendFailed => write!(f, "send failed"),
        }
    }
}

//! Network bootstrap.
//!
//! Runs once at startup, before the bridge starts, and leaves the radio in
//! exactly one of two modes:
//!
//! ```text
//!  Idle ──(router SSID set)──▶ AttemptingClient ──(link up)──▶ Connected ──(mDNS ok)──▶ ServiceAdvertised
//!   │                               │
//!   │ (no router SSID)              │ (timeout / driver refused)
//!   ▼                               ▼
//!  Fallback ◀───────────────────────┘          (self-hosted access point)
//! ```
//!
//! Nothing here is fatal.  A client attempt that never comes up, a failed
//! mDNS responder, or a radio that rejects the AP configuration are logged and
//! the machine settles in the best state it reached.  It never re-evaluates;
//! link drops after bootstrap are the radio adapter's business.

use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::config::SettingsRecord;

use super::events::AppEvent;
use super::ports::{
    AccessPointConfig, ClockPort, DiscoveryPort, EventSink, LinkStatus, RadioPort, ServiceAdvert,
};

/// Upper bound on the client connection attempt.
pub const CLIENT_TIMEOUT_MS: u64 = 15_000;

/// Sleep between link status polls.
pub const POLL_INTERVAL_MS: u32 = 100;

/// Passwords of this many bytes or fewer are treated as "no password".
pub const OPEN_NETWORK_MAX_PASSWORD: usize = 8;

pub const HTTP_SERVICE: &str = "_http";
pub const HTTP_PROTO: &str = "_tcp";
pub const HTTP_PORT: u16 = 80;

/// Access-point address used when the configured one does not parse.
pub const FALLBACK_AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 10, 0, 1);

pub const AP_PREFIX_LEN: u8 = 24;

/// Bootstrap state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Idle,
    AttemptingClient,
    Connected,
    ServiceAdvertised,
    Fallback,
}

/// Radio mode bootstrap settled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    Client,
    AccessPoint,
}

/// Result of [`NetworkBootstrap::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub mode: NetworkMode,
    pub state: NetworkState,
    /// Address of the active interface, if the radio reported one.
    pub address: Option<Ipv4Addr>,
    pub elapsed_ms: u64,
}

/// Password to hand to the radio, or `None` for an open network.
///
/// Anything of [`OPEN_NETWORK_MAX_PASSWORD`] bytes or less counts as a
/// placeholder rather than a credential.  Applies to client and AP alike.
pub fn effective_password(password: &str) -> Option<&str> {
    (password.len() > OPEN_NETWORK_MAX_PASSWORD).then_some(password)
}

/// Parse the configured AP address, falling back to
/// [`FALLBACK_AP_ADDRESS`] for empty, malformed or unspecified input.
pub fn access_point_address(configured: &str) -> Ipv4Addr {
    match configured.trim().parse::<Ipv4Addr>() {
        Ok(addr) if !addr.is_unspecified() => addr,
        _ => {
            warn!(
                "Bootstrap: AP address {:?} unusable, using {}",
                configured, FALLBACK_AP_ADDRESS
            );
            FALLBACK_AP_ADDRESS
        }
    }
}

pub struct NetworkBootstrap {
    state: NetworkState,
    timeout_ms: u64,
    poll_interval_ms: u32,
}

impl NetworkBootstrap {
    pub fn new() -> Self {
        Self::with_timing(CLIENT_TIMEOUT_MS, POLL_INTERVAL_MS)
    }

    /// Custom attempt bound and poll interval (tests use short ones).
    pub fn with_timing(timeout_ms: u64, poll_interval_ms: u32) -> Self {
        Self {
            state: NetworkState::Idle,
            timeout_ms,
            poll_interval_ms: poll_interval_ms.max(1),
        }
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Drive the radio to client or access-point mode using `settings`.
    pub fn run<R, D, C, S>(
        &mut self,
        settings: &SettingsRecord,
        radio: &mut R,
        discovery: &mut D,
        clock: &mut C,
        sink: &mut S,
    ) -> BootstrapOutcome
    where
        R: RadioPort,
        D: DiscoveryPort,
        C: ClockPort + DelayNs,
        S: EventSink,
    {
        let started = clock.now_ms();
        self.state = NetworkState::Idle;

        let hostname = settings.hostname();
        if let Err(e) = radio.set_hostname(hostname) {
            warn!("Bootstrap: could not set hostname {:?} ({})", hostname, e);
        }

        let mode = if !settings.ssid_router().is_empty() && self.attempt_client(settings, radio, clock) {
            self.advertise(hostname, discovery);
            NetworkMode::Client
        } else {
            self.fall_back(settings, radio);
            NetworkMode::AccessPoint
        };

        let outcome = BootstrapOutcome {
            mode,
            state: self.state,
            address: radio.local_ip(),
            elapsed_ms: clock.now_ms().saturating_sub(started),
        };
        sink.emit(&AppEvent::BootstrapFinished {
            mode: outcome.mode,
            state: outcome.state,
            elapsed_ms: outcome.elapsed_ms,
        });
        outcome
    }

    /// Poll-sleep until the link is up or the bound expires.
    fn attempt_client<R, C>(&mut self, settings: &SettingsRecord, radio: &mut R, clock: &mut C) -> bool
    where
        R: RadioPort,
        C: ClockPort + DelayNs,
    {
        self.state = NetworkState::AttemptingClient;
        let ssid = settings.ssid_router();
        info!("Bootstrap: connecting to {:?}", ssid);

        let password = effective_password(settings.password_router());
        if let Err(e) = radio.begin_client(ssid, password) {
            warn!("Bootstrap: client start refused ({})", e);
            return false;
        }

        let attempt_started = clock.now_ms();
        loop {
            if radio.status() == LinkStatus::Connected {
                self.state = NetworkState::Connected;
                match radio.local_ip() {
                    Some(ip) => info!("Bootstrap: connected, IP {}", ip),
                    None => info!("Bootstrap: connected"),
                }
                return true;
            }
            if clock.now_ms().saturating_sub(attempt_started) >= self.timeout_ms {
                warn!(
                    "Bootstrap: no link to {:?} after {} ms",
                    ssid, self.timeout_ms
                );
                return false;
            }
            clock.delay_ms(self.poll_interval_ms);
        }
    }

    fn advertise<D: DiscoveryPort>(&mut self, hostname: &str, discovery: &mut D) {
        let advert = ServiceAdvert {
            hostname,
            service: HTTP_SERVICE,
            proto: HTTP_PROTO,
            port: HTTP_PORT,
        };
        match discovery.advertise(&advert) {
            Ok(()) => {
                self.state = NetworkState::ServiceAdvertised;
                info!("Bootstrap: advertised {}.local", hostname);
            }
            // Still reachable by IP.
            Err(e) => warn!("Bootstrap: service advertisement failed ({})", e),
        }
    }

    fn fall_back<R: RadioPort>(&mut self, settings: &SettingsRecord, radio: &mut R) {
        self.state = NetworkState::Fallback;
        radio.disconnect();

        let address = access_point_address(settings.ip_ap());
        let config = AccessPointConfig {
            ssid: settings.ssid_ap(),
            password: effective_password(settings.password_ap()),
            address,
            gateway: address,
            prefix_len: AP_PREFIX_LEN,
        };
        info!("Bootstrap: starting access point {:?} at {}", config.ssid, address);
        if let Err(e) = radio.start_access_point(&config) {
            error!("Bootstrap: access point start failed ({})", e);
        }
    }
}

impl Default for NetworkBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

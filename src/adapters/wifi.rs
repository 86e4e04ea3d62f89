//! WiFi radio adapter.
//!
//! Implements [`RadioPort`] for the network bootstrap and keeps the client
//! link alive afterwards.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` driven in
//!   non-blocking mode; the bootstrap does the polling.
//! - **all other targets**: a simulated radio whose client network is either
//!   reachable (link comes up after a few polls) or not.
//!
//! ## Reconnection policy
//!
//! Once bootstrap settles in client mode, [`WifiAdapter::maintain`] re-issues
//! a connect whenever the link is down, at most once every
//! [`RECONNECT_INTERVAL_MS`].  Access-point mode needs no upkeep.

use core::net::Ipv4Addr;

use log::{error, info, warn};

use crate::app::ports::{AccessPointConfig, LinkStatus, RadioError, RadioPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    ipv4::{self, Mask, RouterConfiguration, Subnet},
    netif::{EspNetif, NetifConfiguration},
    nvs::EspDefaultNvsPartition,
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

/// Minimum spacing between automatic reconnect attempts.
pub const RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Channel the self-hosted access point broadcasts on.
const AP_CHANNEL: u8 = 1;

/// Status polls before a reachable simulated network reports a link.
#[cfg(not(target_os = "espidf"))]
const SIM_POLLS_TO_CONNECT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Off,
    Client,
    AccessPoint,
}

pub struct WifiAdapter {
    mode: RadioMode,
    hostname: heapless::String<32>,
    last_reconnect_ms: Option<u64>,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimRadio,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimRadio {
    network_reachable: bool,
    polls: u32,
    link_up: bool,
    ap_address: Option<Ipv4Addr>,
    ap_ssid: String,
    ap_password: Option<String>,
    client_password: Option<String>,
    connects: u32,
}

impl WifiAdapter {
    /// Take the modem and create the driver.  Nothing is started yet.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, RadioError> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs)).map_err(|e| {
            error!("WiFi: driver init failed ({:?})", e);
            RadioError::Driver
        })?;
        info!("WiFi: driver ready");
        Ok(Self {
            mode: RadioMode::Off,
            hostname: heapless::String::new(),
            last_reconnect_ms: None,
            wifi,
        })
    }

    /// Simulated radio.  `network_reachable` decides whether a client
    /// attempt ever comes up.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(network_reachable: bool) -> Self {
        info!("WiFi(sim): client network reachable={}", network_reachable);
        Self {
            mode: RadioMode::Off,
            hostname: heapless::String::new(),
            last_reconnect_ms: None,
            sim: SimRadio {
                network_reachable,
                ..SimRadio::default()
            },
        }
    }

    pub fn mode(&self) -> RadioMode {
        self.mode
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Reconnect the client link if it dropped.  Call once per main-loop
    /// iteration.
    pub fn maintain(&mut self, now_ms: u64) {
        if self.mode != RadioMode::Client || self.platform_link_up() {
            return;
        }
        if let Some(last) = self.last_reconnect_ms {
            if now_ms.saturating_sub(last) < RECONNECT_INTERVAL_MS {
                return;
            }
        }
        self.last_reconnect_ms = Some(now_ms);
        warn!("WiFi: link down, reconnecting");
        if let Err(e) = self.platform_connect() {
            warn!("WiFi: reconnect request failed ({})", e);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        self.wifi
            .sta_netif_mut()
            .set_hostname(hostname)
            .map_err(|_| RadioError::Driver)?;
        self.wifi
            .ap_netif_mut()
            .set_hostname(hostname)
            .map_err(|_| RadioError::Driver)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set_hostname(&mut self, _hostname: &str) -> Result<(), RadioError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_begin_client(&mut self, ssid: &str, password: Option<&str>) -> Result<(), RadioError> {
        let auth_method = if password.is_some() {
            AuthMethod::WPA2Personal
        } else {
            AuthMethod::None
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| RadioError::InvalidCredentials)?,
            password: password
                .unwrap_or("")
                .try_into()
                .map_err(|_| RadioError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&config)
            .map_err(|_| RadioError::Driver)?;
        self.wifi.start().map_err(|_| RadioError::Driver)?;

        // Modem sleep adds hundreds of ms to every inbound frame.
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_set_ps(esp_idf_svc::sys::wifi_ps_type_t_WIFI_PS_NONE) };
        if rc != esp_idf_svc::sys::ESP_OK as esp_idf_svc::sys::esp_err_t {
            warn!("WiFi: could not disable power save (esp_err_t={})", rc);
        }

        self.platform_connect()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_client(&mut self, ssid: &str, password: Option<&str>) -> Result<(), RadioError> {
        if ssid.len() > 32 || password.is_some_and(|p| p.len() > 64) {
            return Err(RadioError::InvalidCredentials);
        }
        self.sim.client_password = password.map(str::to_string);
        self.sim.polls = 0;
        self.platform_connect()
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), RadioError> {
        self.wifi.connect().map_err(|_| RadioError::Driver)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), RadioError> {
        self.sim.connects += 1;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&mut self) -> bool {
        if !self.sim.link_up && self.sim.network_reachable {
            self.sim.polls += 1;
            self.sim.link_up = self.sim.polls > SIM_POLLS_TO_CONNECT;
        }
        self.sim.link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed ({:?})", e);
        }
        if let Err(e) = self.wifi.stop() {
            warn!("WiFi: stop failed ({:?})", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim.link_up = false;
        self.sim.polls = 0;
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_ap(&mut self, c: &AccessPointConfig<'_>) -> Result<(), RadioError> {
        let netif = EspNetif::new_with_conf(&NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(RouterConfiguration {
                subnet: Subnet {
                    gateway: c.gateway,
                    mask: Mask(c.prefix_len),
                },
                dhcp_enabled: true,
                dns: None,
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        })
        .map_err(|e| {
            error!("WiFi: AP netif creation failed ({:?})", e);
            RadioError::Driver
        })?;
        self.wifi.swap_netif_ap(netif).map_err(|_| RadioError::Driver)?;
        if !self.hostname.is_empty() {
            if let Err(e) = self.wifi.ap_netif_mut().set_hostname(&self.hostname) {
                warn!("WiFi: AP hostname {:?} not applied ({:?})", self.hostname.as_str(), e);
            }
        }

        let auth_method = if c.password.is_some() {
            AuthMethod::WPA2Personal
        } else {
            AuthMethod::None
        };
        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: c.ssid.try_into().map_err(|_| RadioError::InvalidCredentials)?,
            password: c
                .password
                .unwrap_or("")
                .try_into()
                .map_err(|_| RadioError::InvalidCredentials)?,
            auth_method,
            channel: AP_CHANNEL,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&config)
            .map_err(|_| RadioError::Driver)?;
        self.wifi.start().map_err(|_| RadioError::Driver)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_ap(&mut self, c: &AccessPointConfig<'_>) -> Result<(), RadioError> {
        if c.ssid.is_empty() || c.ssid.len() > 32 {
            error!("WiFi(sim): AP SSID {:?} rejected", c.ssid);
            return Err(RadioError::InvalidCredentials);
        }
        self.sim.ap_ssid = c.ssid.to_string();
        self.sim.ap_password = c.password.map(str::to_string);
        self.sim.ap_address = Some(c.address);
        info!("WiFi(sim): AP {:?} on channel {}", c.ssid, AP_CHANNEL);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_local_ip(&self) -> Option<Ipv4Addr> {
        let netif = match self.mode {
            RadioMode::Client => self.wifi.sta_netif(),
            RadioMode::AccessPoint => self.wifi.ap_netif(),
            RadioMode::Off => return None,
        };
        netif
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
            .filter(|ip| !ip.is_unspecified())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_local_ip(&self) -> Option<Ipv4Addr> {
        match self.mode {
            RadioMode::Client if self.sim.link_up => Some(Ipv4Addr::new(192, 168, 1, 50)),
            RadioMode::AccessPoint => self.sim.ap_address,
            _ => None,
        }
    }
}

/// Simulation hooks for host tests.
#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    /// Drop the client link as if the router went away.
    pub fn sim_drop_link(&mut self) {
        self.sim.link_up = false;
        self.sim.polls = 0;
    }

    pub fn sim_connects(&self) -> u32 {
        self.sim.connects
    }

    pub fn sim_client_password(&self) -> Option<&str> {
        self.sim.client_password.as_deref()
    }

    pub fn sim_access_point(&self) -> Option<(&str, Option<&str>, Ipv4Addr)> {
        let address = self.sim.ap_address?;
        Some((&self.sim.ap_ssid, self.sim.ap_password.as_deref(), address))
    }
}

// ───────────────────────────────────────────────────────────────
// RadioPort
// ───────────────────────────────────────────────────────────────

impl RadioPort for WifiAdapter {
    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        self.hostname.clear();
        self.hostname
            .push_str(hostname)
            .map_err(|_| RadioError::InvalidCredentials)?;
        self.platform_set_hostname(hostname)?;
        info!("WiFi: hostname {:?}", hostname);
        Ok(())
    }

    fn begin_client(&mut self, ssid: &str, password: Option<&str>) -> Result<(), RadioError> {
        info!(
            "WiFi: joining {:?} ({})",
            ssid,
            if password.is_some() { "WPA2" } else { "open" }
        );
        self.platform_begin_client(ssid, password)?;
        self.mode = RadioMode::Client;
        self.last_reconnect_ms = None;
        Ok(())
    }

    fn status(&mut self) -> LinkStatus {
        if self.mode != RadioMode::Client {
            return LinkStatus::Idle;
        }
        if self.platform_link_up() {
            LinkStatus::Connected
        } else {
            LinkStatus::Connecting
        }
    }

    fn disconnect(&mut self) {
        if self.mode == RadioMode::Off {
            return;
        }
        self.platform_disconnect();
        self.mode = RadioMode::Off;
        info!("WiFi: client mode stopped");
    }

    fn start_access_point(&mut self, config: &AccessPointConfig<'_>) -> Result<(), RadioError> {
        self.platform_start_ap(config)?;
        self.mode = RadioMode::AccessPoint;
        info!(
            "WiFi: access point {:?} up at {}/{} ({})",
            config.ssid,
            config.address,
            config.prefix_len,
            if config.password.is_some() { "WPA2" } else { "open" }
        );
        Ok(())
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.platform_local_ip()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

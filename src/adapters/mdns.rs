//! mDNS service advertisement adapter.
//!
//! Implements [`DiscoveryPort`]: makes the device reachable as
//! `<hostname>.local` and advertises the HTTP control panel.  Uses the
//! ESP-IDF `mdns` component on the device and records adverts on the host.
//!
//! Only started once the client link is up; in access-point mode clients
//! use the fixed AP address instead.

use log::{error, info};

use crate::app::ports::{DiscoveryError, DiscoveryPort, ServiceAdvert};

const INSTANCE_NAME: &str = "Roomba bridge";

/// mDNS advertisement adapter.
pub struct MdnsAdapter {
    active: bool,
    #[cfg(not(target_os = "espidf"))]
    adverts: Vec<(String, String, String, u16)>,
    #[cfg(not(target_os = "espidf"))]
    fail_init: bool,
}

impl Default for MdnsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MdnsAdapter {
    pub fn new() -> Self {
        Self {
            active: false,
            #[cfg(not(target_os = "espidf"))]
            adverts: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            fail_init: false,
        }
    }

    /// Whether the responder is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop the responder.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS: stopped");
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, advert: &ServiceAdvert<'_>) -> Result<(), DiscoveryError> {
        use esp_idf_svc::sys::*;

        let hostname = c_string::<64>(advert.hostname);
        let instance = c_string::<32>(INSTANCE_NAME);
        let service = c_string::<32>(advert.service);
        let proto = c_string::<8>(advert.proto);

        // SAFETY: all pointers reference NUL-terminated stack buffers that
        // outlive the calls; the mdns component copies what it keeps.
        unsafe {
            if !self.active {
                let ret = mdns_init();
                if ret != ESP_OK as esp_err_t {
                    error!("mDNS: mdns_init failed ({})", ret);
                    return Err(DiscoveryError::ResponderInit);
                }
            }
            if mdns_hostname_set(hostname.as_ptr() as *const _) != ESP_OK as esp_err_t {
                mdns_free();
                return Err(DiscoveryError::ResponderInit);
            }
            mdns_instance_name_set(instance.as_ptr() as *const _);

            let ret = mdns_service_add(
                core::ptr::null(),
                service.as_ptr() as *const _,
                proto.as_ptr() as *const _,
                advert.port,
                core::ptr::null_mut(),
                0,
            );
            if ret != ESP_OK as esp_err_t {
                error!("mDNS: mdns_service_add failed ({})", ret);
                mdns_free();
                return Err(DiscoveryError::ServiceRegistration);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, advert: &ServiceAdvert<'_>) -> Result<(), DiscoveryError> {
        if self.fail_init {
            error!("mDNS(sim): simulated responder failure");
            self.adverts.clear();
            return Err(DiscoveryError::ResponderInit);
        }
        self.adverts.push((
            advert.hostname.to_string(),
            advert.service.to_string(),
            advert.proto.to_string(),
            advert.port,
        ));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        self.adverts.clear();
    }
}

/// Simulation hooks for host tests.
#[cfg(not(target_os = "espidf"))]
impl MdnsAdapter {
    /// Make the next `advertise` fail as if the responder could not start.
    pub fn sim_fail_init(&mut self, fail: bool) {
        self.fail_init = fail;
    }

    /// `(hostname, service, proto, port)` of every registered service.
    pub fn sim_adverts(&self) -> &[(String, String, String, u16)] {
        &self.adverts
    }
}

/// Copy `s` into a NUL-terminated buffer, truncating if needed.
#[cfg(target_os = "espidf")]
fn c_string<const N: usize>(s: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let len = s.len().min(N - 1);
    buf[..len].copy_from_slice(&s.as_bytes()[..len]);
    buf
}

impl DiscoveryPort for MdnsAdapter {
    fn advertise(&mut self, advert: &ServiceAdvert<'_>) -> Result<(), DiscoveryError> {
        // Every failure path tears the responder down.
        if let Err(e) = self.platform_start(advert) {
            self.active = false;
            return Err(e);
        }
        self.active = true;
        info!(
            "mDNS: advertising {}.local -> {}.{}:{} ({})",
            advert.hostname, advert.service, advert.proto, advert.port, INSTANCE_NAME
        );
        Ok(())
    }
}

//! Network bootstrap against the simulated WiFi and mDNS adapters.

use std::net::Ipv4Addr;

use roombridge::adapters::mdns::MdnsAdapter;
use roombridge::adapters::wifi::{RECONNECT_INTERVAL_MS, RadioMode, WifiAdapter};
use roombridge::app::bootstrap::{
    CLIENT_TIMEOUT_MS, FALLBACK_AP_ADDRESS, NetworkBootstrap, NetworkMode, NetworkState,
};
use roombridge::app::events::AppEvent;
use roombridge::config::SettingsRecord;

use crate::mock_hw::{MockClock, RecordingSink};

fn settings(ssid: &str, password: &str) -> SettingsRecord {
    let mut s = SettingsRecord::defaults();
    s.set_ssid_router(ssid);
    s.set_password_router(password);
    s
}

#[test]
fn reachable_router_advertises_http_service() {
    let mut radio = WifiAdapter::simulated(true);
    let mut mdns = MdnsAdapter::new();
    let mut clock = MockClock::new();
    let mut sink = RecordingSink::new();

    let outcome = NetworkBootstrap::new().run(
        &settings("HomeNet", "supersecret"),
        &mut radio,
        &mut mdns,
        &mut clock,
        &mut sink,
    );

    assert_eq!(outcome.mode, NetworkMode::Client);
    assert_eq!(outcome.state, NetworkState::ServiceAdvertised);
    assert!(outcome.address.is_some());
    assert!(outcome.elapsed_ms < CLIENT_TIMEOUT_MS);
    assert_eq!(radio.mode(), RadioMode::Client);
    assert_eq!(radio.hostname(), "roomba-esp32");
    assert_eq!(radio.sim_client_password(), Some("supersecret"));
    assert_eq!(
        mdns.sim_adverts(),
        &[("roomba-esp32".to_string(), "_http".to_string(), "_tcp".to_string(), 80)]
    );
    assert!(matches!(
        sink.last(),
        Some(AppEvent::BootstrapFinished {
            mode: NetworkMode::Client,
            ..
        })
    ));
}

#[test]
fn unreachable_router_falls_back_within_bound() {
    let mut radio = WifiAdapter::simulated(false);
    let mut mdns = MdnsAdapter::new();
    let mut clock = MockClock::new();
    let mut sink = RecordingSink::new();

    let outcome = NetworkBootstrap::new().run(
        &settings("Nowhere", "supersecret"),
        &mut radio,
        &mut mdns,
        &mut clock,
        &mut sink,
    );

    assert_eq!(outcome.mode, NetworkMode::AccessPoint);
    assert_eq!(outcome.state, NetworkState::Fallback);
    assert!(outcome.elapsed_ms >= CLIENT_TIMEOUT_MS);
    // One poll interval of slack past the bound.
    assert!(outcome.elapsed_ms <= CLIENT_TIMEOUT_MS + 100);
    assert_eq!(radio.mode(), RadioMode::AccessPoint);
    assert!(!mdns.is_active());

    // Default AP settings: "sick" is a placeholder, so the AP is open.
    let (ssid, password, address) = radio.sim_access_point().unwrap();
    assert_eq!(ssid, "RoombaAP");
    assert_eq!(password, None);
    assert_eq!(address, Ipv4Addr::new(192, 168, 0, 1));
    assert_eq!(outcome.address, Some(address));
}

#[test]
fn empty_router_ssid_skips_the_client_attempt() {
    let mut radio = WifiAdapter::simulated(true);
    let mut mdns = MdnsAdapter::new();
    let mut clock = MockClock::new();
    let mut sink = RecordingSink::new();

    let outcome = NetworkBootstrap::new().run(
        &settings("", "supersecret"),
        &mut radio,
        &mut mdns,
        &mut clock,
        &mut sink,
    );
    assert_eq!(outcome.mode, NetworkMode::AccessPoint);
    assert_eq!(radio.sim_connects(), 0);
    assert_eq!(clock.sleeps, 0);
}

#[test]
fn eight_character_password_joins_open_network() {
    let mut radio = WifiAdapter::simulated(true);
    let mut clock = MockClock::new();
    NetworkBootstrap::new().run(
        &settings("HomeNet", "12345678"),
        &mut radio,
        &mut MdnsAdapter::new(),
        &mut clock,
        &mut RecordingSink::new(),
    );
    assert_eq!(radio.sim_client_password(), None);
}

#[test]
fn nine_character_password_is_used() {
    let mut radio = WifiAdapter::simulated(true);
    let mut clock = MockClock::new();
    NetworkBootstrap::new().run(
        &settings("HomeNet", "123456789"),
        &mut radio,
        &mut MdnsAdapter::new(),
        &mut clock,
        &mut RecordingSink::new(),
    );
    assert_eq!(radio.sim_client_password(), Some("123456789"));
}

#[test]
fn secured_access_point_and_bad_address() {
    let mut s = settings("", "");
    s.set_password_ap("apsecret99");
    s.set_ip_ap("not-an-ip");

    let mut radio = WifiAdapter::simulated(false);
    NetworkBootstrap::new().run(
        &s,
        &mut radio,
        &mut MdnsAdapter::new(),
        &mut MockClock::new(),
        &mut RecordingSink::new(),
    );
    let (_, password, address) = radio.sim_access_point().unwrap();
    assert_eq!(password, Some("apsecret99"));
    assert_eq!(address, FALLBACK_AP_ADDRESS);
}

#[test]
fn mdns_failure_keeps_client_mode() {
    let mut radio = WifiAdapter::simulated(true);
    let mut mdns = MdnsAdapter::new();
    mdns.sim_fail_init(true);
    let mut bootstrap = NetworkBootstrap::new();

    let outcome = bootstrap.run(
        &settings("HomeNet", "supersecret"),
        &mut radio,
        &mut mdns,
        &mut MockClock::new(),
        &mut RecordingSink::new(),
    );
    assert_eq!(outcome.mode, NetworkMode::Client);
    assert_eq!(outcome.state, NetworkState::Connected);
    assert_eq!(bootstrap.state(), NetworkState::Connected);
}

#[test]
fn dropped_link_is_retried_at_most_once_per_interval() {
    let mut radio = WifiAdapter::simulated(true);
    let mut clock = MockClock::new();
    NetworkBootstrap::new().run(
        &settings("HomeNet", "supersecret"),
        &mut radio,
        &mut MdnsAdapter::new(),
        &mut clock,
        &mut RecordingSink::new(),
    );
    assert_eq!(radio.sim_connects(), 1);

    radio.sim_drop_link();
    let t0 = clock.now_ms;
    radio.maintain(t0);
    assert_eq!(radio.sim_connects(), 2);
    radio.maintain(t0 + 10);
    assert_eq!(radio.sim_connects(), 2);

    // The simulated link returns after a few polls; once up it is left alone.
    radio.maintain(t0 + RECONNECT_INTERVAL_MS);
    radio.maintain(t0 + 2 * RECONNECT_INTERVAL_MS);
    radio.maintain(t0 + 3 * RECONNECT_INTERVAL_MS);
    radio.maintain(t0 + 4 * RECONNECT_INTERVAL_MS);
    let settled = radio.sim_connects();
    radio.maintain(t0 + 10 * RECONNECT_INTERVAL_MS);
    assert_eq!(radio.sim_connects(), settled);
}

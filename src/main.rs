//! Roomba WiFi bridge: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EepromAdapter   WifiAdapter   MdnsAdapter   Esp32TimeAdapter  │
//! │  (RecordStore)   (Radio)       (Discovery)   (Clock + Delay)   │
//! │  UartLink        WsListeners / HTTP server       LogEventSink  │
//! │  (Serial)        (Listener, WS → EventQueue)     (EventSink)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  SettingsManager · NetworkBootstrap · CommandBridge    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Startup runs strictly in order: settings, network bootstrap, serial
//! link, HTTP server.  Then the main loop drains WebSocket events, polls
//! the serial link, drops dead listeners and keeps the client link up.
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use roombridge::adapters::eeprom::EepromAdapter;
use roombridge::adapters::log_sink::LogEventSink;
use roombridge::adapters::mdns::MdnsAdapter;
use roombridge::adapters::time::Esp32TimeAdapter;
use roombridge::adapters::uart::UartLink;
use roombridge::adapters::web::{self, SenderHandoff, WsListeners};
use roombridge::adapters::wifi::WifiAdapter;
use roombridge::app::bootstrap::NetworkBootstrap;
use roombridge::app::bridge::CommandBridge;
use roombridge::app::ports::{ClockPort, SerialPort};
use roombridge::app::settings::SettingsManager;
use roombridge::config::STORE_CAPACITY;
use roombridge::events::EventQueue;
use roombridge::Error;

/// Robot serial protocol: enter passive mode, then full control.
const OPCODE_START: u8 = 128;
const OPCODE_FULL: u8 = 132;
const WAKE_SPACING_MS: u32 = 500;

/// Main loop idle time per iteration.
const LOOP_DELAY_MS: u32 = 10;

/// WebSocket events waiting for the main loop.
static EVENTS: EventQueue = EventQueue::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("Roomba bridge v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut sink = LogEventSink::new();
    let mut clock = Esp32TimeAdapter::new();

    // ── 2. Settings (defaults written back on first boot) ─────
    let store = EepromAdapter::new(nvs.clone(), STORE_CAPACITY).map_err(Error::from)?;
    let mut settings = SettingsManager::new(store);
    if !settings.load_reporting(&mut sink) {
        if let Err(e) = settings.save_reporting(&mut sink) {
            warn!("Settings: defaults not persisted ({})", e);
        }
    }
    let mut listing = String::new();
    if settings.dump(&mut listing).is_ok() {
        listing.lines().for_each(|line| info!("{}", line));
    }

    // ── 3. Network bootstrap ──────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs).map_err(Error::from)?;
    let mut mdns = MdnsAdapter::new();
    let outcome = NetworkBootstrap::new().run(
        settings.record(),
        &mut wifi,
        &mut mdns,
        &mut clock,
        &mut sink,
    );
    match outcome.address {
        Some(ip) => info!("Network: {:?} at {}", outcome.mode, ip),
        None => info!("Network: {:?}, no address yet", outcome.mode),
    }

    // ── 4. Serial link + robot wake-up ────────────────────────
    let mut uart = UartLink::new(
        peripherals.uart2,
        peripherals.pins.gpio17,
        peripherals.pins.gpio16,
    )
    .map_err(Error::from)?;
    for opcode in [OPCODE_START, OPCODE_FULL] {
        if let Err(e) = uart.write(&[opcode]) {
            warn!("UART: wake opcode {} not sent ({})", opcode, e);
        }
        clock.delay_ms(WAKE_SPACING_MS);
    }

    // ── 5. HTTP + WebSocket server ────────────────────────────
    let settings = Arc::new(Mutex::new(settings));
    let handoff = SenderHandoff::new();
    let _server = web::start_server(settings, handoff.clone(), &EVENTS)?;

    let mut bridge = CommandBridge::new(uart, WsListeners::new(handoff));
    info!("System ready. Entering bridge loop.");

    // ── 6. Bridge loop ────────────────────────────────────────
    loop {
        EVENTS.drain(|event| bridge.handle_event(event, &mut sink));
        bridge.poll_serial(&mut sink);
        bridge.listeners_mut().cleanup();
        wifi.maintain(clock.now_ms());
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}

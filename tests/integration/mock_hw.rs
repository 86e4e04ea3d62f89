//! Mock collaborators for integration tests.
//!
//! The adapters' own simulation backends cover storage, radio, mDNS, UART
//! and WebSocket listeners.  What remains is a clock that advances only
//! when slept on and a sink that records every application event.

use embedded_hal::delay::DelayNs;
use roombridge::app::events::AppEvent;
use roombridge::app::ports::{ClockPort, EventSink};

// ── Clock ─────────────────────────────────────────────────────

/// Virtual clock: `delay_*` advances time instantly.
pub struct MockClock {
    pub now_ms: u64,
    pub sleeps: u32,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            sleeps: 0,
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

impl DelayNs for MockClock {
    fn delay_ns(&mut self, ns: u32) {
        self.sleeps += 1;
        self.now_ms += u64::from(ns.div_ceil(1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleeps += 1;
        self.now_ms += u64::from(ms);
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Sink that records every emitted event.
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

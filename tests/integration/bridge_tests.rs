//! Command and telemetry bridging through the event queue, the simulated
//! UART and simulated WebSocket listeners.

use roombridge::adapters::uart::UartLink;
use roombridge::adapters::web::{SenderHandoff, SimFrame, WsListeners};
use roombridge::app::bridge::{CommandBridge, InboundOutcome, MAX_BATCH_LEN};
use roombridge::app::events::AppEvent;
use roombridge::app::ports::{ListenerPort, SerialPort};
use roombridge::events::{BridgeEvent, EventQueue};

use crate::mock_hw::RecordingSink;

struct Harness {
    queue: EventQueue,
    handoff: SenderHandoff,
    bridge: CommandBridge<UartLink, WsListeners>,
    sink: RecordingSink,
}

impl Harness {
    fn new() -> Self {
        let handoff = SenderHandoff::new();
        Self {
            queue: EventQueue::new(),
            bridge: CommandBridge::new(UartLink::new(), WsListeners::new(handoff.clone())),
            handoff,
            sink: RecordingSink::new(),
        }
    }

    /// What the HTTP task does when a client opens the socket.
    fn connect(&self, client: i32) {
        self.handoff.offer_simulated(client);
        self.queue.push(BridgeEvent::Connected { client });
    }

    /// What the HTTP task does when a client closes the socket.
    fn disconnect(&self, client: i32) {
        self.queue.push(BridgeEvent::Disconnected { client });
    }

    fn send(&self, client: i32, text: &str) {
        let event = BridgeEvent::message(client, text.as_bytes()).unwrap();
        assert!(self.queue.push(event));
    }

    /// One main-loop iteration, minus the radio and the delay.
    fn tick(&mut self) {
        let Self {
            queue, bridge, sink, ..
        } = self;
        queue.drain(|event| bridge.handle_event(event, sink));
        bridge.poll_serial(sink);
        bridge.listeners_mut().cleanup();
    }

    fn frames(&self, client: i32) -> Vec<SimFrame> {
        self.bridge
            .listeners()
            .sim_frames(client)
            .map(<[SimFrame]>::to_vec)
            .unwrap_or_default()
    }
}

#[test]
fn command_batch_is_one_serial_write() {
    let mut h = Harness::new();
    h.connect(1);
    h.send(1, r#"{"commands":[128,132,140]}"#);
    h.tick();

    assert_eq!(h.bridge.serial().sim_writes(), &[vec![128, 132, 140]]);
    assert_eq!(
        h.sink.count(|e| matches!(e, AppEvent::CommandsForwarded { client: 1, len: 3 })),
        1
    );
}

#[test]
fn schema_mismatch_is_dropped_silently() {
    let mut h = Harness::new();
    h.connect(1);
    h.send(1, r#"{"commands":["x"]}"#);
    h.send(1, r#"{"other":[1,2]}"#);
    h.tick();

    assert!(h.bridge.serial().sim_writes().is_empty());
    assert!(h.frames(1).is_empty());
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::CommandDropped { .. })), 2);
}

#[test]
fn invalid_json_is_answered_to_sender_only() {
    let mut h = Harness::new();
    h.connect(1);
    h.connect(2);
    h.send(2, "{not json");
    h.tick();

    assert!(h.bridge.serial().sim_writes().is_empty());
    assert_eq!(h.frames(2), vec![SimFrame::Text("Invalid JSON".into())]);
    assert!(h.frames(1).is_empty());
}

#[test]
fn empty_batch_writes_nothing() {
    let mut h = Harness::new();
    h.connect(1);
    let outcome = h
        .bridge
        .on_message(1, br#"{"commands":[]}"#, &mut h.sink);
    assert_eq!(outcome, InboundOutcome::Empty);
    assert!(h.bridge.serial().sim_writes().is_empty());
}

#[test]
fn largest_batch_is_forwarded_whole() {
    let mut h = Harness::new();
    let body = format!("{{\"commands\":{:?}}}", vec![137u8; MAX_BATCH_LEN]);
    let outcome = h.bridge.on_message(1, body.as_bytes(), &mut h.sink);
    assert_eq!(outcome, InboundOutcome::Forwarded { len: MAX_BATCH_LEN });
    assert_eq!(h.bridge.serial().sim_writes()[0].len(), MAX_BATCH_LEN);
}

#[test]
fn serial_failure_is_reported() {
    let mut h = Harness::new();
    h.bridge.serial_mut().sim_fail_writes(true);
    let outcome = h
        .bridge
        .on_message(1, br#"{"commands":[135]}"#, &mut h.sink);
    assert_eq!(outcome, InboundOutcome::WriteFailed);
    assert!(matches!(
        h.sink.last(),
        Some(AppEvent::SerialWriteFailed { client: 1, len: 1 })
    ));
}

#[test]
fn telemetry_line_reaches_every_listener() {
    let mut h = Harness::new();
    h.connect(1);
    h.connect(2);
    h.tick();

    h.bridge.serial_mut().sim_inject(b"bump:12\n");
    h.tick();

    let expected = vec![SimFrame::Binary(b"bump:12".to_vec())];
    assert_eq!(h.frames(1), expected);
    assert_eq!(h.frames(2), expected);
    assert!(matches!(
        h.sink.last(),
        Some(AppEvent::TelemetryForwarded { len: 7, listeners: 2 })
    ));
}

#[test]
fn partial_line_waits_for_terminator() {
    let mut h = Harness::new();
    h.connect(1);
    h.bridge.serial_mut().sim_inject(b"batt:");
    h.tick();
    assert!(h.frames(1).is_empty());

    h.bridge.serial_mut().sim_inject(b"87\r\nwall:0\n");
    h.tick();
    assert_eq!(
        h.frames(1),
        vec![
            SimFrame::Binary(b"batt:87\r".to_vec()),
            SimFrame::Binary(b"wall:0".to_vec()),
        ]
    );
}

#[test]
fn late_listener_gets_no_history() {
    let mut h = Harness::new();
    h.connect(1);
    h.bridge.serial_mut().sim_inject(b"bump:12\n");
    h.tick();

    h.connect(2);
    h.tick();
    assert_eq!(h.frames(1).len(), 1);
    assert!(h.frames(2).is_empty());
}

#[test]
fn telemetry_without_listeners_is_discarded() {
    let mut h = Harness::new();
    h.bridge.serial_mut().sim_inject(b"bump:1\n");
    h.tick();
    assert!(matches!(
        h.sink.last(),
        Some(AppEvent::TelemetryForwarded { listeners: 0, .. })
    ));
    assert!(!h.bridge.serial().available());
}

#[test]
fn broken_listener_is_dropped_on_cleanup() {
    let mut h = Harness::new();
    h.connect(1);
    h.connect(2);
    h.tick();
    h.bridge.listeners_mut().sim_break(2);

    h.bridge.serial_mut().sim_inject(b"x\n");
    h.tick();
    assert_eq!(h.bridge.listeners().listener_count(), 1);
    assert_eq!(h.bridge.listeners().clients().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn events_are_handled_in_arrival_order() {
    let mut h = Harness::new();
    h.connect(7);
    h.send(7, r#"{"commands":[128]}"#);
    h.send(7, r#"{"commands":[131]}"#);
    h.disconnect(7);
    h.tick();

    assert_eq!(h.bridge.serial().sim_writes(), &[vec![128], vec![131]]);
    let kinds: Vec<&AppEvent> = h.sink.events.iter().collect();
    assert!(matches!(kinds[0], AppEvent::ListenerConnected { client: 7 }));
    assert!(matches!(kinds[1], AppEvent::CommandsForwarded { .. }));
    assert!(matches!(kinds[2], AppEvent::CommandsForwarded { .. }));
    assert!(matches!(kinds[3], AppEvent::ListenerDisconnected { client: 7 }));
    assert!(h.queue.is_empty());
}

#[test]
fn listener_is_reachable_only_after_its_connect_event() {
    let mut h = Harness::new();
    h.connect(1);
    assert_eq!(h.bridge.listeners().listener_count(), 0);
    assert_eq!(h.handoff.pending(), 1);

    h.tick();
    assert_eq!(h.bridge.listeners().listener_count(), 1);
    assert_eq!(h.handoff.pending(), 0);
}

#[test]
fn session_closed_before_loop_runs_leaves_nothing_behind() {
    let mut h = Harness::new();
    h.connect(4);
    h.disconnect(4);
    h.tick();

    assert_eq!(h.bridge.listeners().listener_count(), 0);
    assert_eq!(h.handoff.pending(), 0);
    assert!(matches!(
        h.sink.last(),
        Some(AppEvent::ListenerDisconnected { client: 4 })
    ));
}

#[test]
fn line_filling_the_buffer_is_one_frame() {
    let mut h = Harness::new();
    h.connect(1);
    h.tick();

    let mut stream = vec![b'a'; 256];
    stream.extend_from_slice(b"\nbump:1\n");
    h.bridge.serial_mut().sim_inject(&stream);
    h.tick();

    assert_eq!(
        h.frames(1),
        vec![
            SimFrame::Binary(vec![b'a'; 256]),
            SimFrame::Binary(b"bump:1".to_vec()),
        ]
    );
}

//! Fuzz target: `CommandBridge::on_message`
//!
//! Feeds arbitrary WebSocket payloads to the bridge over a simulated UART.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - At most one serial write per message
//! - A forwarded batch is exactly what `parse_command_message` returned
//!
//! cargo fuzz run fuzz_command_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use roombridge::adapters::log_sink::LogEventSink;
use roombridge::adapters::uart::UartLink;
use roombridge::adapters::web::WsListeners;
use roombridge::app::bridge::{CommandBridge, InboundOutcome, parse_command_message};

fuzz_target!(|data: &[u8]| {
    let mut listeners = WsListeners::default();
    listeners.add_simulated(1);
    let mut bridge = CommandBridge::new(UartLink::new(), listeners);
    let mut sink = LogEventSink::new();

    let outcome = bridge.on_message(1, data, &mut sink);
    let writes = bridge.serial().sim_writes();
    assert!(writes.len() <= 1);

    if let InboundOutcome::Forwarded { len } = outcome {
        let batch = parse_command_message(data).expect("forwarded batch must parse");
        assert_eq!(writes[0].as_slice(), batch.as_slice());
        assert_eq!(len, batch.len());
    } else {
        assert!(writes.is_empty());
    }
});

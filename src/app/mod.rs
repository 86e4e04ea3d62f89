//! Application core: pure domain logic, zero I/O.
//!
//! Settings persistence, the network bootstrap state machine, the settings
//! endpoint logic and the command/telemetry bridge.  All interaction with
//! the radio, flash, UART and WebSocket clients happens through **port
//! traits** defined in [`ports`], so this layer runs on the host against
//! mocks.

pub mod bootstrap;
pub mod bridge;
pub mod events;
pub mod ports;
pub mod settings;
pub mod settings_api;

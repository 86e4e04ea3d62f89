//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                    |
//! |-------------|--------------------|--------------------------------|
//! | `eeprom`    | RecordStorePort    | NVS blob / in-memory image     |
//! | `log_sink`  | EventSink          | Serial log output              |
//! | `mdns`      | DiscoveryPort      | ESP-IDF mDNS responder         |
//! | `time`      | ClockPort, DelayNs | ESP32 system timer / FreeRTOS  |
//! | `uart`      | SerialPort         | UART2 to the robot             |
//! | `web`       | ListenerPort       | HTTP server + WebSocket `/ws`  |
//! | `wifi`      | RadioPort          | ESP-IDF WiFi STA / AP          |

pub mod eeprom;
pub mod log_sink;
pub mod mdns;
pub mod time;
pub mod uart;
pub mod web;
pub mod wifi;

//! Serial link framing.
//!
//! The peripheral emits newline-terminated telemetry at its own pace; the
//! UART driver hands back whatever happens to be buffered.  [`LineDecoder`]
//! turns that byte stream back into whole lines.
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────────────────┐
//! │ UartLink  │──▶│ LineDecoder  │──▶│ CommandBridge         │
//! │ (read)    │   │ (assembly)   │   │ → broadcast to clients│
//! └───────────┘   └──────────────┘   └───────────────────────┘
//! ```

pub mod codec;

pub use codec::{LineDecoder, MAX_LINE_LEN};

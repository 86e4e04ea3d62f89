//! UART link to the robot's serial port.
//!
//! Implements [`SerialPort`].  Writes go out in one driver call; reads never
//! block, so the main loop can poll every iteration.
//!
//! - **`target_os = "espidf"`**: `UartDriver` on UART2 (TX GPIO17,
//!   RX GPIO16), 8N1.
//! - **all other targets**: an in-memory loop with an injectable receive
//!   queue and a log of every write.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{SerialError, SerialPort};

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::{
    delay::NON_BLOCK,
    gpio::{AnyIOPin, Gpio16, Gpio17},
    uart::{UartDriver, UART2, config::Config},
    units::Hertz,
};

/// Line rate of the robot's serial port.
pub const SERIAL_BAUD: u32 = 115_200;

pub struct UartLink {
    #[cfg(target_os = "espidf")]
    uart: UartDriver<'static>,
    #[cfg(not(target_os = "espidf"))]
    rx: VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    writes: Vec<Vec<u8>>,
    #[cfg(not(target_os = "espidf"))]
    fail_writes: bool,
}

impl UartLink {
    #[cfg(target_os = "espidf")]
    pub fn new(uart: UART2, tx: Gpio17, rx: Gpio16) -> Result<Self, SerialError> {
        let config = Config::default().baudrate(Hertz(SERIAL_BAUD));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )
        .map_err(|e| {
            warn!("UART: driver init failed ({:?})", e);
            SerialError::Io
        })?;
        info!("UART: UART2 open at {} baud", SERIAL_BAUD);
        Ok(Self { uart })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("UART(sim): loopback at {} baud", SERIAL_BAUD);
        Self {
            rx: VecDeque::new(),
            writes: Vec::new(),
            fail_writes: false,
        }
    }
}

/// Simulation hooks for host tests.
#[cfg(not(target_os = "espidf"))]
impl UartLink {
    /// Queue bytes as if the robot had sent them.
    pub fn sim_inject(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Every buffer passed to `write`, in order.
    pub fn sim_writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub fn sim_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for UartLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialPort for UartLink {
    #[cfg(target_os = "espidf")]
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        let written = self.uart.write(data).map_err(|e| {
            warn!("UART: write failed ({:?})", e);
            SerialError::Io
        })?;
        if written != data.len() {
            return Err(SerialError::ShortWrite { written });
        }
        Ok(written)
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        if self.fail_writes {
            return Err(SerialError::Io);
        }
        self.writes.push(data.to_vec());
        Ok(data.len())
    }

    #[cfg(target_os = "espidf")]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        self.uart.read(buf, NON_BLOCK).map_err(|e| {
            warn!("UART: read failed ({:?})", e);
            SerialError::Io
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    #[cfg(target_os = "espidf")]
    fn available(&self) -> bool {
        self.uart.remaining_read().map(|n| n > 0).unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn available(&self) -> bool {
        !self.rx.is_empty()
    }
}

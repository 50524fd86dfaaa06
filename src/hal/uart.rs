//! Shell transport on UART1, bridged to the wireless serial module.

use std::io;
use std::time::Duration;

use esp_idf_svc::hal::delay::TickType;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::uart::{config::Config, UartDriver, UART1};
use esp_idf_svc::hal::units::Hertz;

use super::SetupError;
use crate::config::Pins;
use crate::transport::Transport;

/// Serial bridge baud rate.
pub const SHELL_BAUD: u32 = 115_200;

/// Full-duplex UART carrying the shell and uploads.
pub struct UartLink {
    uart: UartDriver<'static>,
}

impl UartLink {
    pub fn new(uart: UART1, pins: &Pins) -> Result<Self, SetupError> {
        // SAFETY: the shell pins are reserved for this driver by the pin map.
        let (tx, rx) = unsafe { (AnyIOPin::new(pins.shell_tx), AnyIOPin::new(pins.shell_rx)) };
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None, // CTS
            Option::<AnyIOPin>::None, // RTS
            &Config::default().baudrate(Hertz(SHELL_BAUD)),
        )
        .map_err(SetupError::Uart)?;
        Ok(Self { uart })
    }
}

impl io::Write for UartLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.uart.write(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.uart
            .wait_tx_done(TickType::from(Duration::from_secs(1)).ticks())
            .map_err(io::Error::other)
    }
}

impl Transport for UartLink {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte, TickType::from(timeout).ticks()) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

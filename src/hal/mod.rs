//! Hardware Abstraction Layer for the Sipkip board.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

pub mod dac;
pub mod gpio;
pub mod opus;
pub mod storage;
pub mod uart;

use std::io;

use esp_idf_svc::sys::EspError;
use thiserror::Error;

use crate::fault::FaultCode;

pub use dac::DacOutput;
pub use gpio::EspMuxBus;
pub use opus::OpusDecoder;
pub use uart::UartLink;

/// Bring-up failure. Fatal: the firmware records it and stops.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("peripherals already taken: {0}")]
    Peripherals(EspError),

    #[error("GPIO {pin}: {source}")]
    Pin { pin: i32, source: EspError },

    #[error("LED PWM: {0}")]
    Pwm(EspError),

    #[error("DAC: {0}")]
    Dac(EspError),

    #[error("storage partition: {0}")]
    Storage(EspError),

    #[error("speech decoder: {0}")]
    Decoder(#[from] crate::audio::DecodeError),

    #[error("UART: {0}")]
    Uart(EspError),

    #[error("cannot start thread: {0}")]
    Spawn(#[from] io::Error),
}

impl SetupError {
    /// Fault record for `stats`.
    pub fn fault_code(&self) -> FaultCode {
        match self {
            SetupError::Storage(_) => FaultCode::StorageSetup,
            SetupError::Decoder(_) => FaultCode::DecoderSetup,
            _ => FaultCode::PeripheralSetup,
        }
    }

    /// GPIO number or raw ESP-IDF code, for the fault record.
    pub fn fault_data(&self) -> u32 {
        match self {
            SetupError::Pin { pin, .. } => *pin as u32,
            SetupError::Peripherals(e) | SetupError::Pwm(e) | SetupError::Dac(e) | SetupError::Storage(e) | SetupError::Uart(e) => {
                e.code() as u32
            }
            SetupError::Decoder(_) | SetupError::Spawn(_) => 0,
        }
    }
}

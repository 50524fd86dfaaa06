//! Fault state for hardware and bring-up failures.
//!
//! Bring-up failures are fatal: the firmware records the fault, logs it and
//! stops initialising. Runtime peripheral errors (a GPIO write refused, a
//! DAC write failing) cannot be propagated out of the scan loop or the DAC
//! worker, so they are recorded here and surfaced by the `stats` command.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Fault codes, most recent one wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// Storage partition could not be mounted or formatted.
    StorageSetup = 1,

    /// A GPIO, LEDC, UART or DAC peripheral refused its configuration.
    PeripheralSetup = 2,

    /// The speech decoder could not be created.
    DecoderSetup = 3,

    /// A pin operation failed inside the scan loop.
    /// Data: GPIO number.
    PinIo = 4,

    /// A DMA write to the DAC failed.
    /// Data: raw ESP-IDF error code.
    DacWrite = 5,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::StorageSetup,
            2 => FaultCode::PeripheralSetup,
            3 => FaultCode::DecoderSetup,
            4 => FaultCode::PinIo,
            5 => FaultCode::DacWrite,
            _ => FaultCode::None,
        }
    }

    /// Short label for the shell.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::StorageSetup => "storage setup",
            FaultCode::PeripheralSetup => "peripheral setup",
            FaultCode::DecoderSetup => "decoder setup",
            FaultCode::PinIo => "pin i/o",
            FaultCode::DacWrite => "dac write",
        }
    }
}

/// Thread-safe fault state, shared through the application context.
pub struct FaultState {
    active: AtomicBool,
    code: AtomicU8,
    /// Additional data (GPIO number, raw error code).
    data: AtomicU32,
    /// Total fault count since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault and bump the counter.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear the active flag. The counter is kept for diagnostics.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}

//! Non-blocking logging for the Sipkip firmware.
//!
//! # Architecture
//!
//! ```text
//! Scanner thread         LogStream            Log sink thread
//! ──────────────         ─────────            ───────────────
//!
//! log_debug!() ───────▶ [L0][L1][L2] ──────▶ console / UART
//! never blocks            lock-free           blocking ok
//!
//! behaviour / shell ───▶ [L0][L1][L2] ──────┘
//! ```
//!
//! # Rules
//!
//! - The scan loop never calls a blocking log function (no `println!`)
//! - Every context logs through the macros below
//! - Messages may be dropped when a ring is full; drops are counted

use core::cell::{Cell, UnsafeCell};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 120;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 128;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Parse a level name as typed on the shell (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Most verbose level currently recorded.
#[inline]
pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Change the verbosity threshold at runtime.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Whether messages at `level` are currently recorded.
#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level <= max_level()
}

/// A single log entry.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LogEntry {
    /// Timestamp in microseconds since boot.
    pub timestamp_us: i64,
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        timestamp_us: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text, lossy on invalid UTF-8 truncation.
    pub fn text(&self) -> &str {
        let bytes = &self.msg[..self.len as usize];
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            // Truncation may split a multi-byte char; keep the valid prefix
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One ring slot. `ready` is raised once the entry is fully written.
struct Slot {
    ready: AtomicBool,
    entry: UnsafeCell<LogEntry>,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Slot = Slot {
    ready: AtomicBool::new(false),
    entry: UnsafeCell::new(LogEntry::EMPTY),
};

/// Lock-free log stream (multiple producers, single consumer).
///
/// - Producers reserve a slot with a compare-exchange on the write index,
///   fill it, then publish it through the slot's `ready` flag
/// - Push never blocks (drops message if full)
/// - The sink thread drains at leisure, in reservation order, and stops at
///   a slot that is reserved but not yet published
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [Slot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: a slot's entry is written only by the producer that reserved it
// while `ready` is false, and read only by the single consumer after an
// Acquire load sees `ready` true.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        Self {
            slots: [EMPTY_SLOT; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Push a log entry without blocking.
    ///
    /// Returns `true` if message was queued, `false` if dropped (ring full).
    #[inline]
    pub fn push(&self, timestamp_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        match self.reserve() {
            Some(pos) => {
                self.publish(pos, timestamp_us, level, msg);
                true
            }
            None => false,
        }
    }

    /// Claim the next free position, counting a drop when the ring is full.
    fn reserve(&self) -> Option<u32> {
        let mut write = self.write_idx.load(Ordering::Acquire);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            match self.write_idx.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(write),
                Err(current) => write = current,
            }
        }
    }

    /// Fill the slot at a reserved position and hand it to the consumer.
    fn publish(&self, pos: u32, timestamp_us: i64, level: LogLevel, msg: &[u8]) {
        let slot = &self.slots[(pos as usize) & Self::MASK];

        // SAFETY: the CAS hands every producer a unique position, and the
        // consumer cleared `ready` before releasing this slot via read_idx.
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.timestamp_us = timestamp_us;
            entry.level = level;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        slot.ready.store(true, Ordering::Release);
    }

    /// Drain next log entry (sink thread only).
    ///
    /// `None` when the ring is empty or the oldest reserved slot is still
    /// being written.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let slot = &self.slots[(read as usize) & Self::MASK];
        if !slot.ready.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: single consumer; `ready` was published with Release after
        // the producer finished writing.
        let entry = unsafe { *slot.entry.get() };

        slot.ready.store(false, Ordering::Relaxed);
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Count of dropped messages since last reset.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Return and clear the dropped counter.
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Number of entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating at the buffer end.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

thread_local! {
    static SCAN_CONTEXT: Cell<bool> = const { Cell::new(false) };
}

/// Mark the calling thread as the input scanner.
///
/// Its messages then go to `SCAN_LOG_STREAM` instead of `APP_LOG_STREAM`.
pub fn enter_scan_context() {
    SCAN_CONTEXT.with(|c| c.set(true));
}

/// Log stream for the calling thread.
#[inline]
pub fn current_log_stream() -> &'static LogStream {
    if SCAN_CONTEXT.with(Cell::get) {
        &crate::log_globals::SCAN_LOG_STREAM
    } else {
        &crate::log_globals::APP_LOG_STREAM
    }
}

/// Log into an explicit stream.
///
/// # Example
///
/// ```ignore
/// rt_log!(LogLevel::Info, APP_LOG_STREAM, clock::now_us(), "mode {}", mode);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        if $crate::logging::enabled($level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            $stream.push($timestamp, $level, &buf[..len]);
        }
    }};
}

/// Error log into the calling thread's stream.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::rt_log!(
            $crate::logging::LogLevel::Error,
            $crate::logging::current_log_stream(),
            $crate::clock::now_us(),
            $($arg)*
        )
    };
}

/// Warning log into the calling thread's stream.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::rt_log!(
            $crate::logging::LogLevel::Warn,
            $crate::logging::current_log_stream(),
            $crate::clock::now_us(),
            $($arg)*
        )
    };
}

/// Info log into the calling thread's stream.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::rt_log!(
            $crate::logging::LogLevel::Info,
            $crate::logging::current_log_stream(),
            $crate::clock::now_us(),
            $($arg)*
        )
    };
}

/// Debug log into the calling thread's stream.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::rt_log!(
            $crate::logging::LogLevel::Debug,
            $crate::logging::current_log_stream(),
            $crate::clock::now_us(),
            $($arg)*
        )
    };
}

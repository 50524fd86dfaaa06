//! # Sipkip firmware
//!
//! Interactive plush toy: a multiplexed sensor bus, a rotating LED
//! indicator, compressed speech streamed to the DAC, and a file shell for
//! uploading new clips.
//!
//! ## Architecture
//!
//! ```text
//!  mux-scan thread ──▶ InputTable (latches) ──▶ behaviour loop ──▶ Player ──▶ dac-dma thread
//!        │                                          │                ▲
//!        └── new event ──▶ CancelToken ─────────────┴────────────────┘
//!                                              shell thread ── speak / rx
//! ```
//!
//! Everything above `hal` builds and tests on the host; `hal` binds the
//! ESP-IDF drivers.

pub mod app;
pub mod audio;
pub mod behavior;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod console;
pub mod fault;
pub mod input;
pub mod log_globals;
pub mod log_sink;
pub mod logging;
pub mod output;
pub mod storage;
pub mod transport;
pub mod xmodem;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use app::App;
pub use cancel::CancelToken;
pub use config::Config;
pub use fault::{FaultCode, FaultState};
pub use log_globals::{APP_LOG_STREAM, SCAN_LOG_STREAM};

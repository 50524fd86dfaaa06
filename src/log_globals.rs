//! Global log stream instances.
//!
//! One stream per producer context, drained by the log sink thread.

use crate::logging::LogStream;

/// Scanner log stream.
///
/// Written only by the multiplexed input scanner, which must never block.
pub static SCAN_LOG_STREAM: LogStream = LogStream::new();

/// Application log stream.
///
/// Shared by the behaviour loop, playback, the shell and bring-up code.
pub static APP_LOG_STREAM: LogStream = LogStream::new();

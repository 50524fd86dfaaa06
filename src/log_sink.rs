//! Log sink: drains the log streams to a byte sink.
//!
//! On the device the sink is the ESP-IDF console (stdout on UART0); the
//! shell runs on its own transport so log lines never interleave with
//! command output.
//!
//! Format: `[timestamp_us] LEVEL: message\n`

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crate::clock;
use crate::log_globals::{APP_LOG_STREAM, SCAN_LOG_STREAM};
use crate::logging::{LogEntry, LogStream};

/// How often dropped-message counters are reported.
const DROP_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Idle delay between polls when both streams are empty.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Format log entry to `out`.
pub fn write_entry<W: Write + ?Sized>(out: &mut W, entry: &LogEntry) -> io::Result<()> {
    writeln!(
        out,
        "[{:10}] {}: {}",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.text()
    )
}

/// Drain everything currently queued, scanner stream first.
///
/// Returns the number of entries written.
pub fn drain_once<W: Write + ?Sized>(out: &mut W) -> io::Result<usize> {
    let mut written = drain_stream(&SCAN_LOG_STREAM, out)?;
    written += drain_stream(&APP_LOG_STREAM, out)?;
    if written > 0 {
        out.flush()?;
    }
    Ok(written)
}

fn drain_stream<W: Write + ?Sized>(stream: &LogStream, out: &mut W) -> io::Result<usize> {
    let mut written = 0;
    while let Some(entry) = stream.drain() {
        write_entry(out, &entry)?;
        written += 1;
    }
    Ok(written)
}

/// Log sink task. Runs for the lifetime of the firmware.
pub fn log_sink_task<W: Write>(mut out: W) -> ! {
    let mut last_dropped_report = 0i64;

    loop {
        // A failing sink has nowhere to report to; keep draining
        let work_done = drain_once(&mut out).unwrap_or(0) > 0;

        let now = clock::now_us();
        if now - last_dropped_report > DROP_REPORT_INTERVAL_US {
            let scan_dropped = SCAN_LOG_STREAM.take_dropped();
            let app_dropped = APP_LOG_STREAM.take_dropped();
            if scan_dropped > 0 || app_dropped > 0 {
                let _ = writeln!(out, "[WARN] Dropped: SCAN={}, APP={}", scan_dropped, app_dropped);
            }
            last_dropped_report = now;
        }

        if !work_done {
            thread::sleep(IDLE_POLL);
        }
    }
}

//! Monotonic microsecond clock used for log timestamps.

/// Microseconds since boot.
#[cfg(target_os = "espidf")]
#[inline]
pub fn now_us() -> i64 {
    // SAFETY: esp_timer_get_time is always safe to call after boot
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}

/// Microseconds since the first call in this process.
#[cfg(not(target_os = "espidf"))]
pub fn now_us() -> i64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_micros() as i64
}

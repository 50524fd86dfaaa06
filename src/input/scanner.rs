//! Time-division multiplexed input scanner.
//!
//! The scanner alternates two phases on the shared bus:
//!
//! ```text
//!  read phase                      drive phase
//!  ──────────                      ───────────
//!  lines released (high)           mux enables off
//!  one mux side enabled            line i low if LED i lit
//!  LED groups dark                 LED groups at their duty
//!  sample 8 lines + 3 switches
//! ```
//!
//! Successive read phases alternate the enabled mux side, so each shared
//! line yields a button level and a clip level. A level is accepted only
//! after `debounce_samples` consecutive samples disagree with the stable
//! state. Accepted rising edges on event inputs latch into the
//! [`InputTable`]; the change callback runs at most once per read phase.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{InputTable, LogicalInput, MuxSide, INPUT_COUNT, SHARED_LINES};
use crate::logging;
use crate::output::{LedGroup, OutputDriver};

/// Pin-level access to the multiplexed bus.
///
/// Operations are infallible: an implementation that hits a pin error
/// records it and carries on, since the next scan samples again.
pub trait MuxBus {
    /// Enable one mux side, or neither.
    fn set_mux_enable(&mut self, side: Option<MuxSide>);

    /// Drive a shared open-drain line: `true` releases it, `false` sinks.
    fn drive_line(&mut self, line: usize, high: bool);

    /// Toggle the pull-down on a shared line.
    fn set_pulldown(&mut self, line: usize, enabled: bool);

    /// Sample a shared line.
    fn read_line(&mut self, line: usize) -> bool;

    /// Sample a direct switch (`Beak`, `LearnSwitch`, `PlaySwitch`).
    fn read_switch(&mut self, switch: LogicalInput) -> bool;

    /// Set PWM duty (percent) on an LED group line.
    fn set_led_group(&mut self, group: LedGroup, duty: u8);

    /// Re-enable switch edge interrupts after they fired.
    fn rearm_switch_interrupts(&mut self) {}
}

/// Inputs whose debounced level changed during one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Inputs whose accepted level changed.
    pub changed: u32,
    /// Inputs that latched a new event (rising edge).
    pub latched: u32,
}

impl ScanReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changed == 0
    }

    #[inline]
    pub fn contains(&self, input: LogicalInput) -> bool {
        self.changed & input.bit() != 0
    }

    /// Whether a learn/play switch moved.
    pub fn mode_switch_changed(&self) -> bool {
        LogicalInput::SWITCHES
            .iter()
            .any(|s| s.is_mode_switch() && self.contains(*s))
    }
}

/// Scanner counters for diagnostics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub cycles: AtomicU32,
    pub callbacks: AtomicU32,
    pub switch_edges: AtomicU32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Read,
    Drive,
}

#[derive(Clone, Copy, Debug, Default)]
struct Debounce {
    stable: bool,
    disagree: u8,
}

impl Debounce {
    /// Feed one sample; returns the new stable level once accepted.
    #[inline]
    fn sample(&mut self, level: bool, needed: u8) -> Option<bool> {
        if level == self.stable {
            self.disagree = 0;
            return None;
        }
        self.disagree += 1;
        if self.disagree >= needed {
            self.stable = level;
            self.disagree = 0;
            Some(level)
        } else {
            None
        }
    }
}

/// Multiplexed bus scanner.
pub struct MuxScanner<B, F> {
    bus: B,
    inputs: Arc<InputTable>,
    outputs: Arc<OutputDriver>,
    on_change: F,
    debounce: [Debounce; INPUT_COUNT],
    debounce_samples: u8,
    /// Side enabled during the most recent read phase.
    side: MuxSide,
    next_phase: Phase,
    switch_edge: Arc<AtomicBool>,
    stats: Arc<ScanStats>,
}

impl<B: MuxBus, F: FnMut(&ScanReport)> MuxScanner<B, F> {
    pub fn new(
        bus: B,
        inputs: Arc<InputTable>,
        outputs: Arc<OutputDriver>,
        debounce_samples: u8,
        on_change: F,
    ) -> Self {
        Self {
            bus,
            inputs,
            outputs,
            on_change,
            debounce: [Debounce::default(); INPUT_COUNT],
            debounce_samples: debounce_samples.max(1),
            // First read phase toggles to the button side
            side: MuxSide::Clips,
            next_phase: Phase::Read,
            switch_edge: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(ScanStats::default()),
        }
    }

    /// Flag set from switch edge interrupts; serviced on the next step.
    pub fn switch_edge_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.switch_edge)
    }

    pub fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Run one phase, servicing a pending switch edge first.
    pub fn step(&mut self) {
        if self.switch_edge.swap(false, Ordering::AcqRel) {
            self.service_switch_edge();
        }
        match self.next_phase {
            Phase::Read => {
                self.read_phase();
                self.next_phase = Phase::Drive;
            }
            Phase::Drive => {
                self.drive_phase();
                self.next_phase = Phase::Read;
            }
        }
    }

    /// Sample the other mux side plus the direct switches.
    pub fn read_phase(&mut self) -> ScanReport {
        for line in 0..SHARED_LINES {
            self.bus.drive_line(line, true);
        }
        self.side = self.side.toggled();
        self.bus.set_mux_enable(Some(self.side));
        for group in LedGroup::ALL {
            self.bus.set_led_group(group, 0);
        }

        let mut report = ScanReport::default();
        for line in 0..SHARED_LINES {
            self.bus.set_pulldown(line, true);
            let level = self.bus.read_line(line);
            self.bus.set_pulldown(line, false);
            if let Some(input) = LogicalInput::muxed(line, self.side) {
                self.observe(input, level, &mut report);
            }
        }
        self.sample_switches(&mut report);

        self.stats.cycles.fetch_add(1, Ordering::Relaxed);
        self.publish(&report);
        report
    }

    /// Put the output pattern on the shared lines.
    pub fn drive_phase(&mut self) {
        self.bus.set_mux_enable(None);
        let pattern = self.outputs.pattern();
        for (line, lit) in pattern.iter().enumerate() {
            // Active low
            self.bus.drive_line(line, !lit);
        }
        for group in LedGroup::ALL {
            self.bus.set_led_group(group, self.outputs.group_duty(group));
        }
    }

    /// Read the direct switches outside the phase cadence.
    pub fn service_switch_edge(&mut self) -> ScanReport {
        self.stats.switch_edges.fetch_add(1, Ordering::Relaxed);
        let mut report = ScanReport::default();
        self.sample_switches(&mut report);
        self.bus.rearm_switch_interrupts();
        self.publish(&report);
        report
    }

    /// Scan forever, one phase per `period`.
    pub fn run(mut self, period: Duration) -> ! {
        logging::enter_scan_context();
        crate::log_info!("scanner running, phase {} ms", period.as_millis());
        loop {
            self.step();
            thread::sleep(period);
        }
    }

    fn sample_switches(&mut self, report: &mut ScanReport) {
        for switch in LogicalInput::SWITCHES {
            let level = self.bus.read_switch(switch);
            self.observe(switch, level, report);
        }
    }

    fn observe(&mut self, input: LogicalInput, level: bool, report: &mut ScanReport) {
        let Some(accepted) = self.debounce[input.index()].sample(level, self.debounce_samples) else {
            return;
        };
        self.inputs.set_level(input, accepted);
        report.changed |= input.bit();
        if accepted && input.is_event() {
            self.inputs.latch(input);
            report.latched |= input.bit();
        }
        crate::log_debug!("{:?} -> {}", input, accepted as u8);
    }

    fn publish(&mut self, report: &ScanReport) {
        if !report.is_empty() {
            self.stats.callbacks.fetch_add(1, Ordering::Relaxed);
            (self.on_change)(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_needs_consecutive_samples() {
        let mut d = Debounce::default();
        assert_eq!(d.sample(true, 2), None);
        assert_eq!(d.sample(false, 2), None); // glitch resets
        assert_eq!(d.sample(true, 2), None);
        assert_eq!(d.sample(true, 2), Some(true));
        assert_eq!(d.sample(true, 2), None);
    }

    #[test]
    fn test_report_mode_switch() {
        let mut report = ScanReport::default();
        report.changed |= LogicalInput::Beak.bit();
        assert!(!report.mode_switch_changed());
        report.changed |= LogicalInput::PlaySwitch.bit();
        assert!(report.mode_switch_changed());
    }
}

//! LED output driver.
//!
//! Eight LEDs share the open-drain lines of the input bus. An LED lights
//! when its shared line is pulled low AND its group line (left, middle or
//! right) carries PWM duty:
//!
//! ```text
//! position   0    1    2    3    4    5    6    7
//! shape      star tri  sq   hrt  hrt  sq   tri  star
//! group      L    L    L    M    M    R    R    R
//! ```
//!
//! This module only updates the shared state; the scanner applies it to
//! the pins during its next drive phase.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::input::SHARED_LINES;

/// Number of LED positions.
pub const POSITIONS: usize = SHARED_LINES;

/// Number of PWM group lines.
pub const LED_GROUPS: usize = 3;

/// Full-brightness duty in percent.
pub const FULL_DUTY: u8 = 100;

/// One PWM-driven LED group line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedGroup {
    Left,
    Middle,
    Right,
}

impl LedGroup {
    pub const ALL: [LedGroup; LED_GROUPS] = [LedGroup::Left, LedGroup::Middle, LedGroup::Right];

    /// Group line feeding the LED at `position`.
    pub fn of_position(position: usize) -> LedGroup {
        match position {
            0..=2 => LedGroup::Left,
            3 | 4 => LedGroup::Middle,
            _ => LedGroup::Right,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Position pattern and group duties shared with the scanner.
///
/// Written by the behaviour loop, read by the scanner's drive phase.
pub struct OutputDriver {
    /// Bit `i` set means position `i` is lit.
    pattern: AtomicU8,
    /// Group line duty in percent.
    duty: [AtomicU8; LED_GROUPS],
    /// Duty applied to a group that has at least one lit position.
    brightness: u8,
}

impl OutputDriver {
    /// Driver with position 0 lit.
    pub const fn new(brightness: u8) -> Self {
        let brightness = if brightness > FULL_DUTY { FULL_DUTY } else { brightness };
        Self {
            pattern: AtomicU8::new(1),
            // Left group carries position 0
            duty: [AtomicU8::new(brightness), AtomicU8::new(0), AtomicU8::new(0)],
            brightness,
        }
    }

    /// Light exactly the given positions.
    ///
    /// A group line gets duty when any of its positions is lit, so a
    /// pattern with two positions in the same group is rendered faithfully
    /// while positions sharing a shared line never conflict.
    pub fn set_led_pattern(&self, positions: [bool; POSITIONS]) {
        let mut mask = 0u8;
        let mut group_on = [false; LED_GROUPS];
        for (position, _) in positions.iter().enumerate().filter(|(_, on)| **on) {
            mask |= 1 << position;
            group_on[LedGroup::of_position(position).index()] = true;
        }

        for group in LedGroup::ALL {
            let duty = if group_on[group.index()] { self.brightness } else { 0 };
            self.duty[group.index()].store(duty, Ordering::Release);
        }
        self.pattern.store(mask, Ordering::Release);
    }

    /// Current pattern as seen by the next drive phase.
    pub fn pattern(&self) -> [bool; POSITIONS] {
        let mask = self.pattern.load(Ordering::Acquire);
        core::array::from_fn(|position| mask & (1 << position) != 0)
    }

    /// Whether the LED at `position` sinks current (shared line low).
    #[inline]
    pub fn is_lit(&self, position: usize) -> bool {
        position < POSITIONS && self.pattern.load(Ordering::Acquire) & (1 << position) != 0
    }

    /// Lowest lit position, if any.
    pub fn active_position(&self) -> Option<usize> {
        let mask = self.pattern.load(Ordering::Acquire);
        (mask != 0).then(|| mask.trailing_zeros() as usize)
    }

    /// Move the single lit position one step round-robin.
    ///
    /// With nothing lit the rotation restarts at position 0. Returns the
    /// newly lit position.
    pub fn advance_rotation(&self) -> usize {
        let next = match self.active_position() {
            Some(current) => (current + 1) % POSITIONS,
            None => 0,
        };
        let mut positions = [false; POSITIONS];
        positions[next] = true;
        self.set_led_pattern(positions);
        next
    }

    /// Duty to apply to `group` during the drive phase.
    #[inline]
    pub fn group_duty(&self, group: LedGroup) -> u8 {
        self.duty[group.index()].load(Ordering::Acquire)
    }
}

impl Default for OutputDriver {
    fn default() -> Self {
        Self::new(FULL_DUTY)
    }
}

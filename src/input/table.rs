//! Shared input state: edge latches plus debounced levels.

use core::sync::atomic::{AtomicBool, Ordering};

use super::{LogicalInput, INPUT_COUNT};

/// Latched events and current levels for every logical input.
///
/// Each latch slot has exactly two writers with disjoint operations: the
/// scanner only ever sets it, the behaviour loop only ever takes (clears)
/// it. `swap` makes the take atomic, so a rising edge landing between the
/// consumer's read and clear is never lost.
///
/// Levels are written only by the scanner.
pub struct InputTable {
    latched: [AtomicBool; INPUT_COUNT],
    levels: [AtomicBool; INPUT_COUNT],
}

impl InputTable {
    pub const fn new() -> Self {
        const CLEAR: AtomicBool = AtomicBool::new(false);
        Self {
            latched: [CLEAR; INPUT_COUNT],
            levels: [CLEAR; INPUT_COUNT],
        }
    }

    /// Latch an event (scanner side).
    #[inline]
    pub fn latch(&self, input: LogicalInput) {
        self.latched[input.index()].store(true, Ordering::Release);
    }

    /// Consume an event (behaviour side). Returns whether it was latched.
    #[inline]
    pub fn take(&self, input: LogicalInput) -> bool {
        self.latched[input.index()].swap(false, Ordering::AcqRel)
    }

    /// Consume every input of a group; true if any was latched.
    ///
    /// All members are cleared even when the first one was already set.
    pub fn take_any(&self, inputs: &[LogicalInput]) -> bool {
        inputs.iter().fold(false, |any, &input| self.take(input) | any)
    }

    #[inline]
    pub fn is_latched(&self, input: LogicalInput) -> bool {
        self.latched[input.index()].load(Ordering::Acquire)
    }

    /// Publish a debounced level (scanner side).
    #[inline]
    pub fn set_level(&self, input: LogicalInput, level: bool) {
        self.levels[input.index()].store(level, Ordering::Release);
    }

    #[inline]
    pub fn level(&self, input: LogicalInput) -> bool {
        self.levels[input.index()].load(Ordering::Acquire)
    }

    /// Drop every pending event.
    pub fn clear_latches(&self) {
        for slot in &self.latched {
            slot.store(false, Ordering::Release);
        }
    }

    /// Bit mask of latched inputs, indexed like [`LogicalInput::bit`].
    pub fn latched_mask(&self) -> u32 {
        LogicalInput::ALL
            .iter()
            .filter(|input| self.is_latched(**input))
            .fold(0, |mask, input| mask | input.bit())
    }
}

impl Default for InputTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_once() {
        let table = InputTable::new();
        table.latch(LogicalInput::Beak);
        assert!(table.is_latched(LogicalInput::Beak));
        assert!(table.take(LogicalInput::Beak));
        assert!(!table.take(LogicalInput::Beak));
    }

    #[test]
    fn test_take_any_clears_whole_group() {
        let table = InputTable::new();
        table.latch(LogicalInput::HeartLeftButton);
        table.latch(LogicalInput::HeartRightButton);
        assert!(table.take_any(&[LogicalInput::HeartLeftButton, LogicalInput::HeartRightButton]));
        assert_eq!(table.latched_mask(), 0);
    }

    #[test]
    fn test_levels_independent_of_latches() {
        let table = InputTable::new();
        table.set_level(LogicalInput::LearnSwitch, true);
        assert!(table.level(LogicalInput::LearnSwitch));
        assert!(!table.is_latched(LogicalInput::LearnSwitch));
        table.latch(LogicalInput::StarRightClip);
        table.clear_latches();
        assert_eq!(table.latched_mask(), 0);
        assert!(table.level(LogicalInput::LearnSwitch));
    }
}

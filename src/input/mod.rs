//! Logical inputs recovered from the multiplexed sensor bus.
//!
//! Eight shared lines carry either button or clip levels depending on
//! which mux enable line is active; three switches (beak, learn, play)
//! have dedicated pins. Together they form 19 logical inputs.

mod scanner;
mod table;

pub use scanner::{MuxBus, MuxScanner, ScanReport, ScanStats};
pub use table::InputTable;

/// Number of shared open-drain lines.
pub const SHARED_LINES: usize = 8;

/// Total number of logical inputs.
pub const INPUT_COUNT: usize = 19;

/// The four shape/emotion identities printed on the toy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Happy.
    Heart,
    /// Sad.
    Square,
    /// Angry.
    Triangle,
    /// Surprised.
    Star,
}

impl Shape {
    /// Priority order used by the behaviour loop.
    pub const ALL: [Shape; 4] = [Shape::Heart, Shape::Square, Shape::Triangle, Shape::Star];

    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Heart => "heart",
            Shape::Square => "square",
            Shape::Triangle => "triangle",
            Shape::Star => "star",
        }
    }

    /// Shared lines (left, right) wired to this shape.
    pub fn lines(self) -> [usize; 2] {
        match self {
            Shape::Star => [0, 7],
            Shape::Triangle => [1, 6],
            Shape::Square => [2, 5],
            Shape::Heart => [3, 4],
        }
    }
}

/// Which side of the multiplexer is enabled during a read phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuxSide {
    Buttons,
    Clips,
}

impl MuxSide {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            MuxSide::Buttons => MuxSide::Clips,
            MuxSide::Clips => MuxSide::Buttons,
        }
    }
}

/// One of the 19 sensor signals.
///
/// Discriminants index the input table: 0..8 buttons and 8..16 clips in
/// shared-line order, then the three direct switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogicalInput {
    StarLeftButton = 0,
    TriangleLeftButton,
    SquareLeftButton,
    HeartLeftButton,
    HeartRightButton,
    SquareRightButton,
    TriangleRightButton,
    StarRightButton,
    StarLeftClip,
    TriangleLeftClip,
    SquareLeftClip,
    HeartLeftClip,
    HeartRightClip,
    SquareRightClip,
    TriangleRightClip,
    StarRightClip,
    Beak,
    LearnSwitch,
    PlaySwitch,
}

impl LogicalInput {
    pub const ALL: [LogicalInput; INPUT_COUNT] = [
        LogicalInput::StarLeftButton,
        LogicalInput::TriangleLeftButton,
        LogicalInput::SquareLeftButton,
        LogicalInput::HeartLeftButton,
        LogicalInput::HeartRightButton,
        LogicalInput::SquareRightButton,
        LogicalInput::TriangleRightButton,
        LogicalInput::StarRightButton,
        LogicalInput::StarLeftClip,
        LogicalInput::TriangleLeftClip,
        LogicalInput::SquareLeftClip,
        LogicalInput::HeartLeftClip,
        LogicalInput::HeartRightClip,
        LogicalInput::SquareRightClip,
        LogicalInput::TriangleRightClip,
        LogicalInput::StarRightClip,
        LogicalInput::Beak,
        LogicalInput::LearnSwitch,
        LogicalInput::PlaySwitch,
    ];

    /// Inputs with dedicated pins, sampled outside the multiplexer.
    pub const SWITCHES: [LogicalInput; 3] = [
        LogicalInput::Beak,
        LogicalInput::LearnSwitch,
        LogicalInput::PlaySwitch,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit for this input in a [`ScanReport`] mask.
    #[inline]
    pub fn bit(self) -> u32 {
        1 << self.index()
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Logical input seen on `line` while `side` is enabled.
    #[inline]
    pub fn muxed(line: usize, side: MuxSide) -> Option<Self> {
        if line >= SHARED_LINES {
            return None;
        }
        match side {
            MuxSide::Buttons => Self::from_index(line),
            MuxSide::Clips => Self::from_index(SHARED_LINES + line),
        }
    }

    /// Shared line for a multiplexed input, `None` for direct switches.
    pub fn line(self) -> Option<usize> {
        match self.index() {
            i if i < SHARED_LINES => Some(i),
            i if i < 2 * SHARED_LINES => Some(i - SHARED_LINES),
            _ => None,
        }
    }

    /// Button and clip inputs for `shape`, left then right.
    pub fn buttons(shape: Shape) -> [LogicalInput; 2] {
        shape.lines().map(|line| Self::ALL[line])
    }

    pub fn clips(shape: Shape) -> [LogicalInput; 2] {
        shape.lines().map(|line| Self::ALL[SHARED_LINES + line])
    }

    /// Whether a rising level latches an event for the behaviour loop.
    ///
    /// Mode switches only publish their level.
    #[inline]
    pub fn is_event(self) -> bool {
        !matches!(self, LogicalInput::LearnSwitch | LogicalInput::PlaySwitch)
    }

    /// Whether a level change on this input can change the operating mode.
    #[inline]
    pub fn is_mode_switch(self) -> bool {
        matches!(self, LogicalInput::LearnSwitch | LogicalInput::PlaySwitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_shared_line_maps_to_two_inputs() {
        for line in 0..SHARED_LINES {
            let button = LogicalInput::muxed(line, MuxSide::Buttons).unwrap();
            let clip = LogicalInput::muxed(line, MuxSide::Clips).unwrap();
            assert_ne!(button, clip);
            assert_eq!(button.line(), Some(line));
            assert_eq!(clip.line(), Some(line));
        }
        assert_eq!(LogicalInput::muxed(SHARED_LINES, MuxSide::Buttons), None);
    }

    #[test]
    fn test_switches_have_no_line() {
        for switch in LogicalInput::SWITCHES {
            assert_eq!(switch.line(), None);
        }
    }

    #[test]
    fn test_shape_groups() {
        assert_eq!(
            LogicalInput::buttons(Shape::Heart),
            [LogicalInput::HeartLeftButton, LogicalInput::HeartRightButton]
        );
        assert_eq!(
            LogicalInput::clips(Shape::Star),
            [LogicalInput::StarLeftClip, LogicalInput::StarRightClip]
        );
    }

    #[test]
    fn test_index_round_trip() {
        for (i, input) in LogicalInput::ALL.iter().enumerate() {
            assert_eq!(input.index(), i);
            assert_eq!(LogicalInput::from_index(i), Some(*input));
        }
        assert!(LogicalInput::Beak.is_event());
        assert!(!LogicalInput::PlaySwitch.is_event());
    }
}

//! Mode and behaviour state machine.
//!
//! Switch levels select the operating mode; latched button, clip and beak
//! events select clips according to the mode's script. The machine runs
//! once per behaviour tick, slower than the scanner.

mod machine;
mod script;
mod speaker;

pub use machine::{Behavior, TickOutcome};
pub use script::{Cue, GroupScript, ModeScript, ScriptSet};
pub use speaker::{Speaker, ToySpeaker};

use core::fmt;

use crate::input::{InputTable, LogicalInput, Shape};

/// Operating mode selected by the two mode switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Learn,
    Play,
    Music,
}

impl Mode {
    /// Learn wins over play; neither switch means music.
    pub fn derive(learn: bool, play: bool) -> Mode {
        if learn {
            Mode::Learn
        } else if play {
            Mode::Play
        } else {
            Mode::Music
        }
    }

    /// Mode from the published switch levels.
    pub fn from_inputs(inputs: &InputTable) -> Mode {
        Mode::derive(
            inputs.level(LogicalInput::LearnSwitch),
            inputs.level(LogicalInput::PlaySwitch),
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Learn => "LEARN",
            Mode::Play => "PLAY",
            Mode::Music => "MUSIC",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of input groups a script covers.
pub const GROUP_COUNT: usize = 9;

/// Inputs serviced together by one script entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Button(Shape),
    Clip(Shape),
    Beak,
}

impl Group {
    /// Service order within a tick: heart, square, triangle, star (button
    /// before clip), then beak.
    pub const PRIORITY: [Group; GROUP_COUNT] = [
        Group::Button(Shape::Heart),
        Group::Clip(Shape::Heart),
        Group::Button(Shape::Square),
        Group::Clip(Shape::Square),
        Group::Button(Shape::Triangle),
        Group::Clip(Shape::Triangle),
        Group::Button(Shape::Star),
        Group::Clip(Shape::Star),
        Group::Beak,
    ];

    /// Position in [`Group::PRIORITY`] and in a script's group array.
    pub fn index(self) -> usize {
        let shape_slot = |shape: Shape| match shape {
            Shape::Heart => 0,
            Shape::Square => 1,
            Shape::Triangle => 2,
            Shape::Star => 3,
        };
        match self {
            Group::Button(shape) => 2 * shape_slot(shape),
            Group::Clip(shape) => 2 * shape_slot(shape) + 1,
            Group::Beak => GROUP_COUNT - 1,
        }
    }

    /// Consume the group's latches; true if any was set.
    pub fn take(self, inputs: &InputTable) -> bool {
        match self {
            Group::Button(shape) => inputs.take_any(&LogicalInput::buttons(shape)),
            Group::Clip(shape) => inputs.take_any(&LogicalInput::clips(shape)),
            Group::Beak => inputs.take(LogicalInput::Beak),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Button(shape) => write!(f, "{} button", shape.as_str()),
            Group::Clip(shape) => write!(f, "{} clip", shape.as_str()),
            Group::Beak => f.write_str("beak"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_matches_index() {
        for (i, group) in Group::PRIORITY.iter().enumerate() {
            assert_eq!(group.index(), i);
        }
    }

    #[test]
    fn test_group_take_clears_both_sides() {
        let inputs = InputTable::new();
        inputs.latch(LogicalInput::SquareRightClip);
        assert!(!Group::Button(Shape::Square).take(&inputs));
        assert!(Group::Clip(Shape::Square).take(&inputs));
        assert!(!Group::Clip(Shape::Square).take(&inputs));
    }
}

//! Board pin map.
//!
//! The eight shared lines are open-drain: during the read phase they carry
//! button or clip levels (selected by the two mux enable lines), during the
//! drive phase they sink current for the LED at that position.

use crate::input::SHARED_LINES;
use crate::output::LED_GROUPS;

/// GPIO numbers for every line the firmware touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pins {
    /// Enables the button side of the multiplexer.
    pub mux_buttons: i32,
    /// Enables the clip side of the multiplexer.
    pub mux_clips: i32,
    /// Shared lines in position order: star L, triangle L, square L,
    /// heart L, heart R, square R, triangle R, star R.
    pub shared: [i32; SHARED_LINES],
    /// Beak switch (direct input).
    pub beak: i32,
    /// Learn mode switch (direct input, input-only pad).
    pub learn: i32,
    /// Play mode switch (direct input, input-only pad).
    pub play: i32,
    /// LED group lines: left, middle, right.
    pub leds: [i32; LED_GROUPS],
    /// Shell transport UART TX.
    pub shell_tx: i32,
    /// Shell transport UART RX.
    pub shell_rx: i32,
}

impl Pins {
    pub const DEFAULT: Pins = Pins {
        mux_buttons: 4,
        mux_clips: 5,
        shared: [21, 19, 27, 14, 12, 13, 18, 16],
        beak: 15,
        learn: 34,
        play: 35,
        leds: [22, 26, 17],
        shell_tx: 25,
        shell_rx: 33,
    };
}

impl Default for Pins {
    fn default() -> Self {
        Self::DEFAULT
    }
}

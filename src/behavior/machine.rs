//! The behaviour tick.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::script::{Cue, GroupScript, ScriptSet};
use super::speaker::Speaker;
use super::{Group, Mode};
use crate::audio::PlaybackError;
use crate::input::InputTable;
use crate::output::OutputDriver;

/// How a tick ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Every latched group was serviced and the indicator advanced.
    Completed,
    /// A group's clip was cancelled. Lower-priority groups keep their
    /// latches for a later tick; the indicator still advanced.
    Interrupted,
    /// The mode intro was cancelled. No group ran and the indicator stayed.
    IntroInterrupted,
}

/// Couples latched inputs to clips and drives the rotating indicator.
pub struct Behavior<S> {
    inputs: Arc<InputTable>,
    outputs: Arc<OutputDriver>,
    speaker: S,
    scripts: ScriptSet,
    /// Mode seen on the previous tick.
    mode: Option<Mode>,
    /// Variety toggle shared by all groups.
    even: bool,
}

impl<S: Speaker> Behavior<S> {
    pub fn new(inputs: Arc<InputTable>, outputs: Arc<OutputDriver>, speaker: S, scripts: ScriptSet) -> Self {
        Self {
            inputs,
            outputs,
            speaker,
            scripts,
            mode: None,
            even: false,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn speaker(&self) -> &S {
        &self.speaker
    }

    /// Boot greeting.
    pub fn welcome(&mut self) {
        if let Some(cue) = self.scripts.welcome {
            self.say(cue);
        }
    }

    /// One pass of the state machine.
    pub fn tick(&mut self) -> TickOutcome {
        let mode = Mode::from_inputs(&self.inputs);
        let script = *self.scripts.for_mode(mode);

        if self.mode != Some(mode) {
            self.mode = Some(mode);
            crate::log_info!("mode {}", mode);
            if let Some(intro) = script.intro {
                if self.say(intro) {
                    return TickOutcome::IntroInterrupted;
                }
            }
        }

        let mut outcome = TickOutcome::Completed;
        for group in Group::PRIORITY {
            if !group.take(&self.inputs) {
                continue;
            }
            crate::log_debug!("{} in {}", group, mode);
            if self.run_group(script.group(group)) {
                outcome = TickOutcome::Interrupted;
                break;
            }
        }

        self.outputs.advance_rotation();
        outcome
    }

    /// Tick forever at `period`.
    pub fn run(mut self, period: Duration) -> ! {
        loop {
            let started = Instant::now();
            self.tick();
            thread::sleep(period.saturating_sub(started.elapsed()));
        }
    }

    /// Returns true when the group was cut short by cancellation.
    fn run_group(&mut self, script: &GroupScript) -> bool {
        if let Some(lead) = script.lead {
            if self.say(lead) {
                return true;
            }
        }
        if let Some(variety) = script.variety {
            let cue = variety[usize::from(self.even)];
            self.even = !self.even;
            if self.say(cue) {
                return true;
            }
        }
        false
    }

    /// Play a cue. Returns true when it was cancelled.
    ///
    /// Failures are logged by the player and do not stop the tick.
    fn say(&mut self, cue: Cue) -> bool {
        match self.speaker.speak(cue) {
            Ok(()) => false,
            Err(PlaybackError::Aborted) => true,
            Err(e) => {
                crate::log_warn!("{:?} skipped: {}", cue, e);
                false
            }
        }
    }
}

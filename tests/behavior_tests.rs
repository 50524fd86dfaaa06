//! Behaviour machine tests with a scripted speaker

use std::sync::Arc;

use sipkip_firmware::audio::PlaybackError;
use sipkip_firmware::behavior::{Behavior, Cue, Mode, ScriptSet, Speaker, TickOutcome};
use sipkip_firmware::input::{InputTable, LogicalInput};
use sipkip_firmware::output::{OutputDriver, POSITIONS};

/// Records cues; reports `Aborted` for one chosen cue.
#[derive(Default)]
struct FakeSpeaker {
    spoken: Vec<Cue>,
    abort_on: Option<Cue>,
}

impl Speaker for FakeSpeaker {
    fn speak(&mut self, cue: Cue) -> Result<(), PlaybackError> {
        self.spoken.push(cue);
        if self.abort_on == Some(cue) {
            return Err(PlaybackError::Aborted);
        }
        Ok(())
    }
}

struct Toy {
    inputs: Arc<InputTable>,
    outputs: Arc<OutputDriver>,
    behavior: Behavior<FakeSpeaker>,
}

fn toy(abort_on: Option<Cue>) -> Toy {
    let inputs = Arc::new(InputTable::new());
    let outputs = Arc::new(OutputDriver::default());
    let speaker = FakeSpeaker {
        abort_on,
        ..FakeSpeaker::default()
    };
    let behavior = Behavior::new(Arc::clone(&inputs), Arc::clone(&outputs), speaker, ScriptSet::STOCK);
    Toy {
        inputs,
        outputs,
        behavior,
    }
}

impl Toy {
    fn spoken(&self) -> &[Cue] {
        &self.behavior.speaker().spoken
    }
}

#[test]
fn test_mode_derivation() {
    assert_eq!(Mode::derive(true, false), Mode::Learn);
    assert_eq!(Mode::derive(true, true), Mode::Learn);
    assert_eq!(Mode::derive(false, true), Mode::Play);
    assert_eq!(Mode::derive(false, false), Mode::Music);
}

#[test]
fn test_welcome_plays_greeting() {
    let mut toy = toy(None);
    toy.behavior.welcome();
    assert_eq!(toy.spoken(), &[Cue::Clip("welcome")]);
}

#[test]
fn test_intro_plays_once_per_mode_entry() {
    let mut toy = toy(None);
    assert_eq!(toy.behavior.tick(), TickOutcome::Completed);
    assert_eq!(toy.behavior.tick(), TickOutcome::Completed);
    assert_eq!(toy.spoken(), &[Cue::Clip("music-intro")]);
    assert_eq!(toy.behavior.mode(), Some(Mode::Music));

    toy.inputs.set_level(LogicalInput::PlaySwitch, true);
    toy.behavior.tick();
    toy.inputs.set_level(LogicalInput::LearnSwitch, true);
    toy.behavior.tick();

    assert_eq!(
        toy.spoken(),
        &[Cue::Clip("music-intro"), Cue::Clip("play-intro"), Cue::Clip("learn-intro")]
    );
}

#[test]
fn test_groups_serviced_in_priority_order() {
    let mut toy = toy(None);
    toy.inputs.latch(LogicalInput::Beak);
    toy.inputs.latch(LogicalInput::StarRightButton);
    toy.inputs.latch(LogicalInput::HeartLeftClip);

    assert_eq!(toy.behavior.tick(), TickOutcome::Completed);

    assert_eq!(
        toy.spoken(),
        &[
            Cue::Clip("music-intro"),
            Cue::Stored("1"),
            Cue::Clip("music-surprised"),
            Cue::Clip("music-surprised-tune-a"),
            // Toggle is shared, so the beak gets the other tune
            Cue::Stored("b"),
            Cue::Clip("music-beak-tune-b"),
        ]
    );
    assert_eq!(toy.inputs.latched_mask(), 0);
}

#[test]
fn test_variety_alternates_across_invocations() {
    let mut toy = toy(None);
    toy.behavior.tick();
    for _ in 0..3 {
        toy.inputs.latch(LogicalInput::HeartRightButton);
        toy.behavior.tick();
    }

    let tunes: Vec<_> = toy.spoken().iter().filter(|c| matches!(c, Cue::Clip(n) if n.contains("tune"))).collect();
    assert_eq!(
        tunes,
        [
            &Cue::Clip("music-happy-tune-a"),
            &Cue::Clip("music-happy-tune-b"),
            &Cue::Clip("music-happy-tune-a"),
        ]
    );
}

#[test]
fn test_both_latches_of_a_pair_cleared_together() {
    let mut toy = toy(None);
    toy.behavior.tick();
    toy.inputs.latch(LogicalInput::SquareLeftButton);
    toy.inputs.latch(LogicalInput::SquareRightButton);

    toy.behavior.tick();
    toy.behavior.tick();

    let sad = toy.spoken().iter().filter(|c| **c == Cue::Clip("music-sad")).count();
    assert_eq!(sad, 1);
}

#[test]
fn test_abort_leaves_lower_priority_latched() {
    let mut toy = toy(Some(Cue::Clip("music-happy")));
    toy.behavior.tick();
    toy.inputs.latch(LogicalInput::HeartLeftButton);
    toy.inputs.latch(LogicalInput::TriangleLeftClip);
    let before = toy.outputs.active_position();

    assert_eq!(toy.behavior.tick(), TickOutcome::Interrupted);

    assert!(toy.inputs.is_latched(LogicalInput::TriangleLeftClip));
    assert!(!toy.inputs.is_latched(LogicalInput::HeartLeftButton));
    // Variety clip skipped, indicator still advanced
    assert_eq!(toy.spoken().last(), Some(&Cue::Clip("music-happy")));
    assert_ne!(toy.outputs.active_position(), before);

    assert_eq!(toy.behavior.tick(), TickOutcome::Completed);
    assert_eq!(toy.spoken().last(), Some(&Cue::Stored("3")));
}

#[test]
fn test_intro_abort_skips_groups_and_rotation() {
    let mut toy = toy(Some(Cue::Clip("music-intro")));
    toy.inputs.latch(LogicalInput::Beak);

    assert_eq!(toy.behavior.tick(), TickOutcome::IntroInterrupted);
    assert!(toy.inputs.is_latched(LogicalInput::Beak));
    assert_eq!(toy.outputs.active_position(), Some(0));

    // Same mode next tick: no intro, the beak gets its turn
    assert_eq!(toy.behavior.tick(), TickOutcome::Completed);
    assert_eq!(toy.spoken()[1], Cue::Stored("b"));
}

#[test]
fn test_rotation_follows_tick_count() {
    let mut toy = toy(None);
    for n in 1..=20 {
        toy.behavior.tick();
        assert_eq!(toy.outputs.active_position(), Some(n % POSITIONS));
        let lit = (0..POSITIONS).filter(|p| toy.outputs.is_lit(*p)).count();
        assert_eq!(lit, 1);
    }
}

#[test]
fn test_playback_failure_does_not_stop_tick() {
    struct Broken(Vec<Cue>);

    impl Speaker for Broken {
        fn speak(&mut self, cue: Cue) -> Result<(), PlaybackError> {
            self.0.push(cue);
            Err(PlaybackError::OutOfMemory(64))
        }
    }

    let inputs = Arc::new(InputTable::new());
    let outputs = Arc::new(OutputDriver::default());
    let mut behavior = Behavior::new(Arc::clone(&inputs), outputs, Broken(Vec::new()), ScriptSet::STOCK);
    inputs.latch(LogicalInput::HeartLeftButton);
    inputs.latch(LogicalInput::Beak);

    assert_eq!(behavior.tick(), TickOutcome::Completed);
    // intro, heart lead + tune, beak lead + tune
    assert_eq!(behavior.speaker().0.len(), 5);
}

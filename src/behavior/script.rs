//! Per-mode clip scripts.
//!
//! What each mode says is data: an optional intro cue, and for each of the
//! nine input groups a lead cue plus an optional pair of variety cues that
//! alternate across invocations.

use super::{Group, Mode, GROUP_COUNT};

/// Something to say.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// Memory-resident clip by name.
    Clip(&'static str),
    /// Random filesystem clip below the storage base: `<prefix>-*.opus`,
    /// falling back to `<prefix>.opus`.
    Stored(&'static str),
}

/// Reaction to one input group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupScript {
    pub lead: Option<Cue>,
    /// Alternates on a toggle shared by all groups.
    pub variety: Option<[Cue; 2]>,
}

impl GroupScript {
    pub const SILENT: GroupScript = GroupScript {
        lead: None,
        variety: None,
    };

    pub const fn lead(cue: Cue) -> Self {
        Self {
            lead: Some(cue),
            variety: None,
        }
    }

    pub const fn with_variety(lead: Cue, a: Cue, b: Cue) -> Self {
        Self {
            lead: Some(lead),
            variety: Some([a, b]),
        }
    }
}

/// Script for one mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeScript {
    /// Played once when the mode is entered.
    pub intro: Option<Cue>,
    /// Indexed by [`Group::index`].
    pub groups: [GroupScript; GROUP_COUNT],
}

impl ModeScript {
    pub fn group(&self, group: Group) -> &GroupScript {
        &self.groups[group.index()]
    }
}

/// Scripts for every mode plus the boot greeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptSet {
    pub welcome: Option<Cue>,
    pub learn: ModeScript,
    pub play: ModeScript,
    pub music: ModeScript,
}

impl ScriptSet {
    /// Every cue in the set, welcome first, then by mode.
    pub fn cues(&self) -> impl Iterator<Item = Cue> + '_ {
        let modes = [&self.learn, &self.play, &self.music];
        self.welcome.into_iter().chain(modes.into_iter().flat_map(|mode| {
            mode.intro.into_iter().chain(
                mode.groups
                    .iter()
                    .flat_map(|g| g.lead.into_iter().chain(g.variety.into_iter().flatten())),
            )
        }))
    }

    pub fn for_mode(&self, mode: Mode) -> &ModeScript {
        match mode {
            Mode::Learn => &self.learn,
            Mode::Play => &self.play,
            Mode::Music => &self.music,
        }
    }

    /// The stock toy: clip names match `assets/clips`, stored prefixes
    /// match the upload layout (`1`..`4` per shape, `b` for the beak).
    pub const STOCK: ScriptSet = ScriptSet {
        welcome: Some(Cue::Clip("welcome")),
        learn: ModeScript {
            intro: Some(Cue::Clip("learn-intro")),
            groups: [
                GroupScript::lead(Cue::Clip("learn-heart")),
                GroupScript::lead(Cue::Clip("learn-heart-clip")),
                GroupScript::lead(Cue::Clip("learn-square")),
                GroupScript::lead(Cue::Clip("learn-square-clip")),
                GroupScript::lead(Cue::Clip("learn-triangle")),
                GroupScript::lead(Cue::Clip("learn-triangle-clip")),
                GroupScript::lead(Cue::Clip("learn-star")),
                GroupScript::lead(Cue::Clip("learn-star-clip")),
                GroupScript::lead(Cue::Clip("learn-beak")),
            ],
        },
        play: ModeScript {
            intro: Some(Cue::Clip("play-intro")),
            groups: [
                GroupScript::with_variety(Cue::Clip("play-happy"), Cue::Clip("play-happy-a"), Cue::Clip("play-happy-b")),
                GroupScript::lead(Cue::Stored("1")),
                GroupScript::with_variety(Cue::Clip("play-sad"), Cue::Clip("play-sad-a"), Cue::Clip("play-sad-b")),
                GroupScript::lead(Cue::Stored("2")),
                GroupScript::with_variety(Cue::Clip("play-angry"), Cue::Clip("play-angry-a"), Cue::Clip("play-angry-b")),
                GroupScript::lead(Cue::Stored("3")),
                GroupScript::with_variety(Cue::Clip("play-surprised"), Cue::Clip("play-surprised-a"), Cue::Clip("play-surprised-b")),
                GroupScript::lead(Cue::Stored("4")),
                GroupScript::lead(Cue::Clip("play-beak")),
            ],
        },
        music: ModeScript {
            intro: Some(Cue::Clip("music-intro")),
            groups: [
                GroupScript::with_variety(Cue::Clip("music-happy"), Cue::Clip("music-happy-tune-a"), Cue::Clip("music-happy-tune-b")),
                GroupScript::lead(Cue::Stored("1")),
                GroupScript::with_variety(Cue::Clip("music-sad"), Cue::Clip("music-sad-tune-a"), Cue::Clip("music-sad-tune-b")),
                GroupScript::lead(Cue::Stored("2")),
                GroupScript::with_variety(Cue::Clip("music-angry"), Cue::Clip("music-angry-tune-a"), Cue::Clip("music-angry-tune-b")),
                GroupScript::lead(Cue::Stored("3")),
                GroupScript::with_variety(Cue::Clip("music-surprised"), Cue::Clip("music-surprised-tune-a"), Cue::Clip("music-surprised-tune-b")),
                GroupScript::lead(Cue::Stored("4")),
                GroupScript::with_variety(Cue::Stored("b"), Cue::Clip("music-beak-tune-a"), Cue::Clip("music-beak-tune-b")),
            ],
        },
    };
}

impl Default for ScriptSet {
    fn default() -> Self {
        Self::STOCK
    }
}

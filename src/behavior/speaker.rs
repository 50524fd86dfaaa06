//! Turning cues into playback.

use std::sync::Arc;

use rand::Rng;

use super::Cue;
use crate::audio::{AudioStream, ClipTable, PlaybackError, StreamPlayer};
use crate::config::Storage;
use crate::storage;

/// Plays a cue, blocking until it is done.
pub trait Speaker {
    fn speak(&mut self, cue: Cue) -> Result<(), PlaybackError>;
}

/// Speaker backed by the player, the embedded clips and the filesystem.
pub struct ToySpeaker<R> {
    player: Arc<dyn StreamPlayer>,
    clips: Arc<ClipTable>,
    storage: Storage,
    rng: R,
}

impl<R: Rng> ToySpeaker<R> {
    pub fn new(player: Arc<dyn StreamPlayer>, clips: Arc<ClipTable>, storage: Storage, rng: R) -> Self {
        Self {
            player,
            clips,
            storage,
            rng,
        }
    }

    fn speak_stored(&mut self, prefix: &str) -> Result<(), PlaybackError> {
        let prefix = self.storage.prefix_path(prefix);
        let files = storage::choose_variant(&self.storage, &prefix, &mut self.rng)?;
        match AudioStream::open(&files.clip, &files.packets) {
            Ok(stream) => {
                crate::log_info!("playing {}", files.clip.display());
                self.player.play(stream)
            }
            Err(e) => {
                // Nothing uploaded for this group yet
                crate::log_warn!("cannot open {}: {}", files.clip.display(), e);
                Ok(())
            }
        }
    }
}

impl<R: Rng> Speaker for ToySpeaker<R> {
    fn speak(&mut self, cue: Cue) -> Result<(), PlaybackError> {
        match cue {
            Cue::Clip(name) => match self.clips.get(name) {
                Some(clip) => self.player.play(clip.stream()),
                None => {
                    crate::log_warn!("clip {} not in image", name);
                    Ok(())
                }
            },
            Cue::Stored(prefix) => self.speak_stored(prefix),
        }
    }
}

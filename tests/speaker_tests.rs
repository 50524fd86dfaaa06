//! Cue resolution through the toy speaker

use std::fs;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use sipkip_firmware::audio::{AudioStream, Clip, ClipTable, PlaybackError, PlaybackSnapshot, StreamPlayer};
use sipkip_firmware::behavior::{Cue, Speaker, ToySpeaker};
use sipkip_firmware::config::Storage;

#[derive(Debug, PartialEq, Eq)]
enum Played {
    Memory(Vec<u8>),
    File(Vec<u8>),
}

/// Records the compressed bytes of every stream it is handed.
#[derive(Default)]
struct RecordingPlayer {
    played: Mutex<Vec<Played>>,
    abort: AtomicBool,
}

impl StreamPlayer for RecordingPlayer {
    fn play(&self, stream: AudioStream<'_>) -> Result<(), PlaybackError> {
        let played = match stream {
            AudioStream::Memory { data, .. } => Played::Memory(data.to_vec()),
            AudioStream::File { mut data, .. } => {
                let mut bytes = Vec::new();
                data.read_to_end(&mut bytes)?;
                Played::File(bytes)
            }
        };
        self.played.lock().unwrap().push(played);
        if self.abort.load(Ordering::SeqCst) {
            return Err(PlaybackError::Aborted);
        }
        Ok(())
    }

    fn stop(&self) {}

    fn stats(&self) -> PlaybackSnapshot {
        PlaybackSnapshot::default()
    }
}

const HELLO: Clip = Clip {
    name: "hello",
    data: &[1, 2, 3],
    packets: &[3, 0],
};

struct Harness {
    dir: tempfile::TempDir,
    player: Arc<RecordingPlayer>,
    speaker: ToySpeaker<StdRng>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let player = Arc::new(RecordingPlayer::default());
        let storage = Storage {
            base_path: dir.path().to_path_buf(),
            ..Storage::default()
        };
        let speaker = ToySpeaker::new(
            Arc::clone(&player) as Arc<dyn StreamPlayer>,
            Arc::new(ClipTable::new([HELLO])),
            storage,
            StdRng::seed_from_u64(3),
        );
        Self { dir, player, speaker }
    }

    /// Write `<name>` with `body`, and its frame table unless `packets` is false.
    fn clip_file(&self, name: &str, body: &[u8], packets: bool) {
        fs::write(self.dir.path().join(name), body).unwrap();
        if packets {
            let table = (body.len() as u16).to_le_bytes();
            fs::write(self.dir.path().join(format!("{name}_packets")), table).unwrap();
        }
    }

    fn played(&self) -> Vec<Played> {
        std::mem::take(&mut *self.player.played.lock().unwrap())
    }
}

#[test]
fn test_embedded_clip_plays_from_memory() {
    let mut h = Harness::new();
    h.speaker.speak(Cue::Clip("hello")).unwrap();
    assert_eq!(h.played(), vec![Played::Memory(vec![1, 2, 3])]);
}

#[test]
fn test_missing_embedded_clip_is_skipped() {
    let mut h = Harness::new();
    h.speaker.speak(Cue::Clip("not-in-image")).unwrap();
    assert!(h.played().is_empty());
}

#[test]
fn test_stored_prefers_variant() {
    let mut h = Harness::new();
    h.clip_file("1.opus", b"plain", true);
    h.clip_file("1-a.opus", b"variant", true);

    h.speaker.speak(Cue::Stored("1")).unwrap();
    assert_eq!(h.played(), vec![Played::File(b"variant".to_vec())]);
}

#[test]
fn test_stored_falls_back_to_plain_clip() {
    let mut h = Harness::new();
    h.clip_file("2.opus", b"plain", true);
    // Other prefixes do not count as variants
    h.clip_file("20-a.opus", b"other", true);

    h.speaker.speak(Cue::Stored("2")).unwrap();
    assert_eq!(h.played(), vec![Played::File(b"plain".to_vec())]);
}

#[test]
fn test_absent_stored_clip_is_skipped() {
    let mut h = Harness::new();
    h.speaker.speak(Cue::Stored("b")).unwrap();
    assert!(h.played().is_empty());
}

#[test]
fn test_stored_clip_without_table_is_skipped() {
    let mut h = Harness::new();
    h.clip_file("3-a.opus", b"variant", false);

    h.speaker.speak(Cue::Stored("3")).unwrap();
    assert!(h.played().is_empty());
}

#[test]
fn test_abort_passes_through() {
    let mut h = Harness::new();
    h.clip_file("4.opus", b"plain", true);
    h.player.abort.store(true, Ordering::SeqCst);

    let err = h.speaker.speak(Cue::Stored("4")).unwrap_err();
    assert!(err.is_abort());
    let err = h.speaker.speak(Cue::Clip("hello")).unwrap_err();
    assert!(err.is_abort());
    assert_eq!(h.played().len(), 2);
}

//! Command handler tests over a temporary storage directory

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use common::ScriptedLink;
use sipkip_firmware::audio::{AudioStream, PlaybackError, PlaybackSnapshot, StreamPlayer};
use sipkip_firmware::config::Storage;
use sipkip_firmware::console::{execute, parse_line, ShellContext, ShellEnv, ShellError, COMMANDS};
use sipkip_firmware::fault::{FaultCode, FaultState};
use sipkip_firmware::xmodem::{crc16_ccitt, XmodemConfig, EOT, SOH};

/// Player that records the frame count of each stream.
#[derive(Default)]
struct RecordingPlayer {
    played: Mutex<Vec<usize>>,
    stops: AtomicU32,
    abort: bool,
}

impl StreamPlayer for RecordingPlayer {
    fn play(&self, stream: AudioStream<'_>) -> Result<(), PlaybackError> {
        self.played.lock().unwrap().push(stream.frame_count());
        if self.abort {
            return Err(PlaybackError::Aborted);
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }

    fn stats(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            sessions: 3,
            frames: 120,
            aborts: 1,
            failures: 0,
        }
    }
}

struct Harness {
    dir: tempfile::TempDir,
    player: Arc<RecordingPlayer>,
    env: ShellEnv,
    link: ScriptedLink,
    cwd: PathBuf,
}

impl Harness {
    fn new() -> Self {
        Self::with_player(RecordingPlayer::default())
    }

    fn with_player(player: RecordingPlayer) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let player = Arc::new(player);
        let env = ShellEnv {
            player: Arc::clone(&player) as Arc<dyn StreamPlayer>,
            storage: Storage {
                base_path: dir.path().to_path_buf(),
                ..Storage::default()
            },
            faults: Arc::new(FaultState::new()),
            scan_stats: None,
            xmodem: XmodemConfig::DEFAULT,
        };
        let cwd = dir.path().to_path_buf();
        Self {
            dir,
            player,
            env,
            link: ScriptedLink::default(),
            cwd,
        }
    }

    fn run(&mut self, line: &str) -> Result<(), ShellError> {
        let cmd = parse_line(line);
        let mut ctx = ShellContext {
            link: &mut self.link,
            env: &self.env,
            cwd: &mut self.cwd,
        };
        execute(&cmd, &mut ctx)
    }

    fn output(&mut self) -> String {
        self.link.take_output()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[test]
fn test_command_registry_has_all_commands() {
    let expected = [
        "help", "ls", "pwd", "cwd", "mkdir", "rmdir", "rm", "mv", "cp", "speak", "stop", "rx", "du", "stats",
        "loglevel",
    ];

    for name in expected {
        assert!(
            COMMANDS.iter().any(|c| c.name == name),
            "Command '{}' should be in registry",
            name
        );
    }
}

#[test]
fn test_execute_unknown_command() {
    let mut h = Harness::new();
    assert_eq!(h.run("foobar"), Err(ShellError::UnknownCommand));
}

#[test]
fn test_execute_empty_line() {
    let mut h = Harness::new();
    assert_eq!(h.run("   "), Ok(()));
    assert!(h.output().is_empty());
}

#[test]
fn test_argument_count_checked() {
    let mut h = Harness::new();
    assert_eq!(h.run("mv only-one"), Err(ShellError::Usage));
    assert_eq!(h.run("pwd extra"), Err(ShellError::Usage));
    assert_eq!(h.run("rm a b c d e f g h i j k l m n o p q"), Err(ShellError::Usage));
}

#[test]
fn test_help_lists_and_describes() {
    let mut h = Harness::new();
    h.run("help").unwrap();
    let out = h.output();
    assert!(out.contains("speak"));
    assert!(out.contains("loglevel"));

    h.run("help rx").unwrap();
    assert!(h.output().contains("Usage: rx <file>"));
    assert_eq!(h.run("help nope"), Err(ShellError::UnknownCommand));
}

#[test]
fn test_mkdir_and_ls() {
    let mut h = Harness::new();
    h.run("mkdir music").unwrap();
    fs::write(h.path("b.opus"), b"x").unwrap();

    h.run("ls").unwrap();
    assert_eq!(h.output(), "b.opus\r\nmusic/\r\n");

    h.run("ls b.opus").unwrap();
    assert_eq!(h.output(), format!("{}\r\n", h.path("b.opus").display()));
}

#[test]
fn test_ls_missing_reports_path() {
    let mut h = Harness::new();
    assert_eq!(h.run("ls ghost"), Err(ShellError::Io));
    let out = h.output();
    assert!(out.starts_with("stat "));
    assert!(out.contains("ghost failed"));
}

#[test]
fn test_cwd_and_pwd() {
    let mut h = Harness::new();
    fs::create_dir(h.path("music")).unwrap();
    fs::write(h.path("a.opus"), b"x").unwrap();

    h.run("cwd music").unwrap();
    h.run("pwd").unwrap();
    assert_eq!(h.output(), format!("{}\r\n", h.path("music").display()));

    h.run("cwd ..").unwrap();
    assert_eq!(h.cwd, h.dir.path());

    assert_eq!(h.run("cwd a.opus"), Err(ShellError::InvalidPath));
    assert_eq!(h.run("cwd nowhere"), Err(ShellError::Io));
    assert_eq!(h.cwd, h.dir.path());
}

#[test]
fn test_rm_rmdir_mv_cp() {
    let mut h = Harness::new();
    fs::write(h.path("a.opus"), b"abc").unwrap();
    fs::create_dir(h.path("old")).unwrap();

    h.run("cp a.opus b.opus").unwrap();
    assert_eq!(fs::read(h.path("b.opus")).unwrap(), b"abc");
    assert_eq!(h.run("cp a.opus b.opus"), Err(ShellError::Io));

    h.run("mv b.opus old/c.opus").unwrap();
    assert!(!h.path("b.opus").exists());
    assert!(h.path("old/c.opus").exists());

    assert_eq!(h.run("rmdir old"), Err(ShellError::Io));
    h.run("rm old/c.opus").unwrap();
    h.run("rmdir old").unwrap();
    assert!(!h.path("old").exists());

    assert_eq!(h.run("rm old/c.opus"), Err(ShellError::Io));
}

#[test]
fn test_speak_plays_stored_clip() {
    let mut h = Harness::new();
    fs::write(h.path("1.opus"), [0u8; 6]).unwrap();
    fs::write(h.path("1.opus_packets"), [2u8, 0, 0, 0, 4, 0]).unwrap();

    h.run("speak 1.opus 1.opus_packets").unwrap();

    assert_eq!(*h.player.played.lock().unwrap(), vec![3]);
    // Whatever was playing is stopped first
    assert_eq!(h.player.stops.load(Ordering::Relaxed), 1);
}

#[test]
fn test_speak_missing_clip() {
    let mut h = Harness::new();
    assert_eq!(h.run("speak 9.opus 9.opus_packets"), Err(ShellError::Io));
    assert!(h.player.played.lock().unwrap().is_empty());
}

#[test]
fn test_speak_interrupted_is_not_an_error() {
    let mut h = Harness::with_player(RecordingPlayer {
        abort: true,
        ..RecordingPlayer::default()
    });
    fs::write(h.path("1.opus"), [0u8; 2]).unwrap();
    fs::write(h.path("1.opus_packets"), [2u8, 0]).unwrap();

    assert_eq!(h.run("speak 1.opus 1.opus_packets"), Ok(()));
    assert_eq!(h.output(), "stopped\r\n");
}

#[test]
fn test_stop() {
    let mut h = Harness::new();
    h.run("stop").unwrap();
    assert_eq!(h.player.stops.load(Ordering::Relaxed), 1);
}

fn upload(data: &[u8; 128]) -> Vec<Option<u8>> {
    let mut bytes = vec![SOH, 1, 0xFE];
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(&crc16_ccitt(data).to_be_bytes());
    bytes.push(EOT);
    bytes.into_iter().map(Some).collect()
}

#[test]
fn test_rx_stores_upload() {
    let mut h = Harness::new();
    let data = [0x5Au8; 128];
    h.link = ScriptedLink::new(upload(&data));

    h.run("rx 1-new.opus").unwrap();

    assert_eq!(fs::read(h.path("1-new.opus")).unwrap(), data);
    let out = h.output();
    assert!(out.contains("Received"));
    assert!(out.contains("128 B"));
}

#[test]
fn test_rx_outside_storage_rejected() {
    let mut h = Harness::new();
    assert_eq!(h.run("rx /tmp/evil.opus"), Err(ShellError::InvalidPath));
    assert_eq!(h.run("rx ../evil.opus"), Err(ShellError::InvalidPath));
    assert_eq!(h.run("rx ."), Err(ShellError::InvalidPath));
}

#[test]
fn test_rx_failure_removes_partial_file() {
    let mut h = Harness::new();

    assert_eq!(h.run("rx 2-lost.opus"), Err(ShellError::TransferFailed));

    assert!(!h.path("2-lost.opus").exists());
    assert!(h.output().contains("Failed to receive"));
}

#[test]
fn test_rx_does_not_overwrite() {
    let mut h = Harness::new();
    fs::write(h.path("keep.opus"), b"old").unwrap();

    assert_eq!(h.run("rx keep.opus"), Err(ShellError::Io));
    assert_eq!(fs::read(h.path("keep.opus")).unwrap(), b"old");
}

#[test]
fn test_du_unavailable_on_host() {
    let mut h = Harness::new();
    assert_eq!(h.run("du"), Err(ShellError::Unsupported));
    assert_eq!(ShellError::Unsupported.to_string(), "E08: unavailable");
}

#[test]
fn test_stats_reports_fault_and_playback() {
    let mut h = Harness::new();
    h.run("stats").unwrap();
    assert!(h.output().starts_with("fault: none (count 0)\r\n"));

    h.env.faults.set(FaultCode::PinIo, 22);
    h.run("stats").unwrap();
    let out = h.output();
    assert!(out.contains("fault: pin i/o (data 22, count 1)"));
    assert!(out.contains("playback: 3 sessions, 120 frames, 1 aborted, 0 failed"));
}

#[test]
fn test_loglevel_show_and_set() {
    let mut h = Harness::new();
    assert_eq!(h.run("loglevel loud"), Err(ShellError::InvalidValue));

    h.run("loglevel debug").unwrap();
    assert_eq!(h.output(), "loglevel=DEBUG\r\n");
    h.run("loglevel info").unwrap();
    h.run("loglevel").unwrap();
    assert_eq!(h.output(), "loglevel=INFO\r\nloglevel=INFO\r\n");
}

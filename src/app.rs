//! Application state built once at boot.
//!
//! Every task gets what it needs from here by `Arc`: the scanner thread
//! publishes into the input table and trips the cancel token, the behaviour
//! loop consumes latches and drives the player, the shell shares the player
//! and the fault record.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::audio::{AudioOutput, ClipTable, FrameDecoder, Player, StreamPlayer};
use crate::behavior::{Behavior, ScriptSet, ToySpeaker};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::console::ShellEnv;
use crate::fault::FaultState;
use crate::input::{InputTable, LogicalInput, MuxBus, MuxScanner, ScanReport, ScanStats};
use crate::output::{OutputDriver, FULL_DUTY};
use crate::xmodem::XmodemConfig;

/// Stack for the scanner thread; it only touches atomics and the bus.
const SCAN_STACK_SIZE: usize = 4096;

/// Shared firmware state.
pub struct App {
    pub config: Config,
    pub inputs: Arc<InputTable>,
    pub outputs: Arc<OutputDriver>,
    pub cancel: Arc<CancelToken>,
    pub faults: Arc<FaultState>,
    pub player: Arc<dyn StreamPlayer>,
    pub clips: Arc<ClipTable>,
}

impl App {
    /// Wire the player to `decoder` and `output`, with the clips embedded
    /// in the image.
    pub fn new<D, O>(config: Config, decoder: D, output: O) -> Self
    where
        D: FrameDecoder + Send + 'static,
        O: AudioOutput + Send + 'static,
    {
        let cancel = Arc::new(CancelToken::new());
        let player = Player::new(decoder, output, &config.audio, Arc::clone(&cancel));
        Self::with_player(config, Arc::new(player), cancel, ClipTable::embedded())
    }

    /// Assemble from an existing player.
    ///
    /// `cancel` must be the token the player observes.
    pub fn with_player(
        config: Config,
        player: Arc<dyn StreamPlayer>,
        cancel: Arc<CancelToken>,
        clips: ClipTable,
    ) -> Self {
        Self {
            config,
            inputs: Arc::new(InputTable::new()),
            outputs: Arc::new(OutputDriver::new(FULL_DUTY)),
            cancel,
            faults: Arc::new(FaultState::new()),
            player,
            clips: Arc::new(clips),
        }
    }

    /// Share a fault record created before the app was.
    pub fn with_faults(mut self, faults: Arc<FaultState>) -> Self {
        self.faults = faults;
        self
    }

    /// Scan callback: any new event or a mode switch flip stops the clip
    /// that is playing.
    pub fn scan_handler(&self) -> impl FnMut(&ScanReport) + Send + 'static {
        let cancel = Arc::clone(&self.cancel);
        move |report: &ScanReport| {
            if report.latched != 0 || report.mode_switch_changed() {
                cancel.cancel();
            }
        }
    }

    /// Scanner over `bus`, publishing into this app's tables.
    pub fn scanner<B: MuxBus>(&self, bus: B) -> MuxScanner<B, impl FnMut(&ScanReport) + Send + 'static> {
        MuxScanner::new(
            bus,
            Arc::clone(&self.inputs),
            Arc::clone(&self.outputs),
            self.config.timing.debounce_samples,
            self.scan_handler(),
        )
    }

    /// Run `scanner` on its own thread at the configured phase period.
    pub fn spawn_scanner<B, F>(&self, scanner: MuxScanner<B, F>) -> io::Result<(Arc<ScanStats>, JoinHandle<()>)>
    where
        B: MuxBus + Send + 'static,
        F: FnMut(&ScanReport) + Send + 'static,
    {
        let stats = scanner.stats();
        let period = self.config.timing.scan_phase;
        let handle = thread::Builder::new()
            .name("mux-scan".into())
            .stack_size(SCAN_STACK_SIZE)
            .spawn(move || scanner.run(period))?;
        Ok((stats, handle))
    }

    /// Behaviour machine speaking through this app's player and clips.
    pub fn behavior<R: Rng>(&self, rng: R) -> Behavior<ToySpeaker<R>> {
        let speaker = ToySpeaker::new(
            Arc::clone(&self.player),
            Arc::clone(&self.clips),
            self.config.storage.clone(),
            rng,
        );
        Behavior::new(
            Arc::clone(&self.inputs),
            Arc::clone(&self.outputs),
            speaker,
            ScriptSet::STOCK,
        )
    }

    /// State for the shell thread.
    pub fn shell_env(&self, scan_stats: Option<Arc<ScanStats>>) -> ShellEnv {
        ShellEnv {
            player: Arc::clone(&self.player),
            storage: self.config.storage.clone(),
            faults: Arc::clone(&self.faults),
            scan_stats,
            xmodem: XmodemConfig::DEFAULT,
        }
    }
}

/// True when the beak stays pressed for all of `hold`, sampled every `poll`.
///
/// Used at boot, before the scanner owns the bus.
pub fn beak_held<B: MuxBus>(bus: &mut B, hold: Duration, poll: Duration) -> bool {
    let started = Instant::now();
    loop {
        if !bus.read_switch(LogicalInput::Beak) {
            return false;
        }
        if started.elapsed() >= hold {
            return true;
        }
        thread::sleep(poll);
    }
}

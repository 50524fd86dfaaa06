//! Sipkip firmware - Main entry point
//!
//! Bring-up order:
//! 1. Log sink thread (UART0)
//! 2. Speech decoder and DAC
//! 3. Mux bus; beak held at boot formats the storage partition
//! 4. Storage mount and file tree
//! 5. Scanner thread, shell thread (UART1)
//! 6. Behaviour loop on the main task

#[cfg(target_os = "espidf")]
fn main() {
    firmware::run();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "{} runs on ESP-IDF; on the host the crate is exercised by its tests.",
        sipkip_firmware::console::shell::VERSION
    );
    std::process::exit(1);
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::io;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys;

    use sipkip_firmware::app::{beak_held, App};
    use sipkip_firmware::behavior::{Cue, ScriptSet};
    use sipkip_firmware::config::Config;
    use sipkip_firmware::console::shell::{Shell, VERSION};
    use sipkip_firmware::fault::FaultState;
    use sipkip_firmware::hal::{self, DacOutput, EspMuxBus, OpusDecoder, SetupError, UartLink};
    use sipkip_firmware::{log_error, log_info, log_sink, log_warn, storage};

    const LOG_SINK_STACK: usize = 4096;
    const SHELL_STACK: usize = 8192;
    /// Beak sampling period while waiting for a format request.
    const BEAK_POLL: Duration = Duration::from_millis(50);

    pub fn run() {
        sys::link_patches();

        // Logging first so bring-up failures are visible
        let sink = thread::Builder::new()
            .name("log-sink".into())
            .stack_size(LOG_SINK_STACK)
            .spawn(|| log_sink::log_sink_task(io::stdout()));
        if let Err(e) = sink {
            eprintln!("cannot start log sink: {e}");
        }
        log_info!("{}", VERSION);

        let faults = Arc::new(FaultState::new());
        if let Err(e) = start(Arc::clone(&faults)) {
            faults.set(e.fault_code(), e.fault_data());
            log_error!("bring-up failed: {}", e);
        }
        // Nothing left to run; keep the log sink draining
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }

    fn start(faults: Arc<FaultState>) -> Result<(), SetupError> {
        let config = Config::default();
        let peripherals = Peripherals::take().map_err(SetupError::Peripherals)?;

        let decoder = OpusDecoder::new(config.audio.sample_rate)?;
        let dac = DacOutput::new(&config.audio, Arc::clone(&faults))?;
        let app = App::new(config, decoder, dac).with_faults(faults);
        log_info!("{} embedded clips", app.clips.len());
        for cue in ScriptSet::STOCK.cues() {
            if let Cue::Clip(name) = cue {
                if app.clips.get(name).is_none() {
                    log_warn!("clip {} not in image", name);
                }
            }
        }

        let mut bus = EspMuxBus::new(peripherals.ledc, &app.config.pins, Arc::clone(&app.faults))?;
        let storage_cfg = &app.config.storage;
        if beak_held(&mut bus, storage_cfg.format_hold, BEAK_POLL) {
            log_warn!("beak held for {:?}, formatting storage", storage_cfg.format_hold);
            hal::storage::format(storage_cfg)?;
        }
        hal::storage::mount(storage_cfg)?;
        match storage::list_tree(&storage_cfg.base_path) {
            Ok(tree) => {
                for line in tree.lines() {
                    log_info!("{}", line);
                }
            }
            Err(e) => log_warn!("cannot list {}: {}", storage_cfg.base_path.display(), e),
        }

        let mut scanner = app.scanner(bus);
        let edge = scanner.switch_edge_flag();
        scanner.bus_mut().subscribe_switches(edge)?;
        let (scan_stats, _scanner) = app.spawn_scanner(scanner)?;

        let mut link = UartLink::new(peripherals.uart1, &app.config.pins)?;
        let env = app.shell_env(Some(scan_stats));
        let cwd = storage_cfg.base_path.clone();
        thread::Builder::new()
            .name("shell".into())
            .stack_size(SHELL_STACK)
            .spawn(move || {
                let mut shell = Shell::new(1, cwd);
                if let Err(e) = shell.run(&mut link, &env) {
                    log_error!("shell link lost: {}", e);
                }
            })?;

        let mut behavior = app.behavior(rand::thread_rng());
        behavior.welcome();
        behavior.run(app.config.timing.tick)
    }
}

//! Module: config
//!
//! Purpose: Build-time defaults for the Sipkip firmware.
//!
//! Architecture:
//! - `Timing`: scan cadence, behaviour tick, debounce depth
//! - `AudioConfig`: DAC rate and decoded-frame capacity
//! - `Storage`: filesystem layout for user clips
//! - `Pins`: board pin map (see `pins.rs`)
//!
//! Every default is a `const`; alternate boards build their own values.

mod pins;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use pins::Pins;

/// Scanner and behaviour-loop cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Length of one read or drive phase of the multiplexed bus.
    pub scan_phase: Duration,
    /// Period of the behaviour state machine.
    pub tick: Duration,
    /// Consecutive agreeing samples before a level change is accepted.
    pub debounce_samples: u8,
}

impl Timing {
    pub const DEFAULT: Timing = Timing {
        scan_phase: Duration::from_millis(5),
        tick: Duration::from_millis(100),
        debounce_samples: 2,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Speech output parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioConfig {
    /// DAC output and decoder sample rate (Hz).
    pub sample_rate: u32,
    /// PCM capacity of one decoded frame (6 × 20 ms at 48 kHz, the codec maximum).
    pub max_frame_samples: usize,
    /// DMA descriptors handed to the continuous DAC driver.
    pub dma_descriptors: u32,
    /// Bytes per DMA descriptor buffer.
    pub dma_buffer_size: usize,
}

impl AudioConfig {
    pub const DEFAULT: AudioConfig = AudioConfig {
        sample_rate: 16_000,
        max_frame_samples: 6 * 960,
        dma_descriptors: 4,
        dma_buffer_size: 2048,
    };
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where user clips live on the flash filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Storage {
    /// Mount point of the storage partition.
    pub base_path: PathBuf,
    /// Partition label in the partition table.
    pub partition_label: &'static str,
    /// Extension of compressed clip files.
    pub clip_extension: &'static str,
    /// Suffix appended to a clip path to name its frame-length table.
    pub packets_suffix: &'static str,
    /// How long the beak must be held at boot to format the partition.
    pub format_hold: Duration,
}

impl Storage {
    /// Resolve a clip prefix (`"1"`, `"b"`, ...) below the mount point.
    pub fn prefix_path(&self, prefix: &str) -> PathBuf {
        self.base_path.join(prefix)
    }

    /// Frame-length table path for a compressed clip file.
    pub fn packets_path(&self, clip: &Path) -> PathBuf {
        let mut name = clip.as_os_str().to_owned();
        name.push(self.packets_suffix);
        PathBuf::from(name)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/littlefs"),
            partition_label: "storage",
            clip_extension: "opus",
            packets_suffix: "_packets",
            format_hold: Duration::from_secs(5),
        }
    }
}

/// Complete firmware configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub timing: Timing,
    pub audio: AudioConfig,
    pub storage: Storage,
    pub pins: Pins,
}

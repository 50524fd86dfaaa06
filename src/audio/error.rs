//! Error types for the speech playback pipeline.

use std::io;

use thiserror::Error;

/// Codec failure for one compressed frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The codec rejected the frame.
    #[error("codec error {code}: {message}")]
    Codec { code: i32, message: String },

    /// The codec reported more samples than the PCM buffer holds.
    #[error("frame of {got} samples exceeds buffer of {capacity}")]
    FrameTooLarge { got: usize, capacity: usize },
}

/// DAC output failure.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The continuous-output driver refused a write.
    #[error("DAC write failed (code {0})")]
    Device(i32),

    /// The driver accepted fewer bytes than handed over.
    #[error("DAC accepted {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    /// The DMA worker thread could not be started.
    #[error("cannot start DMA worker: {0}")]
    Spawn(#[source] io::Error),

    /// The DMA worker thread is gone.
    #[error("DMA worker stopped")]
    WorkerGone,
}

/// Why a `play` call ended early.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Cancelled by a new input event or the shell. Not a failure.
    #[error("playback stopped")]
    Aborted,

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The compressed stream ended before a frame was complete.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// A transient frame buffer could not be allocated.
    #[error("out of memory for a {0}-byte frame")]
    OutOfMemory(usize),
}

impl PlaybackError {
    /// `Aborted` is a normal outcome; everything else is a failure.
    #[inline]
    pub fn is_abort(&self) -> bool {
        matches!(self, PlaybackError::Aborted)
    }
}

//! Serialized, cancellable speech playback.
//!
//! One `play` call is one session. Sessions are serialized by a mutex held
//! for the whole call; the mutex also owns the decoder, the PCM scratch
//! buffer and the double buffer, so nothing is reallocated per session.
//!
//! Per frame: read the length, fetch the payload, decode, convert into the
//! back buffer, wait for the previous front to drain, check cancellation,
//! swap. Cancellation is therefore observed once per frame and at most the
//! frame already handed to the DMA worker plays after a cancel request.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::codec::{convert_frame, AudioOutput, FrameDecoder};
use super::double_buffer::DoubleBuffer;
use super::error::{DecodeError, PlaybackError};
use super::stream::AudioStream;
use crate::cancel::CancelToken;
use crate::config::AudioConfig;

/// Playback counters since boot.
#[derive(Debug, Default)]
pub struct PlaybackStats {
    sessions: AtomicU32,
    frames: AtomicU32,
    aborts: AtomicU32,
    failures: AtomicU32,
}

/// Copy of [`PlaybackStats`] for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub sessions: u32,
    /// Frames handed to the DAC.
    pub frames: u32,
    pub aborts: u32,
    pub failures: u32,
}

impl PlaybackStats {
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            sessions: self.sessions.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// What the shell and behaviour loop need from a player.
pub trait StreamPlayer: Send + Sync {
    /// Play a stream to completion, cancellation or error.
    fn play(&self, stream: AudioStream<'_>) -> Result<(), PlaybackError>;

    /// Ask the current session to stop at its next frame boundary.
    fn stop(&self);

    fn stats(&self) -> PlaybackSnapshot;
}

struct Session<D, O> {
    decoder: D,
    pcm: Vec<i16>,
    buffers: DoubleBuffer<O>,
}

/// Speech player bound to one decoder and one DAC output.
pub struct Player<D, O> {
    session: Mutex<Session<D, O>>,
    cancel: Arc<CancelToken>,
    stats: PlaybackStats,
}

impl<D, O> Player<D, O>
where
    D: FrameDecoder + Send,
    O: AudioOutput + Send + 'static,
{
    pub fn new(decoder: D, output: O, config: &AudioConfig, cancel: Arc<CancelToken>) -> Self {
        Self {
            session: Mutex::new(Session {
                decoder,
                pcm: vec![0; config.max_frame_samples],
                buffers: DoubleBuffer::new(output, config.max_frame_samples),
            }),
            cancel,
            stats: PlaybackStats::default(),
        }
    }

    /// Token observed by the decode loop.
    pub fn cancel_token(&self) -> &Arc<CancelToken> {
        &self.cancel
    }

    /// Play `stream`, blocking until done.
    ///
    /// Concurrent callers queue on the session lock. The cancellation flag
    /// is cleared once the lock is held, so a request made before this
    /// session started does not stop it.
    pub fn play(&self, stream: AudioStream<'_>) -> Result<(), PlaybackError> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancel.reset();
        self.stats.sessions.fetch_add(1, Ordering::Relaxed);

        let result = session.run(stream, &self.cancel, &self.stats);
        // Let the last queued frame finish before releasing the lock
        let drained = session.buffers.wait_drained();
        let result = result.and(drained.map_err(PlaybackError::from));

        match &result {
            Ok(()) => {}
            Err(PlaybackError::Aborted) => {
                self.stats.aborts.fetch_add(1, Ordering::Relaxed);
                crate::log_debug!("playback stopped");
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                crate::log_error!("playback failed: {}", e);
            }
        }
        result
    }

    /// Request the current session to stop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn stats(&self) -> PlaybackSnapshot {
        self.stats.snapshot()
    }
}

impl<D, O> StreamPlayer for Player<D, O>
where
    D: FrameDecoder + Send,
    O: AudioOutput + Send + 'static,
{
    fn play(&self, stream: AudioStream<'_>) -> Result<(), PlaybackError> {
        Player::play(self, stream)
    }

    fn stop(&self) {
        Player::stop(self)
    }

    fn stats(&self) -> PlaybackSnapshot {
        Player::stats(self)
    }
}

impl<D, O> Session<D, O>
where
    D: FrameDecoder,
    O: AudioOutput + Send + 'static,
{
    fn run(
        &mut self,
        stream: AudioStream<'_>,
        cancel: &CancelToken,
        stats: &PlaybackStats,
    ) -> Result<(), PlaybackError> {
        let mut frames = stream.into_reader();

        while let Some(len) = frames.next_len()? {
            if len == 0 {
                continue;
            }

            let samples = {
                let payload = frames.payload(len)?;
                self.decoder.decode(&payload, &mut self.pcm)?
            };
            if samples > self.pcm.len() {
                return Err(DecodeError::FrameTooLarge {
                    got: samples,
                    capacity: self.pcm.len(),
                }
                .into());
            }
            if samples == 0 {
                continue;
            }

            convert_frame(&self.pcm[..samples], self.buffers.back_mut());
            self.buffers.wait_drained()?;
            if cancel.is_cancelled() {
                return Err(PlaybackError::Aborted);
            }
            self.buffers.swap()?;
            stats.frames.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

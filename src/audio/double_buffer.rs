//! Double buffer between the frame decoder and the DMA writer.
//!
//! Two sample buffers circulate by ownership: the producer fills `back`,
//! hands it to the DMA worker thread as the new front, and gets the
//! previous front back once the worker has written it out. A buffer is
//! therefore never touched by both sides at once.
//!
//! ```text
//!   producer                        DMA worker
//!   ────────                        ──────────
//!   fill back
//!   wait_drained()  ◀── (buf, result) ──  write(front)
//!   swap()          ── front ──────────▶
//! ```
//!
//! The worker is spawned on the first swap and then lives for the process
//! lifetime, blocked on its channel between sessions.

use std::mem;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use super::codec::AudioOutput;
use super::error::OutputError;

/// Stack for the DMA worker thread.
const WORKER_STACK_SIZE: usize = 4096;

type Drained = (Vec<u8>, Result<(), OutputError>);

struct DmaWorker {
    fronts: Sender<Vec<u8>>,
    drained: Receiver<Drained>,
}

pub(crate) struct DoubleBuffer<O> {
    /// Device handle, moved into the worker when it starts.
    output: Option<O>,
    worker: Option<DmaWorker>,
    back: Vec<u8>,
    /// Buffer returned by the worker, next to become `back`.
    spare: Option<Vec<u8>>,
    /// A front buffer is queued or being written.
    in_flight: bool,
}

impl<O: AudioOutput + Send + 'static> DoubleBuffer<O> {
    /// Allocate both buffers up front.
    pub(crate) fn new(output: O, capacity: usize) -> Self {
        Self {
            output: Some(output),
            worker: None,
            back: Vec::with_capacity(capacity),
            spare: Some(Vec::with_capacity(capacity)),
            in_flight: false,
        }
    }

    /// Buffer the producer may fill.
    #[inline]
    pub(crate) fn back_mut(&mut self) -> &mut Vec<u8> {
        &mut self.back
    }

    /// Whether a front buffer has not been drained yet.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Block until the worker has written the in-flight buffer.
    ///
    /// Returns that write's result. No-op when nothing is in flight.
    pub(crate) fn wait_drained(&mut self) -> Result<(), OutputError> {
        if !self.in_flight {
            return Ok(());
        }
        let worker = self.worker.as_ref().ok_or(OutputError::WorkerGone)?;
        let (buf, result) = worker.drained.recv().map_err(|_| OutputError::WorkerGone)?;
        self.in_flight = false;
        self.spare = Some(buf);
        result
    }

    /// Hand `back` to the worker and take the spare buffer as new `back`.
    ///
    /// The caller must have drained the previous front first.
    pub(crate) fn swap(&mut self) -> Result<(), OutputError> {
        debug_assert!(!self.in_flight, "swap with a front still in flight");
        self.ensure_worker()?;
        let worker = self.worker.as_ref().ok_or(OutputError::WorkerGone)?;

        let capacity = self.back.capacity();
        let next = self.spare.take().unwrap_or_else(|| Vec::with_capacity(capacity));
        let front = mem::replace(&mut self.back, next);
        worker.fronts.send(front).map_err(|_| OutputError::WorkerGone)?;
        self.in_flight = true;
        Ok(())
    }

    fn ensure_worker(&mut self) -> Result<(), OutputError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let mut output = self.output.take().ok_or(OutputError::WorkerGone)?;
        let (fronts, worker_fronts) = mpsc::channel::<Vec<u8>>();
        let (worker_drained, drained) = mpsc::channel::<Drained>();

        thread::Builder::new()
            .name("dac-dma".into())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                for front in worker_fronts {
                    let result = output.write(&front);
                    if worker_drained.send((front, result)).is_err() {
                        break;
                    }
                }
            })
            .map_err(OutputError::Spawn)?;

        crate::log_debug!("DMA worker started");
        self.worker = Some(DmaWorker { fronts, drained });
        Ok(())
    }
}

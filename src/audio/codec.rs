//! Seams to the speech codec and the DAC, plus sample conversion.

use super::error::{DecodeError, OutputError};

/// Decodes one compressed frame into signed 16-bit PCM.
pub trait FrameDecoder {
    /// Decode `frame` into `pcm`, returning the number of samples written.
    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<usize, DecodeError>;
}

/// Blocking sink for unsigned 8-bit DAC samples.
pub trait AudioOutput {
    /// Queue `samples` on the device, returning once all were accepted.
    fn write(&mut self, samples: &[u8]) -> Result<(), OutputError>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<usize, DecodeError> {
        (**self).decode(frame, pcm)
    }
}

impl<O: AudioOutput + ?Sized> AudioOutput for Box<O> {
    fn write(&mut self, samples: &[u8]) -> Result<(), OutputError> {
        (**self).write(samples)
    }
}

/// Signed 16-bit PCM to the DAC's unsigned 8-bit range.
#[inline]
pub fn to_dac_sample(sample: i16) -> u8 {
    ((sample as i32 + 32768) >> 8) as u8
}

/// Replace `out` with the DAC form of `pcm`.
pub fn convert_frame(pcm: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.extend(pcm.iter().map(|&s| to_dac_sample(s)));
}

//! Opus decoder from the `esp-opus` ESP-IDF component (libopus).

use core::ffi::{c_int, CStr};
use core::ptr::NonNull;

use esp_idf_svc::sys::opus::{
    opus_decode, opus_decoder_create, opus_decoder_destroy, opus_strerror, OpusDecoder as RawDecoder,
};

use crate::audio::{DecodeError, FrameDecoder};

fn codec_error(code: c_int) -> DecodeError {
    // SAFETY: opus_strerror returns a static string for any code.
    let message = unsafe { CStr::from_ptr(opus_strerror(code)) }
        .to_string_lossy()
        .into_owned();
    DecodeError::Codec { code, message }
}

/// Mono Opus decoder.
pub struct OpusDecoder {
    raw: NonNull<RawDecoder>,
}

// SAFETY: decoder state is only touched through `&mut self`.
unsafe impl Send for OpusDecoder {}

impl OpusDecoder {
    pub fn new(sample_rate: u32) -> Result<Self, DecodeError> {
        let mut err: c_int = 0;
        let raw = unsafe { opus_decoder_create(sample_rate as i32, 1, &mut err) };
        if err < 0 {
            return Err(codec_error(err));
        }
        NonNull::new(raw)
            .map(|raw| Self { raw })
            .ok_or_else(|| codec_error(err))
    }
}

impl FrameDecoder for OpusDecoder {
    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<usize, DecodeError> {
        let samples = unsafe {
            opus_decode(
                self.raw.as_ptr(),
                frame.as_ptr(),
                frame.len() as i32,
                pcm.as_mut_ptr(),
                pcm.len() as c_int,
                0,
            )
        };
        if samples < 0 {
            return Err(codec_error(samples));
        }
        let samples = samples as usize;
        if samples > pcm.len() {
            return Err(DecodeError::FrameTooLarge {
                got: samples,
                capacity: pcm.len(),
            });
        }
        Ok(samples)
    }
}

impl Drop for OpusDecoder {
    fn drop(&mut self) {
        unsafe { opus_decoder_destroy(self.raw.as_ptr()) };
    }
}

//! Continuous DAC output on GPIO25 via DMA.

use core::ptr;
use std::sync::Arc;

use esp_idf_svc::sys::{self, esp, esp_err_t};

use super::SetupError;
use crate::audio::{AudioOutput, OutputError};
use crate::config::AudioConfig;
use crate::fault::{FaultCode, FaultState};

/// Blocking writer for the DAC's continuous (DMA) mode.
pub struct DacOutput {
    handle: sys::dac_continuous_handle_t,
    /// Write failures happen on the DMA worker and are recorded here.
    faults: Arc<FaultState>,
}

// SAFETY: the handle is only used by the thread that owns the output.
unsafe impl Send for DacOutput {}

impl DacOutput {
    /// Allocate and enable channel 0 at `config.sample_rate`.
    pub fn new(config: &AudioConfig, faults: Arc<FaultState>) -> Result<Self, SetupError> {
        let cont_cfg = sys::dac_continuous_config_t {
            chan_mask: sys::dac_channel_mask_t_DAC_CHANNEL_MASK_CH0,
            desc_num: config.dma_descriptors,
            buf_size: config.dma_buffer_size,
            freq_hz: config.sample_rate,
            offset: 0,
            // APLL reaches low sample rates the default clock cannot
            clk_src: sys::soc_periph_dac_digi_clk_src_t_DAC_DIGI_CLK_SRC_APLL,
            chan_mode: sys::dac_continuous_channel_mode_t_DAC_CHANNEL_MODE_SIMUL,
        };

        let mut handle: sys::dac_continuous_handle_t = ptr::null_mut();
        esp!(unsafe { sys::dac_continuous_new_channels(&cont_cfg, &mut handle) }).map_err(SetupError::Dac)?;
        if let Err(e) = esp!(unsafe { sys::dac_continuous_enable(handle) }) {
            unsafe { sys::dac_continuous_del_channels(handle) };
            return Err(SetupError::Dac(e));
        }

        crate::log_info!("DAC DMA ready at {} Hz", config.sample_rate);
        Ok(Self { handle, faults })
    }
}

impl AudioOutput for DacOutput {
    fn write(&mut self, samples: &[u8]) -> Result<(), OutputError> {
        let mut written = 0usize;
        let code: esp_err_t = unsafe {
            sys::dac_continuous_write(
                self.handle,
                samples.as_ptr() as *mut u8,
                samples.len(),
                &mut written,
                -1,
            )
        };
        if code != sys::ESP_OK as esp_err_t {
            self.faults.set(FaultCode::DacWrite, code as u32);
            return Err(OutputError::Device(code));
        }
        if written != samples.len() {
            return Err(OutputError::ShortWrite {
                expected: samples.len(),
                written,
            });
        }
        Ok(())
    }
}

impl Drop for DacOutput {
    fn drop(&mut self) {
        unsafe {
            sys::dac_continuous_disable(self.handle);
            sys::dac_continuous_del_channels(self.handle);
        }
    }
}

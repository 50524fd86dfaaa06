//! Multiplexed bus on ESP32 GPIO and LEDC.
//!
//! ```text
//!  GPIO4  ── mux enable, buttons
//!  GPIO5  ── mux enable, clips
//!  8 × open-drain shared lines (pull-down only while sampling)
//!  GPIO15/34/35 ── beak, learn, play (inputs, pull-down, any-edge IRQ)
//!  GPIO22/26/17 ── LED group PWM (LEDC timer 0, 8-bit)
//! ```

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use esp_idf_svc::hal::gpio::AnyOutputPin;
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, LEDC};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::{self, esp, esp_err_t, EspError};

use super::SetupError;
use crate::config::Pins;
use crate::fault::{FaultCode, FaultState};
use crate::input::{LogicalInput, MuxBus, MuxSide};
use crate::output::{LedGroup, FULL_DUTY, LED_GROUPS};

/// LED PWM carrier.
const LED_PWM_HZ: u32 = 5_000;

/// Pin bit mask for `gpio_config`.
fn mask(pins: &[i32]) -> u64 {
    pins.iter().fold(0, |m, &p| m | (1u64 << p))
}

/// Bus driver for the Sipkip board.
pub struct EspMuxBus {
    pins: Pins,
    leds: [LedcDriver<'static>; LED_GROUPS],
    faults: Arc<FaultState>,
    /// Kept alive while the switch ISRs reference it.
    switch_edge: Option<Arc<AtomicBool>>,
}

impl EspMuxBus {
    pub fn new(ledc: LEDC, pins: &Pins, faults: Arc<FaultState>) -> Result<Self, SetupError> {
        let outputs = sys::gpio_config_t {
            pin_bit_mask: mask(&[pins.mux_buttons, pins.mux_clips]),
            mode: sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            ..Default::default()
        };
        let switches = sys::gpio_config_t {
            pin_bit_mask: mask(&[pins.beak, pins.learn, pins.play]),
            mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
            pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
            ..Default::default()
        };
        let shared = sys::gpio_config_t {
            pin_bit_mask: mask(&pins.shared),
            mode: sys::gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD,
            ..Default::default()
        };
        for (config, pin) in [(outputs, pins.mux_buttons), (switches, pins.beak), (shared, pins.shared[0])] {
            esp!(unsafe { sys::gpio_config(&config) }).map_err(|source| SetupError::Pin { pin, source })?;
        }

        let timer = LedcTimerDriver::new(
            ledc.timer0,
            &TimerConfig::new()
                .frequency(Hertz(LED_PWM_HZ))
                .resolution(Resolution::Bits8),
        )
        .map_err(SetupError::Pwm)?;
        // Shared by the three channels for the life of the firmware
        let timer: &'static LedcTimerDriver<'static, _> = Box::leak(Box::new(timer));

        // SAFETY: the LED pins are reserved for this driver by the pin map.
        let [left, middle, right] = pins.leds.map(|p| unsafe { AnyOutputPin::new(p) });
        let leds = [
            LedcDriver::new(ledc.channel0, timer, left).map_err(SetupError::Pwm)?,
            LedcDriver::new(ledc.channel1, timer, middle).map_err(SetupError::Pwm)?,
            LedcDriver::new(ledc.channel2, timer, right).map_err(SetupError::Pwm)?,
        ];

        crate::log_info!("mux bus ready");
        Ok(Self {
            pins: *pins,
            leds,
            faults,
            switch_edge: None,
        })
    }

    /// Raise `flag` from interrupt context on any switch edge.
    pub fn subscribe_switches(&mut self, flag: Arc<AtomicBool>) -> Result<(), SetupError> {
        match esp!(unsafe { sys::gpio_install_isr_service(0) }) {
            Ok(()) => {}
            // Already installed by another driver
            Err(e) if e.code() == sys::ESP_ERR_INVALID_STATE as esp_err_t => {}
            Err(source) => return Err(SetupError::Pin { pin: self.pins.beak, source }),
        }

        let arg = Arc::as_ptr(&flag) as *mut c_void;
        for pin in [self.pins.beak, self.pins.learn, self.pins.play] {
            let to_err = |source: EspError| SetupError::Pin { pin, source };
            esp!(unsafe { sys::gpio_set_intr_type(pin, sys::gpio_int_type_t_GPIO_INTR_ANYEDGE) }).map_err(to_err)?;
            esp!(unsafe { sys::gpio_isr_handler_add(pin, Some(on_switch_edge), arg) }).map_err(to_err)?;
            esp!(unsafe { sys::gpio_intr_enable(pin) }).map_err(to_err)?;
        }
        self.switch_edge = Some(flag);
        Ok(())
    }

    /// Record a failed pin call; the next scan retries anyway.
    fn check(&self, pin: i32, code: esp_err_t) {
        if code != sys::ESP_OK as esp_err_t {
            self.faults.set(FaultCode::PinIo, pin as u32);
        }
    }

    fn set_level(&self, pin: i32, high: bool) {
        self.check(pin, unsafe { sys::gpio_set_level(pin, u32::from(high)) });
    }
}

impl MuxBus for EspMuxBus {
    fn set_mux_enable(&mut self, side: Option<MuxSide>) {
        self.set_level(self.pins.mux_buttons, side == Some(MuxSide::Buttons));
        self.set_level(self.pins.mux_clips, side == Some(MuxSide::Clips));
    }

    fn drive_line(&mut self, line: usize, high: bool) {
        self.set_level(self.pins.shared[line], high);
    }

    fn set_pulldown(&mut self, line: usize, enabled: bool) {
        let pin = self.pins.shared[line];
        let code = unsafe {
            if enabled {
                sys::gpio_pulldown_en(pin)
            } else {
                sys::gpio_pulldown_dis(pin)
            }
        };
        self.check(pin, code);
    }

    fn read_line(&mut self, line: usize) -> bool {
        unsafe { sys::gpio_get_level(self.pins.shared[line]) != 0 }
    }

    fn read_switch(&mut self, switch: LogicalInput) -> bool {
        let pin = match switch {
            LogicalInput::Beak => self.pins.beak,
            LogicalInput::LearnSwitch => self.pins.learn,
            LogicalInput::PlaySwitch => self.pins.play,
            _ => return false,
        };
        unsafe { sys::gpio_get_level(pin) != 0 }
    }

    fn set_led_group(&mut self, group: LedGroup, duty: u8) {
        let led = &mut self.leds[group.index()];
        let raw = led.get_max_duty() * u32::from(duty.min(FULL_DUTY)) / u32::from(FULL_DUTY);
        if led.set_duty(raw).is_err() {
            self.faults.set(FaultCode::PinIo, self.pins.leds[group.index()] as u32);
        }
    }
}

/// Switch edge ISR. `arg` points at the scanner's edge flag.
unsafe extern "C" fn on_switch_edge(arg: *mut c_void) {
    // SAFETY: `arg` comes from the Arc held in `EspMuxBus::switch_edge`.
    let flag = unsafe { &*(arg as *const AtomicBool) };
    flag.store(true, Ordering::Release);
}

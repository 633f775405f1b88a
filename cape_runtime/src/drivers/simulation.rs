//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `BoardDriver` trait to provide
//! software-emulated peripherals for development and testing without
//! physical hardware. Behavior mirrors the real board's contract: the
//! barometer refuses reads until configured, LEDs retain their level,
//! encoder counters can be preset, and rail voltages are fixed plausible
//! values.

use std::collections::HashMap;

use cape_common::config::PeripheralConfig;
use cape_common::driver::BoardDriver;
use cape_common::error::CapeError;
use cape_common::peripheral::{
    BarometerReading, ButtonEvent, ButtonId, EncoderChannel, LedColor, PeripheralId, PowerRail,
    Value,
};
use tracing::{debug, info};

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn BoardDriver> {
    Box::new(SimulationDriver::new())
}

/// Simulation driver implementing the BoardDriver trait.
pub struct SimulationDriver {
    /// Initialized flag
    initialized: bool,
    /// LED levels
    leds: HashMap<LedColor, bool>,
    /// Injectable button states (default: released)
    buttons: HashMap<ButtonId, bool>,
    /// Barometer configuration codes, set by `configure()`
    barometer: Option<(u16, u16)>,
    /// Monotonic sample counter for deterministic readings
    samples: u64,
    /// Encoder counts, preset via `write()`
    encoders: HashMap<EncoderChannel, i64>,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            initialized: false,
            leds: HashMap::new(),
            buttons: HashMap::new(),
            barometer: None,
            samples: 0,
            encoders: HashMap::new(),
        }
    }

    /// Inject a button state (test hook; real boards do this with fingers).
    pub fn set_button(&mut self, button: ButtonId, pressed: bool) {
        self.buttons.insert(button, pressed);
    }

    fn check_initialized(&self) -> Result<(), CapeError> {
        if self.initialized {
            Ok(())
        } else {
            Err(CapeError::Io("simulation driver not initialized".to_string()))
        }
    }

    /// Deterministic barometer sample. Higher oversampling narrows the
    /// wobble, the same direction the real sensor's noise floor moves.
    fn sample_barometer(&mut self, oversample: u16) -> BarometerReading {
        self.samples += 1;
        let wobble = ((self.samples % 7) as f64 - 3.0) / oversample as f64;
        BarometerReading {
            temperature_c: 23.5,
            pressure_pa: 101_325.0 + wobble,
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self) -> Result<(), CapeError> {
        info!("Simulation driver initialized");
        self.initialized = true;
        Ok(())
    }

    fn read(&mut self, id: PeripheralId) -> Result<Value, CapeError> {
        self.check_initialized()?;
        match id {
            PeripheralId::Led(color) => {
                Ok(Value::Level(self.leds.get(&color).copied().unwrap_or(false)))
            }
            PeripheralId::Button(button) => Ok(Value::Button(ButtonEvent {
                button,
                pressed: self.buttons.get(&button).copied().unwrap_or(false),
            })),
            PeripheralId::Barometer => {
                let (oversample, _filter) = self.barometer.ok_or_else(|| {
                    CapeError::Io("barometer not configured".to_string())
                })?;
                Ok(Value::Pressure(self.sample_barometer(oversample)))
            }
            PeripheralId::Encoder(ch) => {
                Ok(Value::Count(self.encoders.get(&ch).copied().unwrap_or(0)))
            }
            PeripheralId::Rail(PowerRail::Battery) => Ok(Value::Volts(7.4)),
            PeripheralId::Rail(PowerRail::DcJack) => Ok(Value::Volts(12.0)),
        }
    }

    fn write(&mut self, id: PeripheralId, value: &Value) -> Result<(), CapeError> {
        self.check_initialized()?;
        match (id, value) {
            (PeripheralId::Led(color), Value::Level(level)) => {
                debug!("LED {color:?} <- {level}");
                self.leds.insert(color, *level);
                Ok(())
            }
            (PeripheralId::Encoder(ch), Value::Count(count)) => {
                debug!("Encoder {ch:?} preset to {count}");
                self.encoders.insert(ch, *count);
                Ok(())
            }
            _ => Err(CapeError::Io(format!(
                "unsupported write of {value:?} to {id}"
            ))),
        }
    }

    fn configure(&mut self, id: PeripheralId, config: &PeripheralConfig) -> Result<(), CapeError> {
        self.check_initialized()?;
        match (id, config) {
            (PeripheralId::Barometer, PeripheralConfig::Barometer(baro)) => {
                info!(
                    "Barometer configured: oversample={}, filter={}",
                    baro.oversample.code(),
                    baro.filter.code()
                );
                self.barometer = Some((baro.oversample.code(), baro.filter.code()));
                Ok(())
            }
            _ => Err(CapeError::Io(format!("cannot configure {id}"))),
        }
    }

    fn release(&mut self, id: PeripheralId) -> Result<(), CapeError> {
        match id {
            PeripheralId::Led(color) => {
                self.leds.insert(color, false);
            }
            PeripheralId::Barometer => {
                self.barometer = None;
            }
            _ => {}
        }
        debug!("Released {id}");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), CapeError> {
        info!("Simulation driver shut down");
        self.initialized = false;
        Ok(())
    }
}

use plantsitter_common::ports::{
    ClimateReading, ClimateSensor, LightSensor, MoistureSensor, SensorError, Switch,
};
use tracing::info;

/// Logs actuator writes in place of a GPIO pin.
pub struct GpioSwitch {
    label: &'static str,
}

impl GpioSwitch {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Switch for GpioSwitch {
    fn set(&mut self, on: bool) {
        info!("{} -> {}", self.label, if on { "ON" } else { "OFF" });
    }
}

// Hardware integration point:
// replace these simulated readings with the BH1750 / capacitive-probe /
// DHT11 drivers on the target board.

#[derive(Default)]
pub struct SimLightSensor {
    tick: u64,
}

impl LightSensor for SimLightSensor {
    fn read_lux(&mut self) -> Result<f32, SensorError> {
        self.tick = self.tick.wrapping_add(1);
        Ok(120.0 + (self.tick % 10) as f32 * 8.0)
    }
}

#[derive(Default)]
pub struct SimMoistureSensor {
    tick: u64,
}

impl MoistureSensor for SimMoistureSensor {
    fn read_raw(&mut self) -> Result<f32, SensorError> {
        self.tick = self.tick.wrapping_add(1);
        Ok(420.0 + (self.tick % 7) as f32 * 25.0)
    }
}

#[derive(Default)]
pub struct SimClimateSensor {
    tick: u64,
}

impl ClimateSensor for SimClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.tick = self.tick.wrapping_add(1);
        Ok(ClimateReading {
            temperature: 21.0 + (self.tick % 5) as f32 * 0.3,
            humidity: 48.0 + (self.tick % 9) as f32 * 0.8,
        })
    }
}

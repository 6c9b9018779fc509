use tracing::warn;

use crate::config::AutomationConfig;
use crate::ports::{ClimateReading, Ports};
use crate::types::ReportedState;

/// Hardware-facing snapshot of the device. All sensor and actuator access
/// goes through here, and everything runs on the single control thread, so
/// no synchronization is involved.
pub struct DeviceState {
    ports: Ports,
    lamp_on: bool,
    pump_on: bool,
    last_light: Option<f32>,
    last_moisture: Option<f32>,
    last_temperature: Option<f32>,
    last_humidity: Option<f32>,
    light_threshold: f32,
    moisture_threshold: f32,
}

impl DeviceState {
    pub fn new(ports: Ports, automation: &AutomationConfig) -> Self {
        Self {
            ports,
            lamp_on: false,
            pump_on: false,
            last_light: None,
            last_moisture: None,
            last_temperature: None,
            last_humidity: None,
            light_threshold: automation.light_threshold,
            moisture_threshold: automation.moisture_threshold,
        }
    }

    /// Poll the light meter. A failed read returns `None` and keeps the
    /// previous sample; callers must not treat `None` as a low reading.
    pub fn read_light(&mut self) -> Option<f32> {
        match self.ports.light.read_lux() {
            Ok(lux) => {
                self.last_light = Some(lux);
                Some(lux)
            }
            Err(err) => {
                warn!("light sensor read failed: {err}");
                None
            }
        }
    }

    pub fn read_moisture(&mut self) -> Option<f32> {
        match self.ports.moisture.read_raw() {
            Ok(raw) => {
                self.last_moisture = Some(raw);
                Some(raw)
            }
            Err(err) => {
                warn!("moisture sensor read failed: {err}");
                None
            }
        }
    }

    pub fn read_climate(&mut self) -> Option<ClimateReading> {
        match self.ports.climate.read() {
            Ok(reading) => {
                self.last_temperature = Some(reading.temperature);
                self.last_humidity = Some(reading.humidity);
                Some(reading)
            }
            Err(err) => {
                warn!("climate sensor read failed: {err}");
                None
            }
        }
    }

    /// Drive the lamp and mirror the commanded value. The mirror always
    /// reflects the last write; there is no read-back verification.
    pub fn write_lamp(&mut self, on: bool) {
        self.ports.lamp.set(on);
        self.lamp_on = on;
    }

    pub fn write_pump(&mut self, on: bool) {
        self.ports.pump.set(on);
        self.pump_on = on;
    }

    pub fn lamp_on(&self) -> bool {
        self.lamp_on
    }

    pub fn pump_on(&self) -> bool {
        self.pump_on
    }

    pub fn light_threshold(&self) -> f32 {
        self.light_threshold
    }

    pub fn moisture_threshold(&self) -> f32 {
        self.moisture_threshold
    }

    pub fn set_light_threshold(&mut self, value: f32) {
        self.light_threshold = value;
    }

    pub fn set_moisture_threshold(&mut self, value: f32) {
        self.moisture_threshold = value;
    }

    pub fn reported(&self) -> ReportedState {
        ReportedState {
            lamp_on: self.lamp_on,
            pump_on: self.pump_on,
            light_threshold: self.light_threshold,
            moisture_threshold: self.moisture_threshold,
            last_light: self.last_light,
            last_moisture: self.last_moisture,
            last_temperature: self.last_temperature,
            last_humidity: self.last_humidity,
        }
    }
}

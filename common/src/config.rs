use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub light_threshold: f32,
    pub moisture_threshold: f32,
    pub light_rule_interval_ms: u64,
    pub moisture_rule_interval_ms: u64,
    pub pump_dose_ms: u64,
    pub telemetry_interval_ms: u64,
    pub reconnect_interval_ms: u64,
    pub moisture_rule_enabled: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            light_threshold: 150.0,
            moisture_threshold: 400.0,
            light_rule_interval_ms: 1_800_000,
            moisture_rule_interval_ms: 900_000,
            pump_dose_ms: 5_000,
            telemetry_interval_ms: 600_000,
            reconnect_interval_ms: 5_000,
            // Soil-probe ADC sampling disturbs the radio on rev A boards;
            // leave the rule off until revalidated on current hardware.
            moisture_rule_enabled: false,
        }
    }
}

impl AutomationConfig {
    pub fn sanitize(&mut self) {
        if !self.light_threshold.is_finite() || self.light_threshold < 0.0 {
            self.light_threshold = 150.0;
        }
        if !self.moisture_threshold.is_finite() || self.moisture_threshold < 0.0 {
            self.moisture_threshold = 400.0;
        }
        self.pump_dose_ms = self.pump_dose_ms.clamp(500, 60_000);
        self.reconnect_interval_ms = self.reconnect_interval_ms.clamp(1_000, 300_000);
        self.light_rule_interval_ms = self.light_rule_interval_ms.max(1_000);
        self.moisture_rule_interval_ms = self.moisture_rule_interval_ms.max(1_000);
        self.telemetry_interval_ms = self.telemetry_interval_ms.max(1_000);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsFiles {
    pub ca_cert: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub device_name: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    #[serde(default)]
    pub tls: Option<TlsFiles>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device_name: "plantsitter".to_string(),
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            tls: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl DeviceConfig {
    pub fn sanitize(&mut self) {
        self.automation.sanitize();
    }
}

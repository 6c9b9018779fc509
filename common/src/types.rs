use serde::{Deserialize, Serialize};

/// Device-owned half of the shadow document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedState {
    #[serde(rename = "lampOn")]
    pub lamp_on: bool,
    #[serde(rename = "pumpOn")]
    pub pump_on: bool,
    #[serde(rename = "lightThreshold")]
    pub light_threshold: f32,
    #[serde(rename = "moistureThreshold")]
    pub moisture_threshold: f32,
    #[serde(rename = "lastLight")]
    pub last_light: Option<f32>,
    #[serde(rename = "lastMoisture")]
    pub last_moisture: Option<f32>,
    #[serde(rename = "lastTemperature")]
    pub last_temperature: Option<f32>,
    #[serde(rename = "lastHumidity")]
    pub last_humidity: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShadowUpdate {
    pub state: ShadowUpdateState,
    pub sequence: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShadowUpdateState {
    pub reported: ReportedState,
}

/// Cloud-owned desired-state delta. Every field is optional; anything the
/// device does not recognize is dropped by serde rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DesiredDelta {
    #[serde(rename = "lightThreshold")]
    pub light_threshold: Option<f32>,
    #[serde(rename = "moistureThreshold")]
    pub moisture_threshold: Option<f32>,
    #[serde(rename = "lampOn")]
    pub lamp_on: Option<bool>,
    #[serde(rename = "pumpOn")]
    pub pump_on: Option<bool>,
}

impl DesiredDelta {
    /// Parse a delta payload, accepting both the bare field object and the
    /// `{"state": {...}}` envelope some brokers wrap deltas in. Returns
    /// `None` for anything that is not a JSON object.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
        let fields = match value.get("state") {
            Some(state) if state.is_object() => state.clone(),
            _ => value,
        };
        if !fields.is_object() {
            return None;
        }
        serde_json::from_value(fields).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.light_threshold.is_none()
            && self.moisture_threshold.is_none()
            && self.lamp_on.is_none()
            && self.pump_on.is_none()
    }
}

/// Raw measurement sample, published on the telemetry stream. Distinct from
/// the shadow document: this is a time series, not a state record.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementReport {
    pub light: Option<f32>,
    pub moisture: Option<f32>,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub timestamp: i64,
}

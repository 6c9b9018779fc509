use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor did not respond")]
    NoResponse,
    #[error("reading out of range: {0}")]
    OutOfRange(f32),
    #[error("bus error: {0}")]
    Bus(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature: f32,
    pub humidity: f32,
}

pub trait LightSensor {
    fn read_lux(&mut self) -> Result<f32, SensorError>;
}

pub trait MoistureSensor {
    fn read_raw(&mut self) -> Result<f32, SensorError>;
}

pub trait ClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

pub trait Switch {
    fn set(&mut self, on: bool);
}

/// Hardware handles consumed by [`DeviceState`](crate::state::DeviceState).
pub struct Ports {
    pub lamp: Box<dyn Switch>,
    pub pump: Box<dyn Switch>,
    pub light: Box<dyn LightSensor>,
    pub moisture: Box<dyn MoistureSensor>,
    pub climate: Box<dyn ClimateSensor>,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("not connected")]
    NotConnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Wire-level publish/subscribe transport. Implementations perform a single
/// handshake per `connect` call and never retry internally; retry cadence
/// belongs to the scheduler.
pub trait PubSubLink {
    fn connect(&mut self) -> Result<(), LinkError>;
    fn is_alive(&self) -> bool;
    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError>;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError>;
    fn poll(&mut self) -> Result<Vec<InboundMessage>, LinkError>;
}

pub mod config;
pub mod ports;
pub mod scheduler;
pub mod state;
pub mod sync;
pub mod tasks;
pub mod topics;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{AutomationConfig, DeviceConfig, NetworkConfig, TlsFiles};
pub use ports::{
    ClimateReading, ClimateSensor, InboundMessage, LightSensor, LinkError, MoistureSensor, Ports,
    PubSubLink, SensorError, Switch,
};
pub use scheduler::{Repeat, Requests, Scheduler, Task, TaskId, TaskPhase};
pub use state::DeviceState;
pub use sync::{ConnectionState, SyncService};
pub use tasks::{App, Tasks};
pub use types::{DesiredDelta, MeasurementReport, ReportedState, ShadowUpdate};

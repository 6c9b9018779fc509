mod hw;
mod mqtt;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::info;

use plantsitter_common::config::DeviceConfig;
use plantsitter_common::ports::Ports;
use plantsitter_common::state::DeviceState;
use plantsitter_common::sync::SyncService;
use plantsitter_common::tasks::{self, App};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("PLANTSITTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./plantsitter.json"));
    let mut config = load_config(&config_path)
        .with_context(|| format!("failed to load device config from {}", config_path.display()))?;
    config.sanitize();

    let link =
        mqtt::MqttLink::new(&config.network).context("failed to prepare pub/sub transport")?;

    let ports = Ports {
        lamp: Box::new(hw::GpioSwitch::new("lamp")),
        pump: Box::new(hw::GpioSwitch::new("pump")),
        light: Box::new(hw::SimLightSensor::default()),
        moisture: Box::new(hw::SimMoistureSensor::default()),
        climate: Box::new(hw::SimClimateSensor::default()),
    };

    let state = DeviceState::new(ports, &config.automation);
    let sync = SyncService::new(config.network.device_name.clone(), Box::new(link));
    let (mut scheduler, task_set) = tasks::build(&config.automation);

    let mut app = App { state, sync };
    tasks::start(
        &mut scheduler,
        &task_set,
        &mut app,
        &config.automation,
        monotonic_ms(),
    );

    info!(
        "control loop started as {} against {}:{}",
        config.network.device_name, config.network.mqtt_host, config.network.mqtt_port
    );

    loop {
        scheduler.tick(&mut app, monotonic_ms());
        thread::sleep(Duration::from_millis(1));
    }
}

fn load_config(path: &Path) -> anyhow::Result<DeviceConfig> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

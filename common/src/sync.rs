use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ports::{InboundMessage, PubSubLink};
use crate::state::DeviceState;
use crate::topics;
use crate::types::{DesiredDelta, MeasurementReport, ShadowUpdate, ShadowUpdateState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the pub/sub session and the shadow-document protocol: reported state
/// flows out, desired-state deltas flow in and are applied to
/// [`DeviceState`]. The service never retries on its own; the scheduler
/// decides when another connect attempt is warranted.
pub struct SyncService {
    link: Box<dyn PubSubLink>,
    conn: ConnectionState,
    shadow_update_topic: String,
    shadow_delta_topic: String,
    telemetry_topic: String,
    sequence: u64,
}

impl SyncService {
    pub fn new(device_name: impl Into<String>, link: Box<dyn PubSubLink>) -> Self {
        let device_name = device_name.into();
        Self {
            link,
            conn: ConnectionState::Disconnected,
            shadow_update_topic: topics::shadow_update(&device_name),
            shadow_delta_topic: topics::shadow_delta(&device_name),
            telemetry_topic: topics::telemetry(&device_name),
            sequence: 0,
        }
    }

    /// True while the session is established and the transport still looks
    /// alive. A dead transport downgrades the state as a side effect, so the
    /// next reconnect pass sees `false`.
    pub fn connected(&mut self) -> bool {
        if self.conn == ConnectionState::Connected && !self.link.is_alive() {
            warn!("pub/sub transport lost");
            self.conn = ConnectionState::Disconnected;
        }
        self.conn == ConnectionState::Connected
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn
    }

    /// One handshake attempt, including the delta-topic subscription. Any
    /// failure lands back in `Disconnected`.
    pub fn connect(&mut self) -> bool {
        self.conn = ConnectionState::Connecting;

        if let Err(err) = self.link.connect() {
            warn!("connect attempt failed: {err}");
            self.conn = ConnectionState::Disconnected;
            return false;
        }
        if let Err(err) = self.link.subscribe(&self.shadow_delta_topic) {
            warn!(
                "subscribing to {} failed: {err}",
                self.shadow_delta_topic
            );
            self.conn = ConnectionState::Disconnected;
            return false;
        }

        info!("cloud session established");
        self.conn = ConnectionState::Connected;
        true
    }

    /// Drain inbound messages and apply recognized desired-state fields.
    /// Returns whether device state changed, in which case the caller should
    /// re-arm the shadow-publish task so the cloud observes convergence.
    pub fn service(&mut self, state: &mut DeviceState) -> bool {
        let messages = match self.link.poll() {
            Ok(messages) => messages,
            Err(err) => {
                warn!("pub/sub poll failed: {err}");
                self.conn = ConnectionState::Disconnected;
                return false;
            }
        };

        let mut changed = false;
        for message in messages {
            changed |= self.handle_message(state, &message);
        }
        changed
    }

    fn handle_message(&mut self, state: &mut DeviceState, message: &InboundMessage) -> bool {
        if message.topic != self.shadow_delta_topic {
            debug!("ignoring message on unexpected topic {}", message.topic);
            return false;
        }

        let Some(delta) = DesiredDelta::parse(&message.payload) else {
            warn!("dropping malformed shadow delta");
            return false;
        };
        if delta.is_empty() {
            return false;
        }

        Self::apply_delta(state, &delta)
    }

    fn apply_delta(state: &mut DeviceState, delta: &DesiredDelta) -> bool {
        let mut changed = false;

        if let Some(threshold) = delta.light_threshold.filter(|value| value.is_finite()) {
            info!("desired light threshold -> {threshold}");
            state.set_light_threshold(threshold);
            changed = true;
        }
        if let Some(threshold) = delta.moisture_threshold.filter(|value| value.is_finite()) {
            info!("desired moisture threshold -> {threshold}");
            state.set_moisture_threshold(threshold);
            changed = true;
        }
        if let Some(on) = delta.lamp_on {
            info!("desired lamp state -> {on}");
            state.write_lamp(on);
            changed = true;
        }
        if let Some(on) = delta.pump_on {
            info!("desired pump state -> {on}");
            state.write_pump(on);
            changed = true;
        }

        changed
    }

    /// Serialize the reported half of the shadow and publish it,
    /// fire-and-forget. Safe to call with a previous publish outstanding.
    pub fn publish_shadow_update(&mut self, state: &DeviceState) {
        self.sequence += 1;
        let document = ShadowUpdate {
            state: ShadowUpdateState {
                reported: state.reported(),
            },
            sequence: self.sequence,
            timestamp: Utc::now().timestamp(),
        };
        let topic = self.shadow_update_topic.clone();
        self.publish(&topic, &document);
    }

    /// Poll every sensor and publish one telemetry sample.
    pub fn publish_sensor_measurements(&mut self, state: &mut DeviceState) {
        let light = state.read_light();
        let moisture = state.read_moisture();
        let climate = state.read_climate();

        let report = MeasurementReport {
            light,
            moisture,
            temperature: climate.map(|reading| reading.temperature),
            humidity: climate.map(|reading| reading.humidity),
            timestamp: Utc::now().timestamp(),
        };
        let topic = self.telemetry_topic.clone();
        self.publish(&topic, &report);
    }

    fn publish<T: Serialize>(&mut self, topic: &str, payload: &T) {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(err) => {
                warn!("serializing payload for {topic} failed: {err}");
                return;
            }
        };
        if let Err(err) = self.link.publish(topic, &body) {
            warn!("publish to {topic} failed: {err}");
            self.conn = ConnectionState::Disconnected;
        }
    }
}

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::AutomationConfig;
use crate::ports::{
    ClimateReading, ClimateSensor, InboundMessage, LightSensor, LinkError, MoistureSensor, Ports,
    PubSubLink, SensorError, Switch,
};
use crate::state::DeviceState;
use crate::sync::SyncService;
use crate::topics;

pub const DEVICE_NAME: &str = "potted-basil";

pub struct RecordingSwitch {
    writes: Rc<RefCell<Vec<bool>>>,
}

impl Switch for RecordingSwitch {
    fn set(&mut self, on: bool) {
        self.writes.borrow_mut().push(on);
    }
}

pub struct ScriptedLight {
    lux: Rc<RefCell<Option<f32>>>,
}

impl LightSensor for ScriptedLight {
    fn read_lux(&mut self) -> Result<f32, SensorError> {
        self.lux.borrow().ok_or(SensorError::NoResponse)
    }
}

pub struct ScriptedMoisture {
    raw: Rc<RefCell<Option<f32>>>,
}

impl MoistureSensor for ScriptedMoisture {
    fn read_raw(&mut self) -> Result<f32, SensorError> {
        self.raw.borrow().ok_or(SensorError::NoResponse)
    }
}

pub struct ScriptedClimate {
    reading: Rc<RefCell<Option<ClimateReading>>>,
}

impl ClimateSensor for ScriptedClimate {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.reading.borrow().ok_or(SensorError::NoResponse)
    }
}

#[derive(Default)]
pub struct LinkState {
    pub alive: bool,
    pub accept_connect: bool,
    pub connect_calls: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    pub inbound: VecDeque<InboundMessage>,
}

pub struct ScriptedLink {
    state: Rc<RefCell<LinkState>>,
}

impl PubSubLink for ScriptedLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        let mut state = self.state.borrow_mut();
        state.connect_calls += 1;
        if state.accept_connect {
            state.alive = true;
            Ok(())
        } else {
            Err(LinkError::Refused("scripted refusal".to_string()))
        }
    }

    fn is_alive(&self) -> bool {
        self.state.borrow().alive
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        let mut state = self.state.borrow_mut();
        if !state.alive {
            return Err(LinkError::NotConnected);
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        let mut state = self.state.borrow_mut();
        if !state.alive {
            return Err(LinkError::NotConnected);
        }
        state.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<InboundMessage>, LinkError> {
        let mut state = self.state.borrow_mut();
        if !state.alive {
            return Err(LinkError::NotConnected);
        }
        Ok(state.inbound.drain(..).collect())
    }
}

/// Shared handles into the fake hardware and transport, so tests can script
/// readings and inspect writes while the device owns the ports.
pub struct Rig {
    pub lamp_writes: Rc<RefCell<Vec<bool>>>,
    pub pump_writes: Rc<RefCell<Vec<bool>>>,
    pub lux: Rc<RefCell<Option<f32>>>,
    pub moisture: Rc<RefCell<Option<f32>>>,
    pub climate: Rc<RefCell<Option<ClimateReading>>>,
    pub link: Rc<RefCell<LinkState>>,
}

impl Rig {
    pub fn published_to(&self, topic: &str) -> Vec<Vec<u8>> {
        self.link
            .borrow()
            .published
            .iter()
            .filter(|(published_topic, _)| published_topic == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

pub fn delta_message(payload: &[u8]) -> InboundMessage {
    InboundMessage {
        topic: topics::shadow_delta(DEVICE_NAME),
        payload: payload.to_vec(),
    }
}

pub fn rig(automation: &AutomationConfig) -> (DeviceState, SyncService, Rig) {
    let lamp_writes = Rc::new(RefCell::new(Vec::new()));
    let pump_writes = Rc::new(RefCell::new(Vec::new()));
    let lux = Rc::new(RefCell::new(Some(200.0)));
    let moisture = Rc::new(RefCell::new(Some(500.0)));
    let climate = Rc::new(RefCell::new(Some(ClimateReading {
        temperature: 21.5,
        humidity: 50.0,
    })));
    let link = Rc::new(RefCell::new(LinkState {
        accept_connect: true,
        ..LinkState::default()
    }));

    let ports = Ports {
        lamp: Box::new(RecordingSwitch {
            writes: Rc::clone(&lamp_writes),
        }),
        pump: Box::new(RecordingSwitch {
            writes: Rc::clone(&pump_writes),
        }),
        light: Box::new(ScriptedLight {
            lux: Rc::clone(&lux),
        }),
        moisture: Box::new(ScriptedMoisture {
            raw: Rc::clone(&moisture),
        }),
        climate: Box::new(ScriptedClimate {
            reading: Rc::clone(&climate),
        }),
    };

    let state = DeviceState::new(ports, automation);
    let sync = SyncService::new(
        DEVICE_NAME,
        Box::new(ScriptedLink {
            state: Rc::clone(&link),
        }),
    );

    (
        state,
        sync,
        Rig {
            lamp_writes,
            pump_writes,
            lux,
            moisture,
            climate,
            link,
        },
    )
}

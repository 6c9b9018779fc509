use std::time::{Duration, Instant};

use anyhow::Context;
use rumqttc::{
    AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS, TlsConfiguration, Transport,
};
use tokio::runtime::Runtime;
use tracing::debug;

use plantsitter_common::config::NetworkConfig;
use plantsitter_common::ports::{InboundMessage, LinkError, PubSubLink};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DRAIN_BUDGET: Duration = Duration::from_millis(2);
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Synchronous façade over the rumqttc client, driven from the control loop.
/// Each `connect` builds a fresh session; `poll` pumps the event loop for a
/// bounded slice of time so a single tick never stalls on the network.
pub struct MqttLink {
    options: MqttOptions,
    runtime: Runtime,
    session: Option<Session>,
    alive: bool,
}

struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl MqttLink {
    pub fn new(network: &NetworkConfig) -> anyhow::Result<Self> {
        let mut options = MqttOptions::new(
            network.device_name.clone(),
            network.mqtt_host.clone(),
            network.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(30));

        if let Some(tls) = &network.tls {
            let ca = std::fs::read(&tls.ca_cert).with_context(|| {
                format!(
                    "failed to read root CA certificate {}",
                    tls.ca_cert.display()
                )
            })?;
            let client_cert = std::fs::read(&tls.client_cert).with_context(|| {
                format!(
                    "failed to read client certificate {}",
                    tls.client_cert.display()
                )
            })?;
            let client_key = std::fs::read(&tls.client_key).with_context(|| {
                format!("failed to read client key {}", tls.client_key.display())
            })?;

            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: Some((client_cert, client_key)),
            }));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build transport runtime")?;

        Ok(Self {
            options,
            runtime,
            session: None,
            alive: false,
        })
    }
}

impl PubSubLink for MqttLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.session = None;
        self.alive = false;

        let (client, mut eventloop) =
            AsyncClient::new(self.options.clone(), REQUEST_QUEUE_CAPACITY);
        let deadline = Instant::now() + CONNECT_TIMEOUT;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::Refused("broker handshake timed out".to_string()));
            }
            let polled = self
                .runtime
                .block_on(tokio::time::timeout(remaining, eventloop.poll()));
            match polled {
                Ok(Ok(Event::Incoming(Incoming::ConnAck(_)))) => break,
                Ok(Ok(event)) => debug!("handshake event: {event:?}"),
                Ok(Err(err)) => return Err(LinkError::Refused(err.to_string())),
                Err(_) => {
                    return Err(LinkError::Refused("broker handshake timed out".to_string()))
                }
            }
        }

        self.session = Some(Session { client, eventloop });
        self.alive = true;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        let Some(session) = self.session.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        let subscribed = self
            .runtime
            .block_on(session.client.subscribe(topic, QoS::AtMostOnce));
        if let Err(err) = subscribed {
            self.alive = false;
            return Err(LinkError::Transport(err.to_string()));
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        let Some(session) = self.session.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        let published = self.runtime.block_on(session.client.publish(
            topic,
            QoS::AtMostOnce,
            false,
            payload.to_vec(),
        ));
        if let Err(err) = published {
            self.alive = false;
            return Err(LinkError::Transport(err.to_string()));
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<InboundMessage>, LinkError> {
        let Some(session) = self.session.as_mut() else {
            return Err(LinkError::NotConnected);
        };

        let mut messages = Vec::new();
        let deadline = Instant::now() + DRAIN_BUDGET;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let polled = self
                .runtime
                .block_on(tokio::time::timeout(remaining, session.eventloop.poll()));
            match polled {
                Ok(Ok(Event::Incoming(Incoming::Publish(publish)))) => {
                    messages.push(InboundMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    self.alive = false;
                    return Err(LinkError::Transport(err.to_string()));
                }
                Err(_) => break,
            }
        }

        Ok(messages)
    }
}

//! MqttGatewayActor - Subscribes to the device topics and feeds the pipeline
//!
//! ## Message Flow
//!
//! ```text
//! Broker → EventLoop::poll → classify by topic → decode JSON → queue.send (blocks when full)
//!     ↑
//!     └─── Commands (GetStats, Shutdown)
//! ```
//!
//! Malformed bodies are dropped and counted; they never reach the pipeline.
//! A full queue blocks the event loop, which stops reading from the broker:
//! backpressure is preferred over losing events.
//!
//! There is no reconnection logic. A connection error ends the actor, which
//! drops its queue sender and lets the pipeline wind down.

use std::time::Duration;

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::MqttConfig;

use super::messages::{GatewayCommand, IngestionStats, Message, MessageKind};

/// Capacity of the queue between the gateway and the pipeline.
pub const QUEUE_CAPACITY: usize = 1000;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CHANNEL_CAPACITY: usize = 10;
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// The two subscribed topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Best-effort delivery (QoS 0)
    pub telemetry: String,

    /// At-least-once delivery (QoS 1)
    pub event: String,
}

impl Topics {
    pub fn new(base: &str) -> Topics {
        let base = base.trim_end_matches('/');
        Self {
            telemetry: format!("{base}/{}", MessageKind::Telemetry.suffix()),
            event: format!("{base}/{}", MessageKind::Event.suffix()),
        }
    }

    pub fn subscriptions(&self) -> [(&str, QoS); 2] {
        [
            (self.telemetry.as_str(), QoS::AtMostOnce),
            (self.event.as_str(), QoS::AtLeastOnce),
        ]
    }
}

/// Decodes inbound bodies and hands them to the pipeline queue.
///
/// Kept apart from the MQTT plumbing so it can be driven without a broker.
pub struct Ingestion {
    queue: mpsc::Sender<Message>,
    stats: IngestionStats,
}

impl Ingestion {
    pub fn new(queue: mpsc::Sender<Message>) -> Ingestion {
        Self {
            queue,
            stats: IngestionStats::default(),
        }
    }

    /// Handle one inbound publish.
    ///
    /// Decode failures are swallowed. The only error is a closed queue, which
    /// means the pipeline has gone away.
    #[instrument(level = "trace", skip(self, body), fields(len = body.len()))]
    pub async fn handle_publish(&mut self, topic: &str, body: &[u8]) -> Result<()> {
        self.stats.received += 1;
        let kind = MessageKind::from_topic(topic);

        let message = match Message::decode(kind, body) {
            Ok(message) => message,
            Err(e) => {
                self.stats.dropped += 1;
                debug!("{topic}: dropping malformed payload: {e}");
                return Ok(());
            }
        };

        trace!("{topic}: enqueueing {kind:?} message");
        self.queue
            .send(message)
            .await
            .context("pipeline queue closed")?;
        self.stats.enqueued += 1;

        Ok(())
    }

    pub fn stats(&self) -> IngestionStats {
        self.stats
    }
}

/// Actor that owns the MQTT connection
pub struct MqttGatewayActor {
    client: AsyncClient,
    eventloop: EventLoop,
    topics: Topics,
    ingestion: Ingestion,
    command_rx: mpsc::Receiver<GatewayCommand>,
    broker: String,
}

impl MqttGatewayActor {
    pub fn new(
        config: &MqttConfig,
        queue: mpsc::Sender<Message>,
        command_rx: mpsc::Receiver<GatewayCommand>,
    ) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Self {
            client,
            eventloop,
            topics: Topics::new(&config.base_topic),
            ingestion: Ingestion::new(queue),
            command_rx,
            broker: format!("{}:{}", config.host, config.port),
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - A Shutdown command is received
    /// - The pipeline queue is closed
    /// - The broker connection fails
    ///
    /// The first two unsubscribe and disconnect before returning.
    #[instrument(skip(self), fields(broker = %self.broker))]
    pub async fn run(mut self) -> Result<()> {
        debug!("starting ingestion gateway");

        let outcome = loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        GatewayCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(self.ingestion.stats());
                        }

                        GatewayCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            self.disconnect().await;
                            let _ = respond_to.send(());
                            break Ok(());
                        }
                    }
                }

                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            if let Err(e) = self.subscribe().await {
                                break Err(e);
                            }
                        }

                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            if let Err(e) = self
                                .ingestion
                                .handle_publish(&publish.topic, &publish.payload)
                                .await
                            {
                                warn!("{e}, stopping ingestion");
                                self.disconnect().await;
                                break Ok(());
                            }
                        }

                        Ok(other) => trace!("mqtt event: {other:?}"),

                        Err(e) => {
                            error!("connection to broker failed: {e}");
                            break Err(anyhow::Error::new(e).context("MQTT connection failed"));
                        }
                    }
                }
            }
        };

        // commands queued while the loop was blocked on the pipeline queue
        self.command_rx.close();
        while let Ok(cmd) = self.command_rx.try_recv() {
            match cmd {
                GatewayCommand::GetStats { respond_to } => {
                    let _ = respond_to.send(self.ingestion.stats());
                }
                GatewayCommand::Shutdown { respond_to } => {
                    let _ = respond_to.send(());
                }
            }
        }

        let stats = self.ingestion.stats();
        debug!(
            "ingestion gateway stopped (received {}, enqueued {}, dropped {})",
            stats.received, stats.enqueued, stats.dropped
        );
        outcome
    }

    async fn subscribe(&mut self) -> Result<()> {
        for (topic, qos) in self.topics.subscriptions() {
            self.client
                .subscribe(topic, qos)
                .await
                .with_context(|| format!("failed to subscribe to {topic}"))?;
        }
        info!("subscribed to {}, {}", self.topics.telemetry, self.topics.event);
        Ok(())
    }

    /// Unsubscribe and disconnect, then poll until the disconnect is flushed.
    async fn disconnect(&mut self) {
        for (topic, _) in self.topics.subscriptions() {
            if let Err(e) = self.client.unsubscribe(topic).await {
                warn!("failed to unsubscribe from {topic}: {e}");
            }
        }

        if let Err(e) = self.client.disconnect().await {
            warn!("failed to request disconnect: {e}");
            return;
        }

        let eventloop = &mut self.eventloop;
        let flush = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };

        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            warn!("timed out flushing disconnect to broker");
        } else {
            debug!("disconnected from broker");
        }
    }
}

/// Handle for controlling a MqttGatewayActor
#[derive(Clone)]
pub struct GatewayHandle {
    sender: mpsc::Sender<GatewayCommand>,
}

impl GatewayHandle {
    /// Spawn a new gateway actor feeding `queue`
    ///
    /// The actor connects lazily: the first poll of its event loop opens the
    /// broker connection.
    pub fn spawn(config: &MqttConfig, queue: mpsc::Sender<Message>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = MqttGatewayActor::new(config, queue, cmd_rx);

        tokio::spawn(async move {
            if let Err(e) = actor.run().await {
                error!("ingestion gateway terminated: {e:#}");
            }
        });

        Self { sender: cmd_tx }
    }

    pub async fn stats(&self) -> Result<IngestionStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(GatewayCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    /// Disconnect from the broker and wait for the actor to confirm
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(GatewayCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("gateway stopped before confirming shutdown")
    }
}

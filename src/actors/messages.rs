//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Data**: [`Message`] is the only thing that crosses from the ingestion
//!    gateway into the pipeline, through the bounded queue
//! 2. **Commands**: Request/response messages sent to a specific actor via mpsc
//! 3. **Replies**: oneshot channels carry query results back to the caller

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{
    DeviceEvent, Telemetry, features::FeatureVector, monitors::state::OperationalState,
};

/// Kind of inbound message, decided by the topic it arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Telemetry,
    Event,
}

impl MessageKind {
    /// `…/telemetry` is telemetry, every other topic is an event.
    pub fn from_topic(topic: &str) -> MessageKind {
        if topic.ends_with("/telemetry") {
            MessageKind::Telemetry
        } else {
            MessageKind::Event
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            MessageKind::Telemetry => "telemetry",
            MessageKind::Event => "event",
        }
    }
}

/// A decoded inbound message. Consumed exactly once by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Telemetry(Telemetry),
    Event(DeviceEvent),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Telemetry(_) => MessageKind::Telemetry,
            Message::Event(_) => MessageKind::Event,
        }
    }

    /// Decode a raw body as a JSON object of the given kind.
    pub fn decode(kind: MessageKind, body: &[u8]) -> Result<Message, DecodeError> {
        let text = std::str::from_utf8(body).map_err(|_| DecodeError::NotUtf8)?;
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }

        let message = match kind {
            MessageKind::Telemetry => Message::Telemetry(serde_json::from_value(value)?),
            MessageKind::Event => Message::Event(serde_json::from_value(value)?),
        };
        Ok(message)
    }
}

/// Reasons an inbound body is dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Body is not valid UTF-8
    NotUtf8,

    /// Body is not valid JSON
    InvalidJson(String),

    /// Body is JSON but not a key/value object
    NotAnObject,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotUtf8 => write!(f, "payload is not valid UTF-8"),
            DecodeError::InvalidJson(msg) => write!(f, "payload is not valid JSON: {}", msg),
            DecodeError::NotAnObject => write!(f, "payload is not a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidJson(err.to_string())
    }
}

/// Result of processing one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Kind of the message that produced this evaluation
    pub kind: MessageKind,

    /// Features appended to the window
    pub features: FeatureVector,

    /// Normalized anomaly score in [0, 1]
    pub score: f64,

    /// State published alongside the score
    pub state: OperationalState,

    /// Whether a `BATTERY_LOW` grace period was active
    pub in_grace: bool,

    /// Weight applied to the battery delta
    pub battery_weight: f64,

    /// Processing time, seconds since the Unix epoch
    pub evaluated_at: f64,
}

/// Snapshot of the pipeline for status queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Messages processed since start-up
    pub processed: u64,

    /// Current number of vectors in the window
    pub window_len: usize,

    /// Window capacity
    pub window_capacity: usize,

    /// Samples needed before scores leave 0
    pub min_samples: usize,

    /// Timestamp of the latest `BATTERY_LOW` event
    pub last_grace_trigger: Option<f64>,

    /// Most recent evaluation, if any message has been processed
    pub last_evaluation: Option<Evaluation>,
}

/// Commands that can be sent to the PipelineActor
#[derive(Debug)]
pub enum PipelineCommand {
    /// Get a status snapshot
    GetStatus {
        respond_to: oneshot::Sender<PipelineStatus>,
    },

    /// Stop consuming and shut down the ingestion gateway
    ///
    /// The message being processed, if any, completes first.
    Shutdown,
}

/// Counters kept by the ingestion gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// Publishes seen on subscribed topics
    pub received: u64,

    /// Messages handed to the pipeline queue
    pub enqueued: u64,

    /// Bodies dropped because they failed to decode
    pub dropped: u64,
}

/// Commands that can be sent to the MqttGatewayActor
#[derive(Debug)]
pub enum GatewayCommand {
    /// Get ingestion counters
    GetStats {
        respond_to: oneshot::Sender<IngestionStats>,
    },

    /// Unsubscribe, disconnect from the broker and stop
    ///
    /// The reply is sent once the disconnect has been flushed.
    Shutdown { respond_to: oneshot::Sender<()> },
}

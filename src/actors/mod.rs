//! Actor-based processing
//!
//! Ingestion and evaluation run as independent async tasks connected by a
//! bounded queue. Each actor also owns an mpsc command channel and is driven
//! through a cloneable handle.
//!
//! ## Architecture Overview
//!
//! ```text
//!   MQTT broker
//!        │ publish (telemetry QoS 0, event QoS 1)
//!        ▼
//!  ┌──────────────────┐   bounded queue (1000)   ┌───────────────┐
//!  │ MqttGatewayActor │ ───────────────────────▶ │ PipelineActor │ ──▶ MetricsSink
//!  └──────────────────┘        Message           └───────────────┘
//!        ▲                                              ▲
//!        └──────── GatewayCommand      PipelineCommand ─┘
//! ```
//!
//! ## Actor Types
//!
//! - **MqttGatewayActor**: Subscribes, decodes and enqueues device messages
//! - **PipelineActor**: Consumes the queue one message at a time and publishes
//!   score and state
//!
//! ## Communication Patterns
//!
//! 1. **Data**: A single bounded mpsc queue; a full queue blocks the gateway
//! 2. **Commands**: Each actor has an mpsc command channel for control messages
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod ingestion;
pub mod messages;
pub mod pipeline;

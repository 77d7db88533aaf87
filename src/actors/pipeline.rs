//! PipelineActor - Single consumer of the ingestion queue
//!
//! ## Message Flow
//!
//! ```text
//! queue.recv → Pipeline::process → MetricsSink
//!     ↑
//!     └─── Commands (GetStatus, Shutdown)
//! ```
//!
//! The actor waits on its command channel and the queue at the same time, so a
//! shutdown request is seen as soon as the message in progress is done. Scoring
//! itself is never interrupted.

use anyhow::{Context, Result, anyhow};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::AnalyticsConfig, metrics::MetricsSink, monitors::pipeline::Pipeline, util::now_secs,
};

use super::{
    ingestion::GatewayHandle,
    messages::{Message, PipelineCommand, PipelineStatus},
};

pub struct PipelineActor {
    pipeline: Pipeline,

    /// Receiving end of the bounded ingestion queue
    queue_rx: mpsc::Receiver<Message>,

    command_rx: mpsc::Receiver<PipelineCommand>,

    /// Gateway to stop once the loop has exited
    gateway: Option<GatewayHandle>,
}

impl PipelineActor {
    pub fn new(
        pipeline: Pipeline,
        queue_rx: mpsc::Receiver<Message>,
        command_rx: mpsc::Receiver<PipelineCommand>,
        gateway: Option<GatewayHandle>,
    ) -> Self {
        Self {
            pipeline,
            queue_rx,
            command_rx,
            gateway,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - A Shutdown command is received, or every handle is dropped
    /// - The ingestion queue is closed by the gateway
    ///
    /// The latter is reported as an error.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> Result<()> {
        debug!("starting pipeline actor");

        let outcome = loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(PipelineCommand::GetStatus { respond_to }) => {
                            let _ = respond_to.send(self.pipeline.status());
                        }

                        Some(PipelineCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break Ok(());
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break Ok(());
                        }
                    }
                }

                message = self.queue_rx.recv() => {
                    match message {
                        Some(message) => {
                            self.pipeline.process(message, now_secs());
                        }

                        None => {
                            break Err(anyhow!("ingestion queue closed"));
                        }
                    }
                }
            }
        };

        // releases a gateway blocked on a full queue
        self.queue_rx.close();

        if let Some(gateway) = self.gateway.take()
            && let Err(e) = gateway.shutdown().await
        {
            debug!("gateway already stopped: {e:#}");
        }

        info!(
            "pipeline stopped after {} messages",
            self.pipeline.status().processed
        );
        outcome
    }
}

/// Handle for controlling a PipelineActor
#[derive(Clone)]
pub struct PipelineHandle {
    sender: mpsc::Sender<PipelineCommand>,
}

impl PipelineHandle {
    /// Spawn a new pipeline actor consuming `queue_rx`
    ///
    /// The returned join handle resolves once the actor has stopped and the
    /// gateway, if any, has been shut down.
    pub fn spawn(
        config: AnalyticsConfig,
        queue_rx: mpsc::Receiver<Message>,
        metrics: MetricsSink,
        gateway: Option<GatewayHandle>,
    ) -> (Self, JoinHandle<Result<()>>) {
        Self::spawn_with(Pipeline::new(config, metrics), queue_rx, gateway)
    }

    /// Spawn around an already constructed pipeline
    pub fn spawn_with(
        pipeline: Pipeline,
        queue_rx: mpsc::Receiver<Message>,
        gateway: Option<GatewayHandle>,
    ) -> (Self, JoinHandle<Result<()>>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = PipelineActor::new(pipeline, queue_rx, cmd_rx, gateway);
        let task = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, task)
    }

    /// False once the actor has stopped
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    pub async fn status(&self) -> Result<PipelineStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PipelineCommand::GetStatus { respond_to: tx })
            .await
            .context("failed to send GetStatus command")?;

        rx.await.context("failed to receive response")
    }

    /// Ask the actor to stop after the message in progress
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PipelineCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}

use tracing::{debug, trace};

use crate::{
    Telemetry,
    actors::messages::{Evaluation, Message, PipelineStatus},
    config::AnalyticsConfig,
    features,
    metrics::MetricsSink,
    scoring::AnomalyScorer,
    window::WindowBuffer,
};

use super::{grace::GraceTracker, state::OperationalState};

/// One evaluation step per message: features → window → score → state → metrics.
///
/// All state lives here and is touched by a single task, so nothing is locked.
pub struct Pipeline {
    config: AnalyticsConfig,
    window: WindowBuffer,
    scorer: AnomalyScorer,
    grace: GraceTracker,
    last_telemetry: Option<Telemetry>,
    metrics: MetricsSink,
    processed: u64,
    last_evaluation: Option<Evaluation>,
}

impl Pipeline {
    pub fn new(config: AnalyticsConfig, metrics: MetricsSink) -> Pipeline {
        let scorer = AnomalyScorer::new(config.min_samples);
        Self::with_scorer(config, scorer, metrics)
    }

    pub fn with_scorer(
        config: AnalyticsConfig,
        scorer: AnomalyScorer,
        metrics: MetricsSink,
    ) -> Pipeline {
        Self {
            window: WindowBuffer::new(config.window_size),
            grace: GraceTracker::new(config.grace_window()),
            config,
            scorer,
            last_telemetry: None,
            metrics,
            processed: 0,
            last_evaluation: None,
        }
    }

    /// Process one message observed at `now` (seconds since the Unix epoch).
    pub fn process(&mut self, message: Message, now: f64) -> Evaluation {
        // grace is decided before this message can open a new period
        let in_grace = self.grace.in_grace(now);
        let battery_weight = if in_grace {
            self.config.battery_low_battery_weight
        } else {
            1.0
        };

        if let Message::Event(event) = &message
            && event.is_battery_low()
        {
            let ts = event.ts.unwrap_or(now);
            debug!("battery low event at {ts}, grace period (re)started");
            self.grace.record(ts);
        }

        let kind = message.kind();
        let features = features::extract(&message, self.last_telemetry.as_ref(), battery_weight);

        if let Message::Telemetry(telemetry) = message {
            self.last_telemetry = Some(telemetry);
        }

        self.window.add(features);
        let score = self.scorer.score(&self.window.snapshot());
        let state = OperationalState::evaluate(
            score,
            self.config.anomaly_warn,
            self.config.anomaly_crit,
            in_grace,
        );

        self.metrics.publish(score, state);
        self.processed += 1;

        trace!(
            "{kind:?}: score {score:.3} → {state} (grace: {in_grace}, window {}/{})",
            self.window.size(),
            self.window.capacity()
        );

        let evaluation = Evaluation {
            kind,
            features,
            score,
            state,
            in_grace,
            battery_weight,
            evaluated_at: now,
        };
        self.last_evaluation = Some(evaluation.clone());
        evaluation
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            processed: self.processed,
            window_len: self.window.size(),
            window_capacity: self.window.capacity(),
            min_samples: self.scorer.min_samples(),
            last_grace_trigger: self.grace.last_trigger(),
            last_evaluation: self.last_evaluation.clone(),
        }
    }
}

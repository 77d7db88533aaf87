//! Anomaly scoring
//!
//! The scorer refits an unsupervised [`OutlierModel`] on the whole window on
//! every evaluation and reports how unusual the newest vector is relative to
//! the rest of that window.
//!
//! ## Normalization
//!
//! ```text
//! len(window) < min_samples  → 0.0   (cold start)
//! max_s == min_s             → 0.0   (no spread in outlier measure)
//! otherwise                  → clamp((max_s - latest) / (max_s - min_s), 0, 1)
//! ```
//!
//! The score is window-relative: the same reading can score differently
//! depending on what else is in the window. No baseline is persisted.

pub mod isolation;

use tracing::trace;

use crate::features::{FEATURE_COUNT, FeatureVector};

pub use isolation::IsolationForest;

/// Unsupervised outlier model.
///
/// Implementations fit on `rows` and return one measure per row, where a
/// higher value means "more normal". An incremental model can implement this
/// as long as it keeps that convention.
pub trait OutlierModel: Send {
    fn fit_score(&mut self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<f64>;
}

pub struct AnomalyScorer {
    min_samples: usize,
    model: Box<dyn OutlierModel>,
}

impl AnomalyScorer {
    /// Scorer backed by the default isolation forest.
    pub fn new(min_samples: usize) -> AnomalyScorer {
        Self::with_model(min_samples, IsolationForest::default())
    }

    pub fn with_model<M>(min_samples: usize, model: M) -> AnomalyScorer
    where
        M: OutlierModel + 'static,
    {
        Self {
            min_samples,
            model: Box::new(model),
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Score the newest vector of `window` in `[0, 1]`.
    pub fn score(&mut self, window: &[FeatureVector]) -> f64 {
        if window.is_empty() || window.len() < self.min_samples {
            trace!(
                "cold start: {}/{} samples, score pinned to 0",
                window.len(),
                self.min_samples
            );
            return 0.0;
        }

        let rows: Vec<[f64; FEATURE_COUNT]> = window.iter().map(FeatureVector::as_row).collect();
        let measures = self.model.fit_score(&rows);

        normalize(&measures)
    }
}

/// Rescale the last measure against the spread of all measures.
pub fn normalize(measures: &[f64]) -> f64 {
    let Some(&latest) = measures.last() else {
        return 0.0;
    };

    let (min_s, max_s) = measures
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &s| {
            (min.min(s), max.max(s))
        });

    let spread = max_s - min_s;
    if !spread.is_finite() || spread <= 0.0 || !latest.is_finite() {
        return 0.0;
    }

    ((max_s - latest) / spread).clamp(0.0, 1.0)
}

//! Confidence scorers for editor signals
//!
//! Each scorer is responsible for:
//! 1. Recognising the signals of its own detection method
//! 2. Mapping a signal to a confidence in [0, 1]
//! 3. Keeping whatever timing memory it needs, never the activity state

pub mod document;
pub mod focus;
pub mod selection;
pub mod self_report;

use super::config::ScorerSettings;
use super::{DetectionEvent, DetectionMethod, Signal};
use tokio::time::Instant;

/// Trait for confidence scorers
pub trait Scorer: Send {
    /// Name of the scorer
    fn name(&self) -> &'static str;

    /// Detection method this scorer implements
    fn method(&self) -> DetectionMethod;

    /// Score a signal. Returns `None` when the signal says nothing about
    /// generation activity.
    fn score(&mut self, signal: &Signal, now: Instant) -> Option<DetectionEvent>;
}

/// Create all enabled scorers
pub fn create_scorers(config: &ScorerSettings) -> Vec<Box<dyn Scorer>> {
    let mut scorers: Vec<Box<dyn Scorer>> = Vec::new();

    if config.document.enabled {
        scorers.push(Box::new(document::DocumentScorer::new(config.document.clone())));
    }

    if config.selection.enabled {
        scorers.push(Box::new(selection::SelectionScorer::new(config.selection.clone())));
    }

    if config.focus.enabled {
        scorers.push(Box::new(focus::FocusScorer::new(config.focus.clone())));
    }

    if config.self_report.enabled {
        scorers.push(Box::new(self_report::SelfReportScorer::new()));
    }

    scorers
}

/// Linear ramp from 1.0 at `fast` down to 0.0 at `slow`
pub(crate) fn speed_factor(gap_ms: u64, fast_ms: u64, slow_ms: u64) -> f64 {
    if gap_ms <= fast_ms {
        1.0
    } else if gap_ms >= slow_ms {
        0.0
    } else {
        (slow_ms - gap_ms) as f64 / (slow_ms - fast_ms) as f64
    }
}

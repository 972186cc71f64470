//! Selection-change scorer
//!
//! Some assistants select the region they are about to rewrite. A large
//! selection is weak evidence on its own and never crosses the default
//! threshold without help.

use super::super::config::SelectionScorerSettings;
use super::super::{DetectionEvent, DetectionMethod, EditorEvent, Signal};
use tokio::time::Instant;

const MIN_CONFIDENCE: f64 = 0.30;
const MAX_CONFIDENCE: f64 = 0.50;

pub struct SelectionScorer {
    config: SelectionScorerSettings,
}

impl SelectionScorer {
    pub fn new(config: SelectionScorerSettings) -> Self {
        Self { config }
    }
}

impl super::Scorer for SelectionScorer {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::SelectionChange
    }

    fn score(&mut self, signal: &Signal, _now: Instant) -> Option<DetectionEvent> {
        let Signal::Editor(EditorEvent::SelectionChange { uri, selected }) = signal else {
            return None;
        };

        let min = self.config.min_chars;
        if *selected < min {
            return None;
        }

        let excess = ((selected - min) as f64 / min as f64).min(1.0);
        let confidence = MIN_CONFIDENCE + (MAX_CONFIDENCE - MIN_CONFIDENCE) * excess;

        Some(DetectionEvent::positive(
            DetectionMethod::SelectionChange,
            confidence,
            format!("{} chars selected in {}", selected, uri),
        ))
    }
}

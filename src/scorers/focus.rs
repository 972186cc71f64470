//! Focus-change scorer
//!
//! Supplementary only. Focus bouncing between the chat panel and the editor
//! happens while an assistant applies edits.

use super::super::config::FocusScorerSettings;
use super::super::{DetectionEvent, DetectionMethod, EditorEvent, Signal};
use std::time::Duration;
use tokio::time::Instant;

const BASE_CONFIDENCE: f64 = 0.15;
const FLAP_CONFIDENCE: f64 = 0.40;

pub struct FocusScorer {
    config: FocusScorerSettings,
    last_change: Option<Instant>,
}

impl FocusScorer {
    pub fn new(config: FocusScorerSettings) -> Self {
        Self {
            config,
            last_change: None,
        }
    }
}

impl super::Scorer for FocusScorer {
    fn name(&self) -> &'static str {
        "focus"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::FocusChange
    }

    fn score(&mut self, signal: &Signal, now: Instant) -> Option<DetectionEvent> {
        let Signal::Editor(EditorEvent::FocusChange { focused }) = signal else {
            return None;
        };

        let window = Duration::from_millis(self.config.flap_window_ms);
        let flapping = self
            .last_change
            .map_or(false, |prev| now.saturating_duration_since(prev) < window);
        self.last_change = Some(now);

        let confidence = if flapping { FLAP_CONFIDENCE } else { BASE_CONFIDENCE };
        let descriptor = if *focused { "focus gained" } else { "focus lost" };

        Some(DetectionEvent::positive(DetectionMethod::FocusChange, confidence, descriptor))
    }
}

//! Document-change scorer
//!
//! Large edits that land in quick succession look like streamed completions.
//! Single keystrokes and edits to non-file documents are ignored. An isolated
//! edit, however large, looks like a paste and stays below the default
//! threshold until a second edit follows within the slow gap.

use super::super::config::DocumentScorerSettings;
use super::super::{DetectionEvent, DetectionMethod, EditorEvent, Signal};
use super::speed_factor;
use tokio::time::Instant;
use tracing::trace;

const BASE_CONFIDENCE: f64 = 0.35;
const SIZE_WEIGHT: f64 = 0.35;
const SPEED_WEIGHT: f64 = 0.25;
const MAX_CONFIDENCE: f64 = 0.95;
/// Ceiling for an edit with no recent predecessor
const ISOLATED_CONFIDENCE: f64 = 0.45;

/// URI schemes of documents the assistant never writes into
const IGNORED_SCHEMES: &[&str] = &["output:", "debug:", "git:", "vscode-scm:", "comment:"];

pub struct DocumentScorer {
    config: DocumentScorerSettings,
    last_edit: Option<Instant>,
}

impl DocumentScorer {
    pub fn new(config: DocumentScorerSettings) -> Self {
        Self {
            config,
            last_edit: None,
        }
    }

    fn confidence(&self, changed: usize, now: Instant) -> f64 {
        let size = (changed as f64 / self.config.large_edit_chars as f64).min(1.0);
        let base = BASE_CONFIDENCE + SIZE_WEIGHT * size;

        let gap = self
            .last_edit
            .map(|prev| now.saturating_duration_since(prev).as_millis() as u64)
            .filter(|gap| *gap < self.config.slow_gap_ms);
        match gap {
            Some(gap) => {
                let speed = speed_factor(gap, self.config.fast_gap_ms, self.config.slow_gap_ms);
                (base + SPEED_WEIGHT * speed).min(MAX_CONFIDENCE)
            }
            None => base.min(ISOLATED_CONFIDENCE),
        }
    }
}

fn is_ignored_document(uri: &str) -> bool {
    IGNORED_SCHEMES.iter().any(|scheme| uri.starts_with(scheme))
}

impl super::Scorer for DocumentScorer {
    fn name(&self) -> &'static str {
        "document"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::DocumentChange
    }

    fn score(&mut self, signal: &Signal, now: Instant) -> Option<DetectionEvent> {
        let Signal::Editor(EditorEvent::DocumentChange { uri, inserted, removed }) = signal else {
            return None;
        };

        if is_ignored_document(uri) {
            trace!("Ignoring change to {}", uri);
            return None;
        }

        let changed = inserted.saturating_add(*removed);
        if changed < self.config.min_chars {
            return None;
        }

        let confidence = self.confidence(changed, now);
        self.last_edit = Some(now);

        Some(DetectionEvent::positive(
            DetectionMethod::DocumentChange,
            confidence,
            format!("{} chars in {}", changed, uri),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Scorer;
    use super::*;
    use std::time::Duration;

    fn edit(uri: &str, inserted: usize) -> Signal {
        Signal::Editor(EditorEvent::DocumentChange {
            uri: uri.to_string(),
            inserted,
            removed: 0,
        })
    }

    #[test]
    fn test_typing_is_ignored() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        assert!(scorer.score(&edit("file:///a.rs", 1), Instant::now()).is_none());
    }

    #[test]
    fn test_output_channel_is_ignored() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        assert!(scorer.score(&edit("output:extension-output", 500), Instant::now()).is_none());
    }

    #[test]
    fn test_fast_large_edits_score_high() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        let t0 = Instant::now();

        let first = scorer.score(&edit("file:///a.rs", 80), t0).unwrap();
        assert_eq!(first.confidence, ISOLATED_CONFIDENCE);

        let second = scorer
            .score(&edit("file:///a.rs", 80), t0 + Duration::from_millis(200))
            .unwrap();
        assert!((second.confidence - 0.88).abs() < 1e-9);
        assert!(second.confidence > 0.5);
    }

    #[test]
    fn test_slow_small_edits_stay_below_threshold() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        let t0 = Instant::now();

        scorer.score(&edit("file:///a.rs", 20), t0);
        let later = scorer
            .score(&edit("file:///a.rs", 20), t0 + Duration::from_secs(5))
            .unwrap();
        assert!(later.confidence < 0.5);
    }

    #[test]
    fn test_isolated_paste_stays_below_threshold() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        let t0 = Instant::now();

        let paste = scorer.score(&edit("file:///a.rs", 45), t0).unwrap();
        assert!(paste.confidence < 0.5);

        // A second large edit long after the first is just another paste
        let later = scorer
            .score(&edit("file:///a.rs", 400), t0 + Duration::from_secs(3))
            .unwrap();
        assert_eq!(later.confidence, ISOLATED_CONFIDENCE);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        let signal = Signal::Editor(EditorEvent::DocumentChange {
            uri: "file:///a.rs".to_string(),
            inserted: usize::MAX,
            removed: 1,
        });

        let event = scorer.score(&signal, Instant::now()).unwrap();
        assert_eq!(event.confidence, ISOLATED_CONFIDENCE);
        assert!(event.descriptor.starts_with(&usize::MAX.to_string()));
    }

    #[test]
    fn test_confidence_is_capped() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        let t0 = Instant::now();
        scorer.score(&edit("file:///a.rs", 5000), t0);
        let event = scorer.score(&edit("file:///a.rs", 5000), t0).unwrap();
        assert_eq!(event.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_other_signals_ignored() {
        let mut scorer = DocumentScorer::new(DocumentScorerSettings::default());
        let signal = Signal::Editor(EditorEvent::FocusChange { focused: true });
        assert!(scorer.score(&signal, Instant::now()).is_none());
    }
}

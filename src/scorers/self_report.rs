//! Self-report scorer
//!
//! Maps the status the assistant wrote into the sentinel file to a
//! near-certain positive or negative signal.

use super::super::{DetectionEvent, DetectionMethod, SelfReportedStatus, Signal};
use tokio::time::Instant;

const WORKING_CONFIDENCE: f64 = 0.99;
const IDLE_CONFIDENCE: f64 = 0.01;

#[derive(Default)]
pub struct SelfReportScorer;

impl SelfReportScorer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Scorer for SelfReportScorer {
    fn name(&self) -> &'static str {
        "self_report"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::SelfReport
    }

    fn score(&mut self, signal: &Signal, _now: Instant) -> Option<DetectionEvent> {
        match signal {
            Signal::SelfReport(SelfReportedStatus::Working) => Some(DetectionEvent::positive(
                DetectionMethod::SelfReport,
                WORKING_CONFIDENCE,
                "sentinel reports working",
            )),
            Signal::SelfReport(SelfReportedStatus::Idle) => Some(DetectionEvent::negative(
                DetectionMethod::SelfReport,
                IDLE_CONFIDENCE,
                "sentinel reports idle",
            )),
            _ => None,
        }
    }
}

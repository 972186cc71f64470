//! Activity aggregator and watchdog
//!
//! The aggregator is the only writer of [`ActivityState`]. It turns scored
//! detection events into at most one transition each and owns the watchdog
//! deadline that forces a generation to end when signals stop arriving.

use super::config::WatchdogSettings;
use super::{
    ActivitySnapshot, ActivityStatus, DetectionEvent, DetectionMethod, Notification, Polarity,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Armed watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchdog {
    pub deadline: Instant,
    /// Method whose signal armed the current deadline
    pub method: DetectionMethod,
}

/// Mutable activity state, one per daemon
#[derive(Debug, Clone, Default)]
pub struct ActivityState {
    pub status: ActivityStatus,
    pub last_signal: Option<Instant>,
    pub watchdog: Option<Watchdog>,
}

/// Why a transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// A positive signal crossed the threshold
    Signal(DetectionMethod),
    /// The assistant reported itself idle
    ExplicitIdle,
    /// No qualifying signal before the deadline
    WatchdogExpired,
    /// Detection disabled or daemon shutting down
    Forced,
}

impl std::fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionReason::Signal(method) => write!(f, "{} signal", method),
            TransitionReason::ExplicitIdle => write!(f, "explicit idle report"),
            TransitionReason::WatchdogExpired => write!(f, "watchdog expired"),
            TransitionReason::Forced => write!(f, "forced"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub notification: Notification,
    pub reason: TransitionReason,
}

pub struct Aggregator {
    threshold: f64,
    self_report_timeout: Duration,
    heuristic_timeout: Duration,
    state: ActivityState,
    since: Option<DateTime<Utc>>,
    last_signal_at: Option<DateTime<Utc>>,
    last_method: Option<DetectionMethod>,
    last_confidence: Option<f64>,
    cycles: u64,
}

impl Aggregator {
    pub fn new(threshold: f64, watchdog: &WatchdogSettings) -> Self {
        Self {
            threshold,
            self_report_timeout: watchdog.self_report_timeout(),
            heuristic_timeout: watchdog.heuristic_timeout(),
            state: ActivityState::default(),
            since: None,
            last_signal_at: None,
            last_method: None,
            last_confidence: None,
            cycles: 0,
        }
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn is_generating(&self) -> bool {
        self.state.status == ActivityStatus::Generating
    }

    /// Current watchdog deadline, if a generation is in progress
    pub fn deadline(&self) -> Option<Instant> {
        self.state.watchdog.map(|w| w.deadline)
    }

    /// Apply new thresholds without touching the current state
    pub fn reconfigure(&mut self, threshold: f64, watchdog: &WatchdogSettings) {
        self.threshold = threshold;
        self.self_report_timeout = watchdog.self_report_timeout();
        self.heuristic_timeout = watchdog.heuristic_timeout();
    }

    /// Feed one detection event
    pub fn apply(&mut self, event: &DetectionEvent, now: Instant) -> Option<Transition> {
        self.last_signal_at = Some(event.timestamp);
        self.last_method = Some(event.method);
        self.last_confidence = Some(event.confidence);

        match event.polarity {
            Polarity::Negative => {
                if !self.is_generating() {
                    return None;
                }
                Some(self.end(TransitionReason::ExplicitIdle))
            }
            Polarity::Positive => {
                if event.confidence <= self.threshold {
                    debug!(
                        "{} below threshold ({:.2} <= {:.2}): {}",
                        event.method, event.confidence, self.threshold, event.descriptor
                    );
                    return None;
                }

                self.state.last_signal = Some(now);
                self.refresh_watchdog(event.method, now);

                if self.is_generating() {
                    debug!("Watchdog refreshed by {} ({:.2})", event.method, event.confidence);
                    return None;
                }

                self.state.status = ActivityStatus::Generating;
                self.since = Some(Utc::now());
                self.cycles += 1;
                info!(
                    "Generation started: {} ({:.2}) {}",
                    event.method, event.confidence, event.descriptor
                );
                Some(Transition {
                    notification: Notification::GenerationStarted,
                    reason: TransitionReason::Signal(event.method),
                })
            }
        }
    }

    /// End the generation if the watchdog deadline has passed
    pub fn expire(&mut self, now: Instant) -> Option<Transition> {
        match self.state.watchdog {
            Some(watchdog) if self.is_generating() && now >= watchdog.deadline => {
                Some(self.end(TransitionReason::WatchdogExpired))
            }
            _ => None,
        }
    }

    /// End any generation in progress regardless of signals
    pub fn force_idle(&mut self) -> Option<Transition> {
        if !self.is_generating() {
            return None;
        }
        Some(self.end(TransitionReason::Forced))
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            status: self.state.status,
            since: self.since,
            last_signal_at: self.last_signal_at,
            last_method: self.last_method,
            last_confidence: self.last_confidence,
            cycles: self.cycles,
        }
    }

    fn timeout_for(&self, method: DetectionMethod) -> Duration {
        if method.is_heuristic() {
            self.heuristic_timeout
        } else {
            self.self_report_timeout
        }
    }

    /// Re-arm the watchdog. An armed deadline is never shortened.
    fn refresh_watchdog(&mut self, method: DetectionMethod, now: Instant) {
        let deadline = now + self.timeout_for(method);
        match self.state.watchdog {
            Some(current) if current.deadline >= deadline => {}
            _ => self.state.watchdog = Some(Watchdog { deadline, method }),
        }
    }

    fn end(&mut self, reason: TransitionReason) -> Transition {
        self.state.status = ActivityStatus::Idle;
        self.state.watchdog = None;
        self.since = Some(Utc::now());
        info!("Generation ended: {}", reason);
        Transition {
            notification: Notification::GenerationEnded,
            reason,
        }
    }
}

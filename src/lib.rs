//! genwatch library
//!
//! Core components for detecting AI assistant generation activity from
//! editor signals.

pub mod aggregator;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod presenter;
pub mod scorers;
pub mod sentinel;
pub mod web;

pub use error::{Error, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the assistant is currently believed to be generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[default]
    Idle,
    Generating,
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityStatus::Idle => write!(f, "idle"),
            ActivityStatus::Generating => write!(f, "generating"),
        }
    }
}

/// Detection methods that can produce a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Size and cadence of text edits
    DocumentChange,
    /// Unusually large selections
    SelectionChange,
    /// Editor focus flapping
    FocusChange,
    /// Status written by the assistant into the sentinel file
    SelfReport,
}

impl DetectionMethod {
    /// Heuristic methods are re-armed with the short watchdog timeout
    pub fn is_heuristic(&self) -> bool {
        !matches!(self, DetectionMethod::SelfReport)
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::DocumentChange => write!(f, "document_change"),
            DetectionMethod::SelectionChange => write!(f, "selection_change"),
            DetectionMethod::FocusChange => write!(f, "focus_change"),
            DetectionMethod::SelfReport => write!(f, "self_report"),
        }
    }
}

/// Direction of the evidence carried by a detection event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Evidence that the assistant is working
    Positive,
    /// Explicit statement that the assistant is idle
    Negative,
}

/// A scored observation, consumed immediately by the aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Scorer that produced the event
    pub method: DetectionMethod,
    /// Wall-clock time of the observation
    pub timestamp: DateTime<Utc>,
    /// Likelihood in [0, 1] that the event was AI driven
    pub confidence: f64,
    pub polarity: Polarity,
    /// Short description of the raw payload, for logs
    pub descriptor: String,
}

impl DetectionEvent {
    pub fn positive(
        method: DetectionMethod,
        confidence: f64,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            method,
            timestamp: Utc::now(),
            confidence: confidence.clamp(0.0, 1.0),
            polarity: Polarity::Positive,
            descriptor: descriptor.into(),
        }
    }

    pub fn negative(
        method: DetectionMethod,
        confidence: f64,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            polarity: Polarity::Negative,
            ..Self::positive(method, confidence, descriptor)
        }
    }
}

/// Tri-state flag stored in the sentinel file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfReportedStatus {
    Working,
    Idle,
    Absent,
}

impl SelfReportedStatus {
    /// Parse sentinel file content. Returns `None` for malformed content.
    pub fn parse(content: &str) -> Option<Self> {
        match content.trim().to_ascii_lowercase().as_str() {
            "true" | "working" => Some(SelfReportedStatus::Working),
            "false" | "idle" => Some(SelfReportedStatus::Idle),
            _ => None,
        }
    }

    /// Content written to the sentinel file for this status
    pub fn as_file_content(&self) -> &'static str {
        match self {
            SelfReportedStatus::Working => "true",
            SelfReportedStatus::Idle | SelfReportedStatus::Absent => "false",
        }
    }
}

impl std::fmt::Display for SelfReportedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelfReportedStatus::Working => write!(f, "working"),
            SelfReportedStatus::Idle => write!(f, "idle"),
            SelfReportedStatus::Absent => write!(f, "absent"),
        }
    }
}

impl std::str::FromStr for SelfReportedStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

/// Raw event forwarded by the editor host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// Text was inserted or removed in a document
    DocumentChange {
        uri: String,
        #[serde(default)]
        inserted: usize,
        #[serde(default)]
        removed: usize,
    },
    /// The primary selection changed
    SelectionChange {
        uri: String,
        #[serde(default)]
        selected: usize,
    },
    /// The editor window gained or lost focus
    FocusChange { focused: bool },
    /// User settings changed and should be reloaded
    ConfigurationChanged,
    /// The host cannot deliver some event sources
    Capabilities {
        #[serde(default)]
        unsupported: Vec<DetectionMethod>,
    },
}

/// Input to a scorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Editor(EditorEvent),
    SelfReport(SelfReportedStatus),
}

/// Notification sent to presentation consumers, once per transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Notification {
    #[serde(rename = "generationStarted")]
    GenerationStarted,
    #[serde(rename = "generationEnded")]
    GenerationEnded,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::GenerationStarted => write!(f, "generationStarted"),
            Notification::GenerationEnded => write!(f, "generationEnded"),
        }
    }
}

/// Read-only view of the activity state, published after every input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ActivitySnapshot {
    pub status: ActivityStatus,
    /// When the current status was entered
    pub since: Option<DateTime<Utc>>,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub last_method: Option<DetectionMethod>,
    pub last_confidence: Option<f64>,
    /// Completed and in-progress generation cycles
    pub cycles: u64,
}

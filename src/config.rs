//! Daemon settings
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `GENWATCH__*` environment variables (e.g. `GENWATCH__WATCHDOG__HEURISTIC_MS`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch for detection
    pub enabled: bool,
    /// Confidence a positive event must exceed to start a generation
    pub confidence_threshold: f64,
    /// Delay before consumers are told a generation started
    pub show_delay_ms: u64,
    pub watchdog: WatchdogSettings,
    pub sentinel: SentinelSettings,
    pub scorers: ScorerSettings,
    pub presenters: PresenterSettings,
    pub web: WebSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    /// Idle interval after a self-reported working signal
    pub self_report_ms: u64,
    /// Idle interval after a heuristic signal
    pub heuristic_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelSettings {
    /// Status file, relative paths resolve against the workspace
    pub path: PathBuf,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScorerSettings {
    pub document: DocumentScorerSettings,
    pub selection: SelectionScorerSettings,
    pub focus: FocusScorerSettings,
    pub self_report: SelfReportScorerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentScorerSettings {
    pub enabled: bool,
    /// Edits smaller than this are treated as typing
    pub min_chars: usize,
    /// Edit size at which the size factor saturates
    pub large_edit_chars: usize,
    /// Gaps at or below this count as machine speed
    pub fast_gap_ms: u64,
    /// Gaps at or above this get no speed bonus
    pub slow_gap_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionScorerSettings {
    pub enabled: bool,
    pub min_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusScorerSettings {
    pub enabled: bool,
    pub flap_window_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfReportScorerSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterSettings {
    /// Write notifications as JSON lines on stdout
    pub stdout: bool,
    /// POST notifications to this URL
    pub hook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: 0.5,
            show_delay_ms: 0,
            watchdog: WatchdogSettings::default(),
            sentinel: SentinelSettings::default(),
            scorers: ScorerSettings::default(),
            presenters: PresenterSettings::default(),
            web: WebSettings::default(),
        }
    }
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            self_report_ms: 60_000,
            heuristic_ms: 5_000,
        }
    }
}

impl Default for SentinelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".genwatch/status"),
            debounce_ms: 100,
        }
    }
}

impl Default for DocumentScorerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_chars: 10,
            large_edit_chars: 100,
            fast_gap_ms: 500,
            slow_gap_ms: 2_000,
        }
    }
}

impl Default for SelectionScorerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_chars: 50,
        }
    }
}

impl Default for FocusScorerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            flap_window_ms: 1_000,
        }
    }
}

impl Default for SelfReportScorerSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for PresenterSettings {
    fn default() -> Self {
        Self {
            stdout: true,
            hook_url: None,
        }
    }
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8381,
        }
    }
}

impl WatchdogSettings {
    pub fn self_report_timeout(&self) -> Duration {
        Duration::from_millis(self.self_report_ms)
    }

    pub fn heuristic_timeout(&self) -> Duration {
        Duration::from_millis(self.heuristic_ms)
    }
}

fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix("GENWATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load settings from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(env);

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("genwatch").join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.watchdog.self_report_ms == 0 || self.watchdog.heuristic_ms == 0 {
            return Err(Error::Config(
                "watchdog timeouts must be non-zero".to_string(),
            ));
        }
        let doc = &self.scorers.document;
        if doc.large_edit_chars == 0 {
            return Err(Error::Config(
                "scorers.document.large_edit_chars must be non-zero".to_string(),
            ));
        }
        if doc.slow_gap_ms <= doc.fast_gap_ms {
            return Err(Error::Config(
                "scorers.document.slow_gap_ms must be greater than fast_gap_ms".to_string(),
            ));
        }
        if self.scorers.selection.min_chars == 0 {
            return Err(Error::Config(
                "scorers.selection.min_chars must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the sentinel file against a workspace root
    pub fn sentinel_path(&self, workspace: &Path) -> PathBuf {
        if self.sentinel.path.is_absolute() {
            self.sentinel.path.clone()
        } else {
            workspace.join(&self.sentinel.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.confidence_threshold, 0.5);
        assert_eq!(settings.watchdog.self_report_timeout(), Duration::from_secs(60));
        assert_eq!(settings.watchdog.heuristic_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_yaml_overrides() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "confidence_threshold: 0.7\n\
             watchdog:\n  heuristic_ms: 3000\n\
             scorers:\n  focus:\n    enabled: false"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.confidence_threshold, 0.7);
        assert_eq!(settings.watchdog.heuristic_ms, 3000);
        assert_eq!(settings.watchdog.self_report_ms, 60_000);
        assert!(!settings.scorers.focus.enabled);
        assert!(settings.scorers.document.enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "watchdog:\n  heuristic_ms: 3000\nshow_delay_ms: 100").unwrap();

        let env = environment().source(Some(
            [
                ("GENWATCH__WATCHDOG__HEURISTIC_MS", "7000"),
                ("GENWATCH__PRESENTERS__HOOK_URL", "http://127.0.0.1:9000/game"),
                ("GENWATCH__ENABLED", "false"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ));
        let settings = Settings::load_with_env(Some(file.path()), env).unwrap();

        assert_eq!(settings.watchdog.heuristic_ms, 7000);
        assert_eq!(settings.show_delay_ms, 100);
        assert_eq!(
            settings.presenters.hook_url.as_deref(),
            Some("http://127.0.0.1:9000/game")
        );
        assert!(!settings.enabled);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("nope.yaml"))).unwrap();
        assert_eq!(settings.web.port, 8381);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let settings = Settings {
            confidence_threshold: 1.5,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_sentinel_path_resolution() {
        let settings = Settings::default();
        assert_eq!(
            settings.sentinel_path(Path::new("/work")),
            PathBuf::from("/work/.genwatch/status")
        );
    }
}

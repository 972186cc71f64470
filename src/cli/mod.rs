//! CLI command handlers

pub mod config;
pub mod init;
pub mod report;
pub mod score;
pub mod start;
pub mod status;
pub mod stop;

use genwatch::config::Settings;
use genwatch::sentinel::SentinelFile;
use std::path::PathBuf;

/// Resolved global options shared by every command
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub workspace: PathBuf,
    pub settings: Settings,
}

impl Context {
    pub fn new(config: Option<PathBuf>, workspace: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = config.or_else(Settings::default_path);
        let settings = Settings::load(config_path.as_deref())?;
        let workspace = match workspace {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        Ok(Self {
            config_path,
            workspace,
            settings,
        })
    }

    pub fn sentinel(&self) -> SentinelFile {
        SentinelFile::new(self.settings.sentinel_path(&self.workspace))
    }
}

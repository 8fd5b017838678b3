//! Configuration file
//!
//! TOML with `[producer]`, `[consumer]` and `[log]` sections. Every field
//! has a default, so a missing file or section is valid.

use anyhow::{bail, Context, Result};
use delivery::ProducerOptions;
use fwatch_core::{path, ProjectWatchConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::WatchOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FwatchConfig {
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Consumer base URL
    pub server_url: String,

    /// Holds the snapshot database; `~` expands to the home directory
    pub state_dir: Option<String>,

    pub poll_interval_ms: u64,
    pub hint_quiet_period_ms: u64,
    pub retry_interval_ms: u64,
    pub use_native_hints: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9090".to_string(),
            state_dir: None,
            poll_interval_ms: 2000,
            hint_quiet_period_ms: 1000,
            retry_interval_ms: 100,
            use_native_hints: true,
        }
    }
}

impl ProducerConfig {
    /// Configured state directory, or `<data dir>/fwatch`
    pub fn state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => expand_home(dir),
            None => dirs::data_local_dir()
                .map(|d| d.join("fwatch"))
                .unwrap_or_else(|| PathBuf::from(".fwatch")),
        }
    }

    pub fn options(&self) -> ProducerOptions {
        let mut options = ProducerOptions::new(self.server_url.clone());
        options.retry_interval = Duration::from_millis(self.retry_interval_ms);
        options.watch = WatchOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            hint_quiet_period: Duration::from_millis(self.hint_quiet_period_ms),
            use_native_hints: self.use_native_hints,
        };
        options
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub bind: String,

    /// Registered when the consumer starts
    pub projects: Vec<SeedProject>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9090".to_string(),
            projects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedProject {
    pub project_id: String,

    /// Native or canonical root path
    pub local_root: String,

    #[serde(default)]
    pub ignored_paths: Vec<String>,

    #[serde(default)]
    pub ignored_filenames: Vec<String>,
}

impl SeedProject {
    pub fn to_watch_config(&self) -> ProjectWatchConfig {
        ProjectWatchConfig::new(self.project_id.clone(), path::normalize(&self.local_root).as_str())
            .with_ignored_paths(self.ignored_paths.clone())
            .with_ignored_filenames(self.ignored_filenames.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Also write a daily rolling log file here
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl FwatchConfig {
    pub fn validate(&self) -> Result<()> {
        let producer = &self.producer;
        if !(producer.server_url.starts_with("http://") || producer.server_url.starts_with("https://")) {
            bail!("producer.server_url must be an http(s) URL, got '{}'", producer.server_url);
        }
        if producer.poll_interval_ms == 0 {
            bail!("producer.poll_interval_ms must be greater than 0");
        }
        if producer.retry_interval_ms == 0 {
            bail!("producer.retry_interval_ms must be greater than 0");
        }
        for seed in &self.consumer.projects {
            seed.to_watch_config()
                .validate()
                .with_context(|| format!("Invalid consumer project '{}'", seed.project_id))?;
        }
        Ok(())
    }
}

/// Default location: `<config dir>/fwatch/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fwatch").join("config.toml"))
}

pub fn parse(text: &str) -> Result<FwatchConfig> {
    let config: FwatchConfig = toml::from_str(text).context("Failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

/// Load an explicit file, or the default file if it exists
pub fn load(explicit: Option<&Path>) -> Result<FwatchConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FwatchConfig::default()),
        },
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

fn expand_home(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(dir)
}

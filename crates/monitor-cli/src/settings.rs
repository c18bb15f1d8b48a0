//! Layered runner settings
//!
//! Defaults, then an optional TOML file, then `DMS__*` environment
//! variables (`DMS__SESSION__ALERTS__EAR_THRESHOLD=0.2`).

use config::{Config, ConfigError, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DMS";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub log_format: LogFormat,
    pub log_level: String,

    /// Directory session files are written to
    pub log_dir: PathBuf,

    /// Session file name without extension; timestamped when unset
    pub session_name: Option<String>,

    /// Frame spacing assumed for frames without `t_ms`
    pub frame_interval_ms: u64,

    /// Flush the event log every N frames (0 = only at stop)
    pub flush_every: u64,

    /// Label unlabelled frames with the rule-based classifier
    pub rule_classifier: bool,

    pub session: DmsConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            session_name: None,
            frame_interval_ms: 33,
            flush_every: 30,
            rule_classifier: true,
            session: DmsConfig::default(),
        }
    }
}

/// Load settings from an optional file plus the environment
pub fn load_settings(path: Option<&Path>) -> Result<MonitorSettings, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

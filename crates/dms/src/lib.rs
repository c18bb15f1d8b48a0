//! Driver Monitoring System (DMS)
//!
//! Per-subject monitoring session on top of the landmark stage:
//! - EAR / MAR smoothing and PERCLOS
//! - Optional classifier with supermajority label stabilization
//! - Alert state machine, event log and session boundaries

pub mod classifier;
pub mod config;
pub mod frame;
pub mod session;

pub use classifier::{Classifier, ClassifierError, FeatureVector, RuleClassifier, RuleConfig};
pub use config::DmsConfig;
pub use frame::RawFrame;
pub use session::{FrameOutcome, MonitorSession, SessionReport};

use alerting::{ConfigError, SinkError};
use signal_window::WindowError;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window configuration error: {0}")]
    Window(#[from] WindowError),

    #[error("Log delivery failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,
}

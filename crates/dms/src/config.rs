//! DMS configuration

use alerting::AlertConfig;
use serde::{Deserialize, Serialize};
use signal_window::{
    DEFAULT_PERCLOS_EAR_THRESHOLD, DEFAULT_PERCLOS_WINDOW, DEFAULT_SMOOTHING_CAPACITY,
    DEFAULT_STABILITY_RATIO, DEFAULT_STATE_WINDOW,
};

use crate::classifier::RuleConfig;

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Identifier reported with system ON/OFF notices
    pub device_id: String,

    /// EAR / MAR running-mean window (frames)
    pub smoothing_window: usize,

    /// Classifier label window (frames)
    pub state_window: usize,

    /// Share of the label window the dominant label needs
    pub stability_ratio: f64,

    /// PERCLOS window (frames)
    pub perclos_window: usize,

    /// Smoothed EAR below this counts as closed for PERCLOS
    pub perclos_ear_threshold: f64,

    /// Alert thresholds and timing
    pub alerts: AlertConfig,

    /// Rule-based fallback classifier thresholds
    pub rules: RuleConfig,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            device_id: "ADAMS-001".to_string(),
            smoothing_window: DEFAULT_SMOOTHING_CAPACITY,
            state_window: DEFAULT_STATE_WINDOW,
            stability_ratio: DEFAULT_STABILITY_RATIO,
            perclos_window: DEFAULT_PERCLOS_WINDOW,
            perclos_ear_threshold: DEFAULT_PERCLOS_EAR_THRESHOLD,
            alerts: AlertConfig::default(),
            rules: RuleConfig::default(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (faster reaction, less smoothing)
    pub fn strict() -> Self {
        Self {
            smoothing_window: 3,
            state_window: 20,
            alerts: AlertConfig::strict(),
            ..Default::default()
        }
    }

    /// Create lenient config (more smoothing, longer debounce)
    pub fn lenient() -> Self {
        Self {
            smoothing_window: 8,
            state_window: 45,
            stability_ratio: 0.7,
            alerts: AlertConfig::lenient(),
            ..Default::default()
        }
    }
}

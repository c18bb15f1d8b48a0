//! Alert thresholds and timing

use crate::error::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// EAR below this counts as eyes closed (default: 0.18)
    pub ear_threshold: f64,
    /// Eyes must stay closed this long before alerting (milliseconds)
    pub closed_duration_ms: u64,

    /// MAR above this counts as mouth wide open (default: 0.5)
    pub mar_threshold: f64,
    /// Mouth must stay open this long to count as a yawn (milliseconds)
    pub yawn_duration_ms: u64,
    /// Minimum gap between logged yawns (milliseconds)
    pub info_cooldown_ms: u64,

    /// Minimum gap between drowsiness alerts (milliseconds)
    pub drowsy_cooldown_ms: u64,
    /// Distracted label must persist this long before alerting (milliseconds)
    pub distracted_min_duration_ms: u64,

    /// Hands off the wheel longer than this raises an alert (milliseconds)
    pub hands_off_duration_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.18,
            closed_duration_ms: 2000,
            mar_threshold: 0.5,
            yawn_duration_ms: 1500,
            info_cooldown_ms: 15_000,
            drowsy_cooldown_ms: 15_000,
            distracted_min_duration_ms: 2000,
            hands_off_duration_ms: 5000,
        }
    }
}

impl AlertConfig {
    /// Create strict config (shorter debounce windows)
    pub fn strict() -> Self {
        Self {
            closed_duration_ms: 1500,
            distracted_min_duration_ms: 1500,
            hands_off_duration_ms: 3000,
            ..Default::default()
        }
    }

    /// Create lenient config (longer debounce windows)
    pub fn lenient() -> Self {
        Self {
            closed_duration_ms: 2500,
            distracted_min_duration_ms: 3000,
            hands_off_duration_ms: 8000,
            ..Default::default()
        }
    }

    /// Reject values that could never behave sensibly
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("ear_threshold", self.ear_threshold)?;
        check_threshold("mar_threshold", self.mar_threshold)?;
        self.durations().map(|_| ())
    }

    /// Timing values as chrono deltas
    pub(crate) fn durations(&self) -> Result<Durations, ConfigError> {
        Ok(Durations {
            closed: to_delta("closed_duration_ms", self.closed_duration_ms)?,
            yawn: to_delta("yawn_duration_ms", self.yawn_duration_ms)?,
            info_cooldown: to_delta("info_cooldown_ms", self.info_cooldown_ms)?,
            drowsy_cooldown: to_delta("drowsy_cooldown_ms", self.drowsy_cooldown_ms)?,
            distracted_min: to_delta("distracted_min_duration_ms", self.distracted_min_duration_ms)?,
            hands_off: to_delta("hands_off_duration_ms", self.hands_off_duration_ms)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Durations {
    pub closed: TimeDelta,
    pub yawn: TimeDelta,
    pub info_cooldown: TimeDelta,
    pub drowsy_cooldown: TimeDelta,
    pub distracted_min: TimeDelta,
    pub hands_off: TimeDelta,
}

fn check_threshold(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { field, value })
    }
}

fn to_delta(field: &'static str, value_ms: u64) -> Result<TimeDelta, ConfigError> {
    i64::try_from(value_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .ok_or(ConfigError::DurationOutOfRange { field, value_ms })
}

//! Driver state, alert categories and per-frame metrics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse driver state, also the classifier's label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    #[default]
    Normal,
    Drowsy,
    Distracted,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Drowsy => "drowsy",
            Self::Distracted => "distracted",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown label text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown driver state label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for DriverState {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "drowsy" => Ok(Self::Drowsy),
            "distracted" => Ok(Self::Distracted),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Alert categories, each with independent timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// Eyes closed past the allowed duration
    EyesClosed,
    /// Sustained wide-open mouth (informational)
    Yawn,
    /// Classifier reports drowsiness
    Drowsy,
    /// Classifier reports distraction for longer than the debounce
    Distracted,
    /// No hand on the steering wheel
    HandsOff,
}

impl AlertCategory {
    pub const COUNT: usize = 5;

    pub const ALL: [AlertCategory; Self::COUNT] = [
        Self::EyesClosed,
        Self::Yawn,
        Self::Drowsy,
        Self::Distracted,
        Self::HandsOff,
    ];

    /// Slot in a [`crate::CategoryTable`]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EyesClosed => "eyes_closed",
            Self::Yawn => "yawn",
            Self::Drowsy => "drowsy",
            Self::Distracted => "distracted",
            Self::HandsOff => "hands_off",
        }
    }

    /// Event name logged when the alert fires
    pub fn activated_event(&self) -> &'static str {
        match self {
            Self::EyesClosed => "Eyes closed for too long",
            Self::Yawn => "Yawn",
            Self::Drowsy => "Drowsiness",
            Self::Distracted => "Distraction",
            Self::HandsOff => "Hands off steering >5s",
        }
    }

    /// Event name logged when the alert clears. Yawns are momentary and have none.
    pub fn recovered_event(&self) -> Option<&'static str> {
        match self {
            Self::EyesClosed => Some("Eyes reopened"),
            Self::Yawn => None,
            Self::Drowsy => Some("Recovered from drowsiness"),
            Self::Distracted => Some("Recovered from distraction"),
            Self::HandsOff => Some("Hand returned to steering wheel"),
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame's measurements from the landmark source
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// Eye-aspect ratio (lower = more closed)
    pub ear: f64,
    /// Mouth-aspect ratio (higher = more open)
    pub mar: f64,
    /// Percentage of eye closure in [0, 1]
    pub perclos: f64,
    /// Head pitch in degrees
    pub pitch: f64,
    /// Head yaw in degrees
    pub yaw: f64,
    /// Head roll in degrees
    pub roll: f64,
}

impl FrameMetrics {
    pub fn new(ear: f64, mar: f64, perclos: f64, pitch: f64, yaw: f64, roll: f64) -> Self {
        Self {
            ear,
            mar,
            perclos,
            pitch,
            yaw,
            roll,
        }
    }
}

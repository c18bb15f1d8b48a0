//! Per-frame input

use alerting::DriverState;
use serde::{Deserialize, Serialize};

/// One frame of upstream measurements, as produced by the landmark stage or
/// read back from a recording (one JSON object per line).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFrame {
    /// Raw eye-aspect ratio
    pub ear: f64,
    /// Raw mouth-aspect ratio
    pub mar: f64,
    /// Source-supplied PERCLOS; the session tracker is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perclos: Option<f64>,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    /// Raw classifier label, if the source already ran a model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<DriverState>,
    /// Steering-wheel grip sensor reading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_on_wheel: Option<bool>,
    /// Capture offset from the start of the recording, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_ms: Option<u64>,
}

impl RawFrame {
    pub fn new(ear: f64, mar: f64) -> Self {
        Self {
            ear,
            mar,
            ..Default::default()
        }
    }

    pub fn with_pose(mut self, pitch: f64, yaw: f64, roll: f64) -> Self {
        self.pitch = pitch;
        self.yaw = yaw;
        self.roll = roll;
        self
    }

    pub fn with_label(mut self, label: DriverState) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_grip(mut self, hand_on_wheel: bool) -> Self {
        self.hand_on_wheel = Some(hand_on_wheel);
        self
    }

    pub fn with_perclos(mut self, perclos: f64) -> Self {
        self.perclos = Some(perclos);
        self
    }
}

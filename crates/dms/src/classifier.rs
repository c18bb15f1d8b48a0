//! Classifier seam
//!
//! The trained model lives outside this crate. Anything that maps a feature
//! vector to a [`DriverState`] can be plugged into a session; the rule-based
//! classifier covers hosts that have no model loaded.

use alerting::{DriverState, FrameMetrics};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classifier failures. Sessions log these and treat the frame as unlabelled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Feature {0} is not finite")]
    InvalidFeature(&'static str),
}

/// Model input: `[ear, mar, perclos, pitch, yaw, roll]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub ear: f64,
    pub mar: f64,
    pub perclos: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl FeatureVector {
    pub const NAMES: [&'static str; 6] = ["ear", "mar", "perclos", "pitch", "yaw", "roll"];

    /// Values in model column order
    pub fn to_array(&self) -> [f64; 6] {
        [self.ear, self.mar, self.perclos, self.pitch, self.yaw, self.roll]
    }

    /// First non-finite feature, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .zip(self.to_array())
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| *name)
    }
}

impl From<&FrameMetrics> for FeatureVector {
    fn from(m: &FrameMetrics) -> Self {
        Self {
            ear: m.ear,
            mar: m.mar,
            perclos: m.perclos,
            pitch: m.pitch,
            yaw: m.yaw,
            roll: m.roll,
        }
    }
}

/// Per-frame driver state classifier
pub trait Classifier {
    fn classify(&mut self, features: &FeatureVector) -> Result<DriverState, ClassifierError>;
}

impl<T: Classifier + ?Sized> Classifier for Box<T> {
    fn classify(&mut self, features: &FeatureVector) -> Result<DriverState, ClassifierError> {
        (**self).classify(features)
    }
}

/// Thresholds for [`RuleClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// PERCLOS at or above this is drowsy
    pub perclos_drowsy: f64,
    /// Head yaw beyond this (degrees, either side) is distracted
    pub yaw_limit_degrees: f64,
    /// Head pitch beyond this (degrees, either side) is distracted
    pub pitch_limit_degrees: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            perclos_drowsy: 0.30,
            yaw_limit_degrees: 30.0,
            pitch_limit_degrees: 30.0,
        }
    }
}

/// Rule-based fallback when no trained model is available
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    config: RuleConfig,
}

impl RuleClassifier {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }
}

impl Classifier for RuleClassifier {
    fn classify(&mut self, features: &FeatureVector) -> Result<DriverState, ClassifierError> {
        if let Some(name) = features.first_non_finite() {
            return Err(ClassifierError::InvalidFeature(name));
        }

        // Drowsiness outranks head pose
        if features.perclos >= self.config.perclos_drowsy {
            return Ok(DriverState::Drowsy);
        }

        let looking_forward = features.yaw.abs() <= self.config.yaw_limit_degrees
            && features.pitch.abs() <= self.config.pitch_limit_degrees;
        if looking_forward {
            Ok(DriverState::Normal)
        } else {
            Ok(DriverState::Distracted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(perclos: f64, pitch: f64, yaw: f64) -> FeatureVector {
        FeatureVector::from(&FrameMetrics::new(0.3, 0.2, perclos, pitch, yaw, 0.0))
    }

    #[test]
    fn test_rules() {
        let mut classifier = RuleClassifier::default();
        assert_eq!(classifier.classify(&features(0.05, 0.0, 0.0)), Ok(DriverState::Normal));
        assert_eq!(classifier.classify(&features(0.35, 0.0, 40.0)), Ok(DriverState::Drowsy));
        assert_eq!(classifier.classify(&features(0.05, 0.0, -45.0)), Ok(DriverState::Distracted));
        assert_eq!(classifier.classify(&features(0.05, 31.0, 0.0)), Ok(DriverState::Distracted));
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let mut classifier = RuleClassifier::default();
        assert_eq!(
            classifier.classify(&features(0.05, f64::NAN, 0.0)),
            Err(ClassifierError::InvalidFeature("pitch"))
        );
    }

    #[test]
    fn test_column_order() {
        let fv = FeatureVector::from(&FrameMetrics::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(fv.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}

//! Actuation sink (buzzer / vibration motor)

use crate::error::ActuationError;
use crate::state::AlertCategory;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Buzzer / vibration pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// One short pulse; re-sent every frame for a continuous effect
    Pulse,
    /// Three quick pulses
    TriplePulse,
}

impl Pattern {
    pub fn pulses(&self) -> u8 {
        match self {
            Pattern::Pulse => 1,
            Pattern::TriplePulse => 3,
        }
    }
}

/// Receives actuation triggers. Calls must return promptly; the machine
/// never waits for or retries a trigger.
pub trait Actuator {
    fn trigger(&mut self, category: AlertCategory, pattern: Pattern) -> Result<(), ActuationError>;
}

/// Actuator for hosts without hardware: traces each trigger
#[derive(Debug, Clone, Copy, Default)]
pub struct LogActuator;

impl Actuator for LogActuator {
    fn trigger(&mut self, category: AlertCategory, pattern: Pattern) -> Result<(), ActuationError> {
        debug!("[BEEP] {} x{}", category, pattern.pulses());
        Ok(())
    }
}

/// Keeps every trigger in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    pub triggers: Vec<(AlertCategory, Pattern)>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers issued for one category
    pub fn count(&self, category: AlertCategory) -> usize {
        self.triggers.iter().filter(|(c, _)| *c == category).count()
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
    }
}

impl Actuator for RecordingActuator {
    fn trigger(&mut self, category: AlertCategory, pattern: Pattern) -> Result<(), ActuationError> {
        self.triggers.push((category, pattern));
        Ok(())
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn trigger(&mut self, category: AlertCategory, pattern: Pattern) -> Result<(), ActuationError> {
        (**self).trigger(category, pattern)
    }
}

//! Alert State Machine
//!
//! Evaluated once per frame. Each category keeps its own debounce timer:
//! - EyesClosed / Yawn / HandsOff from raw per-frame conditions
//! - Drowsy / Distracted from the stabilized classifier label
//!
//! Every activation and every recovery produces exactly one log entry, no
//! matter how many frames the condition persists.

use crate::actuator::{Actuator, LogActuator, Pattern};
use crate::clock::{Clock, SystemClock};
use crate::config::{AlertConfig, Durations};
use crate::error::ConfigError;
use crate::log::{EventLog, Flush, MetricsSnapshot};
use crate::state::{AlertCategory, DriverState, FrameMetrics};
use crate::timer::{CategoryTable, CategoryTimer};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Everything the machine sees for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observation {
    /// Smoothed EAR/MAR plus PERCLOS and head pose
    pub metrics: FrameMetrics,
    /// Stabilized classifier label; `None` when no classifier output exists
    pub label: Option<DriverState>,
    /// Steering-wheel grip; `None` when the sensor is unavailable
    pub hand_on_wheel: Option<bool>,
}

impl Observation {
    pub fn new(metrics: FrameMetrics) -> Self {
        Self {
            metrics,
            label: None,
            hand_on_wheel: None,
        }
    }

    pub fn with_label(mut self, label: DriverState) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_grip(mut self, hand_on_wheel: bool) -> Self {
        self.hand_on_wheel = Some(hand_on_wheel);
        self
    }
}

/// Per-session alert state machine
pub struct AlertMachine<C = SystemClock, A = LogActuator> {
    config: AlertConfig,
    durations: Durations,
    timers: CategoryTable,
    driver_state: DriverState,
    log: EventLog,
    clock: C,
    actuator: A,
}

impl AlertMachine {
    /// Machine on the wall clock with a tracing-only actuator
    pub fn with_defaults(config: AlertConfig) -> Result<Self, ConfigError> {
        Self::new(config, SystemClock, LogActuator)
    }
}

impl<C: Clock, A: Actuator> AlertMachine<C, A> {
    /// Create a machine; invalid thresholds are rejected here
    pub fn new(config: AlertConfig, clock: C, actuator: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let durations = config.durations()?;
        info!("Creating alert machine with config: {:?}", config);
        Ok(Self {
            config,
            durations,
            timers: CategoryTable::default(),
            driver_state: DriverState::Normal,
            log: EventLog::new(),
            clock,
            actuator,
        })
    }

    /// Evaluate one frame and return the current coarse driver state
    pub fn update(&mut self, observation: &Observation) -> DriverState {
        let now = self.clock.now();
        let snapshot = MetricsSnapshot::capture(&observation.metrics);

        if let Some(hand_on_wheel) = observation.hand_on_wheel {
            self.check_grip(now, hand_on_wheel, &snapshot);
        }
        self.check_eyes_closed(now, observation.metrics.ear, &snapshot);
        self.check_yawn(now, observation.metrics.mar, &snapshot);
        if let Some(label) = observation.label {
            self.apply_label(now, label, &snapshot);
        }

        self.driver_state
    }

    fn check_eyes_closed(&mut self, now: DateTime<Utc>, ear: f64, snapshot: &MetricsSnapshot) {
        let category = AlertCategory::EyesClosed;
        let limit = self.durations.closed;
        let timer = &mut self.timers[category];

        if ear < self.config.ear_threshold {
            let sustained = timer.hold(now).is_some_and(|held| held >= limit);
            if !sustained {
                return;
            }
            if timer.activate() {
                self.activated(now, category, snapshot);
            }
            self.actuate(category, Pattern::Pulse);
        } else {
            let recovered = timer.deactivate();
            timer.release();
            if recovered {
                self.recovered(now, category, snapshot);
            }
        }
    }

    fn check_yawn(&mut self, now: DateTime<Utc>, mar: f64, snapshot: &MetricsSnapshot) {
        let category = AlertCategory::Yawn;
        let limit = self.durations.yawn;
        let cooldown = self.durations.info_cooldown;
        let timer = &mut self.timers[category];

        if mar > self.config.mar_threshold {
            let sustained = timer.hold(now).is_some_and(|held| held >= limit);
            if sustained && timer.cooled_down(now, cooldown) {
                timer.mark_triggered(now);
                self.activated(now, category, snapshot);
            }
        } else {
            timer.release();
        }
    }

    fn check_grip(&mut self, now: DateTime<Utc>, hand_on_wheel: bool, snapshot: &MetricsSnapshot) {
        let category = AlertCategory::HandsOff;
        let limit = self.durations.hands_off;
        let timer = &mut self.timers[category];

        if hand_on_wheel {
            let recovered = timer.deactivate();
            timer.release();
            if recovered {
                self.recovered(now, category, snapshot);
            }
        } else {
            let sustained = timer.hold(now).is_some_and(|held| held > limit);
            if !sustained {
                return;
            }
            if timer.activate() {
                self.activated(now, category, snapshot);
            }
            self.actuate(category, Pattern::Pulse);
        }
    }

    fn apply_label(&mut self, now: DateTime<Utc>, label: DriverState, snapshot: &MetricsSnapshot) {
        match label {
            DriverState::Drowsy => {
                let cooldown = self.durations.drowsy_cooldown;
                let timer = &mut self.timers[AlertCategory::Drowsy];
                if !timer.active && timer.cooled_down(now, cooldown) {
                    timer.activate();
                    timer.mark_triggered(now);
                    self.driver_state = DriverState::Drowsy;
                    self.activated(now, AlertCategory::Drowsy, snapshot);
                    self.log.log_state(now, DriverState::Drowsy, true);
                    self.actuate(AlertCategory::Drowsy, Pattern::TriplePulse);
                }
                // Drowsiness cancels any distraction debounce in progress
                self.timers[AlertCategory::Distracted].release();
            }
            DriverState::Distracted => {
                let limit = self.durations.distracted_min;
                let timer = &mut self.timers[AlertCategory::Distracted];
                let sustained = timer.hold(now).is_some_and(|held| held >= limit);
                if !sustained {
                    return;
                }
                if timer.activate() {
                    self.driver_state = DriverState::Distracted;
                    self.activated(now, AlertCategory::Distracted, snapshot);
                    self.log.log_state(now, DriverState::Distracted, true);
                }
                self.actuate(AlertCategory::Distracted, Pattern::Pulse);
            }
            DriverState::Normal => {
                let distracted = &mut self.timers[AlertCategory::Distracted];
                distracted.release();
                let was_distracted = distracted.deactivate();
                let was_drowsy = self.timers[AlertCategory::Drowsy].deactivate();

                if was_distracted || was_drowsy {
                    self.driver_state = DriverState::Normal;
                }
                if was_distracted {
                    self.recovered(now, AlertCategory::Distracted, snapshot);
                    self.log.log_state(now, DriverState::Normal, true);
                }
                if was_drowsy {
                    self.recovered(now, AlertCategory::Drowsy, snapshot);
                    self.log.log_state(now, DriverState::Normal, true);
                }
            }
        }
    }

    fn activated(&mut self, now: DateTime<Utc>, category: AlertCategory, snapshot: &MetricsSnapshot) {
        let event = category.activated_event();
        info!("[ALERT] {} ({})", event, self.driver_state);
        metrics::counter!("dms_alerts_total", "category" => category.as_str()).increment(1);
        self.log.log_event(now, event, self.driver_state, *snapshot);
    }

    fn recovered(&mut self, now: DateTime<Utc>, category: AlertCategory, snapshot: &MetricsSnapshot) {
        if let Some(event) = category.recovered_event() {
            info!("[INFO] {}", event);
            self.log.log_event(now, event, self.driver_state, *snapshot);
        }
    }

    fn actuate(&mut self, category: AlertCategory, pattern: Pattern) {
        if let Err(e) = self.actuator.trigger(category, pattern) {
            warn!("Actuation for {} failed: {}", category, e);
        }
    }

    /// Current coarse driver state
    pub fn driver_state(&self) -> DriverState {
        self.driver_state
    }

    pub fn is_active(&self, category: AlertCategory) -> bool {
        self.timers[category].active
    }

    pub fn timer(&self, category: AlertCategory) -> &CategoryTimer {
        &self.timers[category]
    }

    pub fn timers(&self) -> &CategoryTable {
        &self.timers
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Drain the event log
    pub fn flush(&mut self) -> Flush {
        self.log.flush()
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Clear timers, alerts and the log (session end)
    pub fn reset(&mut self) {
        debug!("Resetting alert machine");
        self.timers = CategoryTable::default();
        self.driver_state = DriverState::Normal;
        self.log.clear();
    }
}

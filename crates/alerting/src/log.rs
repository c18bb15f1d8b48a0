//! Event Log
//!
//! Append-only buffer of state and event entries. State entries are
//! de-duplicated against the last logged driver state; event entries never are.

use crate::state::{DriverState, FrameMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Metrics attached to an event, rounded the way the backend stores them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub ear: f64,
    pub mar: f64,
    pub perclos: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl MetricsSnapshot {
    /// Ratios to 3 decimals, angles to 2
    pub fn capture(metrics: &FrameMetrics) -> Self {
        Self {
            ear: round_to(metrics.ear, 3),
            mar: round_to(metrics.mar, 3),
            perclos: round_to(metrics.perclos, 3),
            pitch: round_to(metrics.pitch, 2),
            yaw: round_to(metrics.yaw, 2),
            roll: round_to(metrics.roll, 2),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// What a log entry records
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// Discrete driver state
    State { driver_state: DriverState },
    /// Named event with the metrics at the time
    Event {
        event: String,
        metrics: MetricsSnapshot,
    },
}

/// One log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireEntry", try_from = "WireEntry")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
}

impl LogEntry {
    pub fn state(timestamp: DateTime<Utc>, driver_state: DriverState) -> Self {
        Self {
            timestamp,
            kind: EntryKind::State { driver_state },
        }
    }

    pub fn event(timestamp: DateTime<Utc>, event: impl Into<String>, metrics: MetricsSnapshot) -> Self {
        Self {
            timestamp,
            kind: EntryKind::Event {
                event: event.into(),
                metrics,
            },
        }
    }

    /// Event name, if this is an event entry
    pub fn event_name(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Event { event, .. } => Some(event),
            EntryKind::State { .. } => None,
        }
    }

    /// Driver state, if this is a state entry
    pub fn driver_state(&self) -> Option<DriverState> {
        match self.kind {
            EntryKind::State { driver_state } => Some(driver_state),
            EntryKind::Event { .. } => None,
        }
    }
}

/// Flat JSON shape consumed by the persistence sink
#[derive(Debug, Serialize, Deserialize)]
struct WireEntry {
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ear: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    perclos: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    yaw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    driver_state: Option<DriverState>,
}

impl From<LogEntry> for WireEntry {
    fn from(entry: LogEntry) -> Self {
        let mut wire = WireEntry {
            timestamp: entry.timestamp,
            event: None,
            ear: None,
            mar: None,
            perclos: None,
            pitch: None,
            yaw: None,
            roll: None,
            driver_state: None,
        };
        match entry.kind {
            EntryKind::State { driver_state } => wire.driver_state = Some(driver_state),
            EntryKind::Event { event, metrics } => {
                wire.event = Some(event);
                wire.ear = Some(metrics.ear);
                wire.mar = Some(metrics.mar);
                wire.perclos = Some(metrics.perclos);
                wire.pitch = Some(metrics.pitch);
                wire.yaw = Some(metrics.yaw);
                wire.roll = Some(metrics.roll);
            }
        }
        wire
    }
}

impl TryFrom<WireEntry> for LogEntry {
    type Error = String;

    fn try_from(wire: WireEntry) -> Result<Self, Self::Error> {
        let kind = match (wire.event, wire.driver_state) {
            (Some(event), None) => EntryKind::Event {
                event,
                // Non-finite metrics serialize as null
                metrics: MetricsSnapshot {
                    ear: wire.ear.unwrap_or(f64::NAN),
                    mar: wire.mar.unwrap_or(f64::NAN),
                    perclos: wire.perclos.unwrap_or(f64::NAN),
                    pitch: wire.pitch.unwrap_or(f64::NAN),
                    yaw: wire.yaw.unwrap_or(f64::NAN),
                    roll: wire.roll.unwrap_or(f64::NAN),
                },
            },
            (None, Some(driver_state)) => EntryKind::State { driver_state },
            _ => return Err("log entry needs exactly one of `event` or `driver_state`".to_string()),
        };
        Ok(LogEntry {
            timestamp: wire.timestamp,
            kind,
        })
    }
}

/// Result of draining the log
#[derive(Debug, Clone, PartialEq)]
pub enum Flush {
    /// Nothing was buffered
    Empty,
    Entries(Vec<LogEntry>),
}

impl Flush {
    pub fn is_empty(&self) -> bool {
        matches!(self, Flush::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            Flush::Empty => 0,
            Flush::Entries(entries) => entries.len(),
        }
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        match self {
            Flush::Empty => Vec::new(),
            Flush::Entries(entries) => entries,
        }
    }
}

/// In-memory event log for one session
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    last_logged_state: Option<DriverState>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unconditionally and update the last logged state. State entries
    /// carry their own state; event entries take `context`.
    pub fn append(&mut self, entry: LogEntry, context: DriverState) {
        self.last_logged_state = Some(entry.driver_state().unwrap_or(context));
        self.entries.push(entry);
    }

    /// Decide whether a state entry for `state` should be written. A `true`
    /// answer claims the slot: asking again for the same state returns `false`.
    pub fn should_log(&mut self, state: DriverState, forced: bool) -> bool {
        if forced || self.last_logged_state != Some(state) {
            self.last_logged_state = Some(state);
            true
        } else {
            debug!("Suppressed duplicate state entry: {}", state);
            false
        }
    }

    /// Write a state entry unless it repeats the last logged state
    pub fn log_state(&mut self, now: DateTime<Utc>, state: DriverState, forced: bool) -> bool {
        if !self.should_log(state, forced) {
            return false;
        }
        self.entries.push(LogEntry::state(now, state));
        true
    }

    /// Write an event entry. Events are never suppressed; `context` becomes
    /// the last logged state.
    pub fn log_event(
        &mut self,
        now: DateTime<Utc>,
        event: &str,
        context: DriverState,
        metrics: MetricsSnapshot,
    ) {
        self.append(LogEntry::event(now, event, metrics), context);
    }

    /// Take everything buffered so far
    pub fn flush(&mut self) -> Flush {
        if self.entries.is_empty() {
            return Flush::Empty;
        }
        Flush::Entries(std::mem::take(&mut self.entries))
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_logged_state(&self) -> Option<DriverState> {
        self.last_logged_state
    }

    /// Drop buffered entries and de-duplication memory
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_logged_state = None;
    }
}

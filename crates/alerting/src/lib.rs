//! Alerting System
//!
//! Turns smoothed driver metrics and a stabilized classifier label into
//! debounced alert transitions:
//! - Per-category timers, cooldowns and hysteresis
//! - De-duplicated, append-only event log
//! - Fire-and-forget actuation and log sinks

mod actuator;
mod clock;
mod config;
mod error;
mod log;
mod machine;
mod sink;
mod state;
mod timer;

pub use actuator::{Actuator, LogActuator, Pattern, RecordingActuator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AlertConfig;
pub use error::{ActuationError, ConfigError, SinkError};
pub use log::{EntryKind, EventLog, Flush, LogEntry, MetricsSnapshot};
pub use machine::{AlertMachine, Observation};
pub use sink::{ChannelSink, JsonFileSink, LogSink, MemorySink, PowerState, SinkMessage, SystemStatus};
pub use state::{AlertCategory, DriverState, FrameMetrics, UnknownLabel};
pub use timer::{CategoryTable, CategoryTimer};

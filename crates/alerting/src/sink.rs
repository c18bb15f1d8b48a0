//! Log sinks
//!
//! The machine only produces entries; hosts decide where they go. Sinks are
//! called once per flush and are never retried.

use crate::error::SinkError;
use crate::log::LogEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Monitoring system power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    On,
    Off,
}

/// Session boundary notice sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub status: PowerState,
    pub device_id: String,
}

/// Destination for finished log entries
pub trait LogSink {
    fn deliver(&mut self, entries: &[LogEntry]) -> Result<(), SinkError>;

    /// Session start/stop notice. Ignored unless the sink cares.
    fn deliver_status(&mut self, status: &SystemStatus) -> Result<(), SinkError> {
        debug!("Status {:?} not forwarded by this sink", status.status);
        Ok(())
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn deliver(&mut self, entries: &[LogEntry]) -> Result<(), SinkError> {
        (**self).deliver(entries)
    }

    fn deliver_status(&mut self, status: &SystemStatus) -> Result<(), SinkError> {
        (**self).deliver_status(status)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn deliver(&mut self, entries: &[LogEntry]) -> Result<(), SinkError> {
        (**self).deliver(entries)
    }

    fn deliver_status(&mut self, status: &SystemStatus) -> Result<(), SinkError> {
        (**self).deliver_status(status)
    }
}

/// Collects everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub entries: Vec<LogEntry>,
    pub statuses: Vec<SystemStatus>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for MemorySink {
    fn deliver(&mut self, entries: &[LogEntry]) -> Result<(), SinkError> {
        self.entries.extend_from_slice(entries);
        Ok(())
    }

    fn deliver_status(&mut self, status: &SystemStatus) -> Result<(), SinkError> {
        self.statuses.push(status.clone());
        Ok(())
    }
}

/// Saves the session's entries to `<dir>/<session>.json` as a pretty JSON
/// array. Deliveries are buffered; the file is written once when the session
/// reports [`PowerState::Off`], or on [`JsonFileSink::persist`].
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    entries: Vec<LogEntry>,
    written: usize,
}

impl JsonFileSink {
    /// Create the log directory if needed. Without a session name the file is
    /// named after the current UTC time.
    pub fn new(dir: impl AsRef<Path>, session_name: Option<&str>) -> Result<Self, SinkError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let name = match session_name {
            Some(name) => name.to_string(),
            None => format!("session_{}", Utc::now().format("%Y%m%d_%H%M%S")),
        };

        Ok(Self {
            path: dir.join(format!("{name}.json")),
            entries: Vec::new(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries on disk
    pub fn written(&self) -> usize {
        self.written
    }

    /// Entries received but not yet on disk
    pub fn pending(&self) -> usize {
        self.entries.len() - self.written
    }

    /// Write everything received so far. Returns the number of entries saved.
    pub fn persist(&mut self) -> Result<usize, SinkError> {
        if self.pending() == 0 {
            if self.entries.is_empty() {
                info!("No alerts to save.");
            }
            return Ok(self.written);
        }

        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.entries)?;
        self.written = self.entries.len();

        info!("Log saved to {} ({} entries)", self.path.display(), self.written);
        Ok(self.written)
    }
}

impl LogSink for JsonFileSink {
    fn deliver(&mut self, entries: &[LogEntry]) -> Result<(), SinkError> {
        self.entries.extend_from_slice(entries);
        Ok(())
    }

    fn deliver_status(&mut self, status: &SystemStatus) -> Result<(), SinkError> {
        if status.status == PowerState::Off {
            self.persist()?;
        }
        Ok(())
    }
}

/// Message carried by [`ChannelSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    Entries(Vec<LogEntry>),
    Status(SystemStatus),
}

/// Hands entries to an async consumer without waiting on it
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    /// Sink plus the receiving end for the consumer task
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelSink {
    fn deliver(&mut self, entries: &[LogEntry]) -> Result<(), SinkError> {
        if entries.is_empty() {
            return Ok(());
        }
        self.tx
            .send(SinkMessage::Entries(entries.to_vec()))
            .map_err(|_| SinkError::ChannelClosed)
    }

    fn deliver_status(&mut self, status: &SystemStatus) -> Result<(), SinkError> {
        self.tx
            .send(SinkMessage::Status(status.clone()))
            .map_err(|_| SinkError::ChannelClosed)
    }
}

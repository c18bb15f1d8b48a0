//! Recording replay
//!
//! Frames are read one JSON object per line. The session clock follows each
//! frame's `t_ms`, so a replay raises the same alerts as the live run no
//! matter how fast it is read back. Flushed entries travel over a channel
//! to a writer task that owns the session file.

use alerting::{ChannelSink, JsonFileSink, LogActuator, LogSink, ManualClock, SinkMessage};
use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use dms::{MonitorSession, RawFrame, RuleClassifier};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::settings::MonitorSettings;

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub session_id: Uuid,
    pub frames: u64,
    /// Blank lines are ignored; malformed ones are counted here
    pub skipped: u64,
    pub entries_written: usize,
    /// Session file, if anything was saved
    pub log_path: Option<PathBuf>,
}

/// Replay a JSON-lines recording through a fresh session
pub async fn replay(path: &Path, settings: &MonitorSettings) -> anyhow::Result<ReplaySummary> {
    let start = Utc::now();
    let clock = ManualClock::new(start);
    let mut session =
        MonitorSession::with_parts(settings.session.clone(), clock.clone(), LogActuator)?;
    if settings.rule_classifier {
        session = session.with_classifier(RuleClassifier::new(settings.session.rules.clone()));
    }

    let file_sink = JsonFileSink::new(&settings.log_dir, settings.session_name.as_deref())?;
    let (mut sink, rx) = ChannelSink::new();
    let writer = tokio::spawn(write_log(rx, file_sink));

    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open recording {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    session.start(&mut sink)?;

    let mut line_no = 0u64;
    let mut skipped = 0u64;
    let mut offset_ms: Option<u64> = None;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame: RawFrame = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                skipped += 1;
                continue;
            }
        };

        let next = next_offset(offset_ms, frame.t_ms, settings.frame_interval_ms);
        let Some(at) = frame_time(start, next) else {
            warn!("Skipping line {}: offset {} ms is out of range", line_no, next);
            skipped += 1;
            continue;
        };
        offset_ms = Some(next);
        clock.set(at);

        let outcome = session.process(&frame)?;
        if outcome.new_entries > 0 {
            debug!(
                "Frame {} at {} ms: {} ({:?})",
                line_no, next, outcome.driver_state, outcome.active
            );
        }

        if settings.flush_every > 0 && session.frames() % settings.flush_every == 0 {
            if let Err(e) = session.flush(&mut sink) {
                debug!("Flush at frame {} failed: {}", session.frames(), e);
            }
        }
    }

    let report = session.stop(&mut sink)?;
    drop(sink);
    let file_sink = writer.await?;

    Ok(ReplaySummary {
        session_id: report.session_id,
        frames: report.frames,
        skipped,
        entries_written: file_sink.written(),
        log_path: (file_sink.written() > 0).then(|| file_sink.path().to_path_buf()),
    })
}

/// Wall time of a frame `offset_ms` into the recording
fn frame_time(start: DateTime<Utc>, offset_ms: u64) -> Option<DateTime<Utc>> {
    let elapsed = TimeDelta::try_milliseconds(i64::try_from(offset_ms).ok()?)?;
    start.checked_add_signed(elapsed)
}

/// Timestamps never move backwards; frames without one are spaced evenly
fn next_offset(previous: Option<u64>, t_ms: Option<u64>, interval_ms: u64) -> u64 {
    match (previous, t_ms) {
        (None, t) => t.unwrap_or(0),
        (Some(prev), Some(t)) if t < prev => {
            warn!("Frame timestamp {} ms is before {} ms, holding clock", t, prev);
            prev
        }
        (Some(_), Some(t)) => t,
        (Some(prev), None) => prev.saturating_add(interval_ms),
    }
}

async fn write_log(
    mut rx: mpsc::UnboundedReceiver<SinkMessage>,
    mut file_sink: JsonFileSink,
) -> JsonFileSink {
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Entries(batch) => {
                if let Err(e) = file_sink.deliver(&batch) {
                    warn!("Failed to save {} log entries: {}", batch.len(), e);
                }
            }
            SinkMessage::Status(status) => {
                info!(
                    "System {:?} at {} ({})",
                    status.status, status.timestamp, status.device_id
                );
                if let Err(e) = file_sink.deliver_status(&status) {
                    warn!("Failed to save session log: {}", e);
                }
            }
        }
    }
    if file_sink.pending() > 0 {
        if let Err(e) = file_sink.persist() {
            warn!("Failed to save session log: {}", e);
        }
    }
    file_sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::LogEntry;
    use std::fs;

    struct Scratch {
        dir: PathBuf,
    }

    impl Scratch {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("dms-replay-{}", Uuid::new_v4()));
            fs::create_dir_all(&dir).unwrap();
            Self { dir }
        }

        fn recording(&self, lines: &[String]) -> PathBuf {
            let path = self.dir.join("frames.jsonl");
            fs::write(&path, lines.join("\n")).unwrap();
            path
        }

        fn settings(&self) -> MonitorSettings {
            MonitorSettings {
                log_dir: self.dir.join("logs"),
                session_name: Some("trip".to_string()),
                rule_classifier: false,
                ..Default::default()
            }
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn frame(ear: f64, t_ms: u64) -> String {
        serde_json::to_string(&RawFrame {
            t_ms: Some(t_ms),
            ..RawFrame::new(ear, 0.2)
        })
        .unwrap()
    }

    fn saved_events(path: &Path) -> Vec<String> {
        let entries: Vec<LogEntry> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        entries
            .iter()
            .filter_map(|e| e.event_name().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_replay_saves_eyes_closed_episode() {
        let scratch = Scratch::new();
        let mut lines: Vec<String> = (0..150).map(|i| frame(0.10, i * 33)).collect();
        lines.extend((150..180).map(|i| frame(0.32, i * 33)));
        let recording = scratch.recording(&lines);

        let summary = replay(&recording, &scratch.settings()).await.unwrap();

        assert_eq!(summary.frames, 180);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.entries_written, 2);
        let log_path = summary.log_path.unwrap();
        assert_eq!(log_path, scratch.dir.join("logs").join("trip.json"));
        assert_eq!(saved_events(&log_path), vec!["Eyes closed for too long", "Eyes reopened"]);
    }

    #[tokio::test]
    async fn test_interrupted_closure_never_alerts() {
        let scratch = Scratch::new();
        // 1.9 s closed, a brief reopen, 1.9 s closed
        let mut lines: Vec<String> = (0..58).map(|i| frame(0.05, i * 33)).collect();
        lines.extend((58..63).map(|i| frame(0.40, i * 33)));
        lines.extend((63..120).map(|i| frame(0.05, i * 33)));
        let recording = scratch.recording(&lines);

        let summary = replay(&recording, &scratch.settings()).await.unwrap();
        assert_eq!(summary.entries_written, 0);
        assert_eq!(summary.log_path, None);
    }

    #[tokio::test]
    async fn test_malformed_and_blank_lines() {
        let scratch = Scratch::new();
        let lines = vec![
            frame(0.30, 0),
            String::new(),
            "{not json".to_string(),
            r#"{"ear": 0.3, "mar": 0.2, "label": "sleepy"}"#.to_string(),
            frame(0.30, 66),
        ];
        let recording = scratch.recording(&lines);

        let summary = replay(&recording, &scratch.settings()).await.unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_out_of_range_offsets_are_skipped() {
        let scratch = Scratch::new();
        let lines = vec![
            frame(0.30, 0),
            r#"{"ear": 0.3, "mar": 0.2, "t_ms": 10000000000000000}"#.to_string(),
            format!(r#"{{"ear": 0.3, "mar": 0.2, "t_ms": {}}}"#, u64::MAX),
            frame(0.30, 66),
            r#"{"ear": 0.3, "mar": 0.2}"#.to_string(),
        ];
        let recording = scratch.recording(&lines);

        let summary = replay(&recording, &scratch.settings()).await.unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_frame_time_bounds() {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(
            frame_time(start, 1500),
            Some(start + TimeDelta::milliseconds(1500))
        );
        assert_eq!(frame_time(start, 10_000_000_000_000_000), None);
        assert_eq!(frame_time(start, u64::MAX), None);
    }

    #[tokio::test]
    async fn test_missing_recording() {
        let scratch = Scratch::new();
        let result = replay(&scratch.dir.join("absent.jsonl"), &scratch.settings()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(next_offset(None, None, 33), 0);
        assert_eq!(next_offset(None, Some(500), 33), 500);
        assert_eq!(next_offset(Some(500), None, 33), 533);
        assert_eq!(next_offset(Some(500), Some(400), 33), 500);
        assert_eq!(next_offset(Some(500), Some(600), 33), 600);
    }
}

//! Monitoring session
//!
//! Owns every per-subject window plus the alert machine. Frames are
//! processed strictly in order through `&mut self`; the host decides when
//! buffered log entries leave through a [`LogSink`].

use crate::classifier::{Classifier, FeatureVector};
use crate::config::DmsConfig;
use crate::frame::RawFrame;
use crate::DmsError;
use alerting::{
    Actuator, AlertCategory, AlertMachine, Clock, DriverState, FrameMetrics, LogActuator, LogSink,
    Observation, PowerState, SinkError, SystemClock, SystemStatus,
};
use signal_window::{ClassificationStabilizer, MetricId, MetricSmoother, PerclosTracker};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// Coarse driver state after this frame
    pub driver_state: DriverState,
    /// Stable label handed to the machine, `None` when the frame had no label
    pub label: Option<DriverState>,
    /// Smoothed metrics the machine evaluated
    pub metrics: FrameMetrics,
    /// Log entries appended by this frame
    pub new_entries: usize,
    /// Categories firing after this frame
    pub active: Vec<AlertCategory>,
}

/// Summary returned by [`MonitorSession::stop`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub frames: u64,
    /// Entries delivered by the final flush
    pub entries_delivered: usize,
}

impl SessionReport {
    /// Nothing was left to save at stop
    pub fn is_empty(&self) -> bool {
        self.entries_delivered == 0
    }
}

/// One monitored subject
pub struct MonitorSession<C = SystemClock, A = LogActuator> {
    id: Uuid,
    config: DmsConfig,
    smoother: MetricSmoother,
    stabilizer: ClassificationStabilizer<DriverState>,
    perclos: PerclosTracker,
    classifier: Option<Box<dyn Classifier + Send>>,
    machine: AlertMachine<C, A>,
    stable_label: DriverState,
    running: bool,
    frames: u64,
}

impl MonitorSession {
    /// Session on the wall clock with a tracing-only actuator
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        Self::with_parts(config, SystemClock, LogActuator)
    }
}

impl<C: Clock, A: Actuator> MonitorSession<C, A> {
    /// Create a session; every window and threshold is validated here
    pub fn with_parts(config: DmsConfig, clock: C, actuator: A) -> Result<Self, DmsError> {
        let smoother = MetricSmoother::new(config.smoothing_window)?;
        let stabilizer = ClassificationStabilizer::new(config.state_window, config.stability_ratio)?;
        let perclos = PerclosTracker::new(config.perclos_window, config.perclos_ear_threshold)?;
        let machine = AlertMachine::new(config.alerts.clone(), clock, actuator)?;

        let id = Uuid::new_v4();
        info!("Creating monitor session {} for device {}", id, config.device_id);

        Ok(Self {
            id,
            config,
            smoother,
            stabilizer,
            perclos,
            classifier: None,
            machine,
            stable_label: DriverState::Normal,
            running: false,
            frames: 0,
        })
    }

    /// Classify frames that arrive without a label
    pub fn with_classifier(mut self, classifier: impl Classifier + Send + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Begin monitoring and announce it to the sink
    pub fn start<S: LogSink>(&mut self, sink: &mut S) -> Result<(), DmsError> {
        if self.running {
            return Err(DmsError::AlreadyRunning);
        }
        self.running = true;
        info!("Session {} started", self.id);
        self.announce(sink, PowerState::On);
        Ok(())
    }

    /// Run one frame through smoothing, stabilization and the alert machine
    pub fn process(&mut self, frame: &RawFrame) -> Result<FrameOutcome, DmsError> {
        if !self.running {
            return Err(DmsError::NotRunning);
        }
        self.frames += 1;

        let ear = self.smoother.push(MetricId::Ear, frame.ear);
        let mar = self.smoother.push(MetricId::Mar, frame.mar);
        let tracked = self.perclos.update(ear);
        let perclos = frame.perclos.unwrap_or(tracked);
        let metrics = FrameMetrics::new(ear, mar, perclos, frame.pitch, frame.yaw, frame.roll);

        let raw_label = frame.label.or_else(|| self.classify(&metrics));
        let label = raw_label.map(|raw| {
            if let Some(stable) = self.stabilizer.push(raw) {
                if stable != self.stable_label {
                    debug!("Stable label {} -> {}", self.stable_label, stable);
                }
                self.stable_label = stable;
            }
            self.stable_label
        });

        let mut observation = Observation::new(metrics);
        observation.label = label;
        observation.hand_on_wheel = frame.hand_on_wheel;

        let before = self.machine.log().len();
        let driver_state = self.machine.update(&observation);
        let new_entries = self.machine.log().len() - before;

        Ok(FrameOutcome {
            driver_state,
            label,
            metrics,
            new_entries,
            active: self.machine.timers().active(),
        })
    }

    fn classify(&mut self, metrics: &FrameMetrics) -> Option<DriverState> {
        let classifier = self.classifier.as_mut()?;
        match classifier.classify(&FeatureVector::from(metrics)) {
            Ok(label) => Some(label),
            Err(e) => {
                warn!("Classifier failed, frame left unlabelled: {}", e);
                None
            }
        }
    }

    /// Deliver buffered entries. Entries are dropped on failure, never retried.
    pub fn flush<S: LogSink>(&mut self, sink: &mut S) -> Result<usize, SinkError> {
        let entries = self.machine.flush().into_entries();
        if entries.is_empty() {
            return Ok(0);
        }

        match sink.deliver(&entries) {
            Ok(()) => {
                debug!("Flushed {} entries", entries.len());
                Ok(entries.len())
            }
            Err(e) => {
                warn!("Dropping {} log entries: {}", entries.len(), e);
                Err(e)
            }
        }
    }

    /// Flush, announce shutdown and reset every window.
    ///
    /// The session always ends, even when the final flush fails; the flush
    /// error is returned after shutdown completes.
    pub fn stop<S: LogSink>(&mut self, sink: &mut S) -> Result<SessionReport, DmsError> {
        if !self.running {
            return Err(DmsError::NotRunning);
        }

        let flushed = self.flush(sink);
        if matches!(flushed, Ok(0)) {
            info!("No alerts to save");
        }
        self.announce(sink, PowerState::Off);

        let report = SessionReport {
            session_id: self.id,
            frames: self.frames,
            entries_delivered: *flushed.as_ref().unwrap_or(&0),
        };
        info!("Session {} stopped after {} frames", self.id, self.frames);

        self.reset();
        self.running = false;
        self.id = Uuid::new_v4();

        flushed?;
        Ok(report)
    }

    fn announce<S: LogSink>(&mut self, sink: &mut S, status: PowerState) {
        let notice = SystemStatus {
            timestamp: self.machine.clock().now(),
            status,
            device_id: self.config.device_id.clone(),
        };
        if let Err(e) = sink.deliver_status(&notice) {
            warn!("System status {:?} not delivered: {}", status, e);
        }
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.stabilizer.reset();
        self.perclos.reset();
        self.machine.reset();
        self.stable_label = DriverState::Normal;
        self.frames = 0;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames processed since start
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Last stable classifier label
    pub fn stable_label(&self) -> DriverState {
        self.stable_label
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn machine(&self) -> &AlertMachine<C, A> {
        &self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierError, RuleClassifier};
    use alerting::{ManualClock, MemorySink, RecordingActuator};
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    type TestSession = MonitorSession<ManualClock, RecordingActuator>;

    const OPEN: f64 = 0.32;
    const CLOSED: f64 = 0.10;

    fn session(config: DmsConfig) -> (TestSession, ManualClock) {
        let clock = ManualClock::default();
        let session =
            MonitorSession::with_parts(config, clock.clone(), RecordingActuator::new()).unwrap();
        (session, clock)
    }

    fn started(config: DmsConfig) -> (TestSession, ManualClock, MemorySink) {
        let (mut session, clock) = session(config);
        let mut sink = MemorySink::new();
        session.start(&mut sink).unwrap();
        (session, clock, sink)
    }

    fn events(sink: &MemorySink) -> Vec<&str> {
        sink.entries.iter().filter_map(|e| e.event_name()).collect()
    }

    struct BrokenModel;

    impl Classifier for BrokenModel {
        fn classify(&mut self, _: &FeatureVector) -> Result<DriverState, ClassifierError> {
            Err(ClassifierError::Inference("model not loaded".to_string()))
        }
    }

    #[test]
    fn test_process_requires_start() {
        let (mut session, _) = session(DmsConfig::default());
        assert!(matches!(
            session.process(&RawFrame::new(OPEN, 0.2)),
            Err(DmsError::NotRunning)
        ));
    }

    #[test]
    fn test_start_announces_once() {
        let (mut session, _clock, mut sink) = started(DmsConfig::default());

        assert!(matches!(session.start(&mut sink), Err(DmsError::AlreadyRunning)));
        assert_eq!(sink.statuses.len(), 1);
        assert_eq!(sink.statuses[0].status, PowerState::On);
        assert_eq!(sink.statuses[0].device_id, "ADAMS-001");
        assert_eq!(sink.statuses[0].timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DmsConfig {
            state_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            MonitorSession::new(config),
            Err(DmsError::Window(_))
        ));

        let mut config = DmsConfig::default();
        config.alerts.ear_threshold = f64::NAN;
        assert!(matches!(MonitorSession::new(config), Err(DmsError::Config(_))));
    }

    #[test]
    fn test_eyes_closed_through_smoothing() {
        let (mut session, clock, mut sink) = started(DmsConfig::default());

        for _ in 0..20 {
            let outcome = session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
            assert!(outcome.active.is_empty());
            clock.advance_ms(100);
        }
        let outcome = session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
        assert_eq!(outcome.active, vec![AlertCategory::EyesClosed]);
        assert_eq!(outcome.new_entries, 1);

        // Smoothed EAR needs a couple of open frames to climb back
        let mut reopened_after = None;
        for i in 1..=5 {
            clock.advance_ms(100);
            let outcome = session.process(&RawFrame::new(OPEN, 0.2)).unwrap();
            if outcome.active.is_empty() {
                reopened_after = Some(i);
                break;
            }
        }
        assert_eq!(reopened_after, Some(2));

        session.flush(&mut sink).unwrap();
        assert_eq!(events(&sink), vec!["Eyes closed for too long", "Eyes reopened"]);
    }

    #[test]
    fn test_label_waits_for_full_window() {
        let (mut session, clock, mut sink) = started(DmsConfig::default());
        let frame = RawFrame::new(OPEN, 0.2).with_label(DriverState::Drowsy);

        for _ in 0..29 {
            let outcome = session.process(&frame).unwrap();
            assert_eq!(outcome.label, Some(DriverState::Normal));
            assert_eq!(outcome.driver_state, DriverState::Normal);
            clock.advance_ms(33);
        }

        let outcome = session.process(&frame).unwrap();
        assert_eq!(outcome.label, Some(DriverState::Drowsy));
        assert_eq!(outcome.driver_state, DriverState::Drowsy);
        assert_eq!(session.machine().actuator().count(AlertCategory::Drowsy), 1);

        session.flush(&mut sink).unwrap();
        assert_eq!(events(&sink), vec!["Drowsiness"]);
        assert_eq!(sink.entries[1].driver_state(), Some(DriverState::Drowsy));
    }

    #[test]
    fn test_ambiguous_window_keeps_last_stable_label() {
        let (mut session, _clock, _sink) = started(DmsConfig::default());
        let drowsy = RawFrame::new(OPEN, 0.2).with_label(DriverState::Drowsy);
        let normal = RawFrame::new(OPEN, 0.2).with_label(DriverState::Normal);

        for _ in 0..30 {
            session.process(&drowsy).unwrap();
        }
        assert_eq!(session.stable_label(), DriverState::Drowsy);

        // 17 drowsy / 13 normal is below the supermajority
        for _ in 0..13 {
            session.process(&normal).unwrap();
        }
        assert_eq!(session.stable_label(), DriverState::Drowsy);
    }

    #[test]
    fn test_classifier_labels_unlabelled_frames() {
        let (session, clock) = session(DmsConfig::default());
        let mut session = session.with_classifier(RuleClassifier::default());
        let mut sink = MemorySink::new();
        session.start(&mut sink).unwrap();

        let looking_away = RawFrame::new(OPEN, 0.2).with_pose(0.0, 45.0, 0.0);
        for _ in 0..60 {
            session.process(&looking_away).unwrap();
            clock.advance_ms(100);
        }
        assert_eq!(session.stable_label(), DriverState::Distracted);
        assert!(session.machine().is_active(AlertCategory::Distracted));

        // A labelled frame bypasses the classifier
        let outcome = session
            .process(&looking_away.with_label(DriverState::Normal))
            .unwrap();
        assert_eq!(outcome.label, Some(DriverState::Distracted));
    }

    #[test]
    fn test_classifier_failure_leaves_frame_unlabelled() {
        let (session, _clock) = session(DmsConfig::default());
        let mut session = session.with_classifier(BrokenModel);
        session.start(&mut MemorySink::new()).unwrap();

        let outcome = session.process(&RawFrame::new(OPEN, 0.2)).unwrap();
        assert_eq!(outcome.label, None);
        assert_eq!(outcome.driver_state, DriverState::Normal);
    }

    #[test]
    fn test_no_classifier_no_label() {
        let (mut session, _clock, _sink) = started(DmsConfig::default());
        let outcome = session.process(&RawFrame::new(OPEN, 0.2)).unwrap();
        assert_eq!(outcome.label, None);
    }

    #[test]
    fn test_perclos_source_overrides_tracker() {
        let (mut session, _clock, _sink) = started(DmsConfig::default());

        for _ in 0..10 {
            session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
        }
        let tracked = session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
        assert_eq!(tracked.metrics.perclos, 1.0);

        let supplied = session
            .process(&RawFrame::new(CLOSED, 0.2).with_perclos(0.42))
            .unwrap();
        assert_eq!(supplied.metrics.perclos, 0.42);
    }

    #[test]
    fn test_grip_reaches_machine() {
        let (mut session, clock, mut sink) = started(DmsConfig::default());

        for _ in 0..52 {
            session.process(&RawFrame::new(OPEN, 0.2).with_grip(false)).unwrap();
            clock.advance_ms(100);
        }
        assert!(session.machine().is_active(AlertCategory::HandsOff));
        session.process(&RawFrame::new(OPEN, 0.2).with_grip(true)).unwrap();

        session.flush(&mut sink).unwrap();
        assert_eq!(
            events(&sink),
            vec!["Hands off steering >5s", "Hand returned to steering wheel"]
        );
    }

    #[test]
    fn test_flush_drains_once() {
        let (mut session, clock, mut sink) = started(DmsConfig::default());
        for _ in 0..25 {
            session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
            clock.advance_ms(100);
        }

        assert_eq!(session.flush(&mut sink).unwrap(), 1);
        assert_eq!(session.flush(&mut sink).unwrap(), 0);
        assert_eq!(sink.entries.len(), 1);
    }

    struct ClosedSink;

    impl LogSink for ClosedSink {
        fn deliver(&mut self, _: &[alerting::LogEntry]) -> Result<(), SinkError> {
            Err(SinkError::ChannelClosed)
        }
    }

    #[test]
    fn test_failed_flush_is_not_retried() {
        let (mut session, clock, _sink) = started(DmsConfig::default());
        for _ in 0..25 {
            session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
            clock.advance_ms(100);
        }

        assert!(matches!(session.flush(&mut ClosedSink), Err(SinkError::ChannelClosed)));
        assert!(session.machine().log().is_empty());
    }

    #[test]
    fn test_stop_flushes_and_resets() {
        let (mut session, clock, mut sink) = started(DmsConfig::default());
        let first_id = session.id();
        for _ in 0..25 {
            session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
            clock.advance_ms(100);
        }

        let report = session.stop(&mut sink).unwrap();
        assert_eq!(report.session_id, first_id);
        assert_eq!(report.frames, 25);
        assert_eq!(report.entries_delivered, 1);
        assert!(!report.is_empty());

        assert_eq!(sink.statuses.last().map(|s| s.status), Some(PowerState::Off));
        assert!(!session.is_running());
        assert_eq!(session.frames(), 0);
        assert!(session.machine().timers().active().is_empty());
        assert_ne!(session.id(), first_id);
        assert!(matches!(session.stop(&mut sink), Err(DmsError::NotRunning)));
    }

    #[test]
    fn test_stop_with_nothing_to_save() {
        let (mut session, _clock, mut sink) = started(DmsConfig::default());
        session.process(&RawFrame::new(OPEN, 0.2)).unwrap();

        let report = session.stop(&mut sink).unwrap();
        assert!(report.is_empty());
        assert!(sink.entries.is_empty());
        assert_eq!(sink.statuses.len(), 2);
    }

    #[test]
    fn test_stop_ends_session_even_if_flush_fails() {
        let (mut session, clock, _sink) = started(DmsConfig::default());
        for _ in 0..25 {
            session.process(&RawFrame::new(CLOSED, 0.2)).unwrap();
            clock.advance_ms(100);
        }

        assert!(matches!(session.stop(&mut ClosedSink), Err(DmsError::Sink(_))));
        assert!(!session.is_running());
        session.start(&mut MemorySink::new()).unwrap();
    }

    fn label() -> impl Strategy<Value = Option<DriverState>> {
        prop_oneof![
            Just(None),
            Just(Some(DriverState::Normal)),
            Just(Some(DriverState::Drowsy)),
            Just(Some(DriverState::Distracted)),
        ]
    }

    proptest! {
        #[test]
        fn prop_reported_entries_match_flush(
            frames in prop::collection::vec(
                (0.0f64..0.5, 0.0f64..1.0, -60.0f64..60.0, label(), prop::option::of(any::<bool>())),
                1..300,
            ),
            step_ms in 10i64..200,
        ) {
            let (session, clock) = session(DmsConfig::default());
            let mut session = session.with_classifier(RuleClassifier::default());
            let mut sink = MemorySink::new();
            session.start(&mut sink).unwrap();

            let mut reported = 0;
            for (ear, mar, yaw, label, grip) in frames {
                let mut frame = RawFrame::new(ear, mar).with_pose(0.0, yaw, 0.0);
                frame.label = label;
                frame.hand_on_wheel = grip;
                reported += session.process(&frame).unwrap().new_entries;
                clock.advance_ms(step_ms);
            }

            let report = session.stop(&mut sink).unwrap();
            prop_assert_eq!(report.entries_delivered, reported);
            prop_assert_eq!(sink.entries.len(), reported);
        }
    }
}

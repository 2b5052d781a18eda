//! # Lifecycle Controller
//!
//! The main loop: one bounded receive per iteration, heartbeats to the
//! arm-state tracker, samples to the recorder, and session/perception
//! control on every arm edge.
//!
//! Teardown (stop perception, close sinks) runs exactly once when the loop
//! exits, whether it ended on an operator interrupt or a fatal link error.

use chrono::Local;
use std::fmt;
use tracing::{debug, error, info, warn};

use super::supervisor::{StartOutcome, Supervisor};
use super::tracker::{ArmStateTracker, Transition};
use crate::config::{Config, OpenFailurePolicy};
use crate::error::{ArmSentryError, Result};
use crate::serial::TelemetrySource;
use crate::session::manager::FILE_TIMESTAMP_FORMAT;
use crate::session::SessionManager;
use crate::shutdown::Shutdown;
use crate::telemetry::recorder::TelemetryRecorder;
use crate::telemetry::types::{Frame, TelemetryMessage};

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disarmed,
    Armed,
}

/// Run counters, logged on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub frames: u64,
    pub armed: u64,
    pub disarmed: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub open_failures: u64,
    pub children_started: u64,
    pub children_stopped: u64,
    pub children_exited: u64,
    pub rows_written: u64,
    pub rows_dropped: u64,
}

impl fmt::Display for ControllerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} armed / {} disarmed, {} sessions ({} failed to open), \
             {} perception starts / {} stops ({} exited early), {} rows ({} dropped)",
            self.frames,
            self.armed,
            self.disarmed,
            self.sessions_closed,
            self.open_failures,
            self.children_started,
            self.children_stopped,
            self.children_exited,
            self.rows_written,
            self.rows_dropped,
        )
    }
}

/// Owner of every resource the arm state drives
pub struct Controller<S> {
    source: S,
    tracker: ArmStateTracker,
    sessions: SessionManager,
    supervisor: Supervisor,
    recorder: TelemetryRecorder,
    policy: OpenFailurePolicy,
    phase: Phase,
    stats: ControllerStats,
    link_ready: bool,
    torn_down: bool,
}

impl<S: TelemetrySource> Controller<S> {
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            tracker: ArmStateTracker::new(),
            sessions: SessionManager::new(&config.recording, Local::now()),
            supervisor: Supervisor::new(&config.perception),
            recorder: TelemetryRecorder::new(),
            policy: config.controller.open_failure_policy,
            phase: Phase::Disarmed,
            stats: ControllerStats::default(),
            link_ready: false,
            torn_down: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Counters so far, including supervisor and recorder totals
    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            children_started: self.supervisor.starts(),
            children_stopped: self.supervisor.stops(),
            rows_written: self.recorder.rows_written(),
            rows_dropped: self.recorder.rows_dropped(),
            ..self.stats
        }
    }

    /// Run until `shutdown` fires or the link fails
    ///
    /// # Errors
    ///
    /// Returns `ArmSentryError::Fatal` if the telemetry link can make no
    /// further progress. Teardown has already run when this returns.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> Result<()> {
        info!("Waiting for heartbeat");

        let result = loop {
            if shutdown.is_requested() {
                info!("Shutdown requested");
                break Ok(());
            }

            self.poll_child();

            let received = tokio::select! {
                biased;
                _ = shutdown.requested() => None,
                r = self.source.recv() => Some(r),
            };

            match received {
                // Picked up at the top of the next iteration
                None => continue,
                Some(Ok(Some(frame))) => self.handle_frame(frame).await,
                Some(Ok(None)) => {}
                Some(Err(e)) if e.is_fatal() => {
                    error!("Telemetry link failed: {}", e);
                    break Err(ArmSentryError::Fatal(e.to_string()));
                }
                Some(Err(e)) => debug!("Ignoring link error: {}", e),
            }
        };

        self.teardown().await;
        result
    }

    async fn handle_frame(&mut self, frame: Frame) {
        self.stats.frames += 1;

        match frame.message {
            TelemetryMessage::Heartbeat(hb) => {
                if !self.link_ready {
                    self.link_ready = true;
                    info!("Heartbeat received from system ID {}", hb.source_id);
                }

                // The arming and disarming heartbeats both land in the session
                match self.tracker.update(Some(hb.armed)) {
                    Some(Transition::Armed) => {
                        self.on_armed();
                        self.write_raw(&frame.raw);
                    }
                    Some(Transition::Disarmed) => {
                        self.write_raw(&frame.raw);
                        self.on_disarmed().await;
                    }
                    None => self.write_raw(&frame.raw),
                }
            }
            TelemetryMessage::Sample(sample) => {
                self.write_raw(&frame.raw);
                self.recorder.record(&mut self.sessions, &sample);
            }
            TelemetryMessage::Other { message_id } => {
                debug!("Passing through message {}", message_id);
                self.write_raw(&frame.raw);
            }
        }
    }

    fn on_armed(&mut self) {
        self.stats.armed += 1;
        let start = Local::now();
        info!("Vehicle ARMED at {}", start.format(FILE_TIMESTAMP_FORMAT));

        match self.sessions.open_session(start) {
            Ok(paths) => {
                self.stats.sessions_opened += 1;
                self.phase = Phase::Armed;
                debug!("Recording to {} and {}", paths.raw.display(), paths.structured.display());

                match self.supervisor.start() {
                    Ok(StartOutcome::Disabled) => debug!("Perception disabled"),
                    Ok(_) => {}
                    Err(e) => error!("Failed to start perception process: {}", e),
                }
            }
            Err(e) => {
                self.stats.open_failures += 1;
                match self.policy {
                    OpenFailurePolicy::StayArmed => {
                        error!("Failed to open session sinks: {}; armed without recording or perception", e);
                        self.phase = Phase::Armed;
                    }
                    OpenFailurePolicy::RollBack => {
                        error!("Failed to open session sinks: {}; rolling back to disarmed", e);
                        self.phase = Phase::Disarmed;
                        self.tracker.rewind(false);
                    }
                }
            }
        }
    }

    async fn on_disarmed(&mut self) {
        self.stats.disarmed += 1;
        info!("Vehicle DISARMED");
        self.phase = Phase::Disarmed;

        self.stop_perception().await;
        self.close_session();
    }

    fn write_raw(&mut self, bytes: &[u8]) {
        if let Err(e) = self.sessions.write_raw(bytes) {
            warn!("Dropped raw telemetry: {}", e);
        }
    }

    async fn stop_perception(&mut self) {
        if let Err(e) = self.supervisor.stop().await {
            error!("Failed to stop perception process: {}", e);
        }
    }

    fn close_session(&mut self) {
        match self.sessions.close_session() {
            Ok(Some(summary)) => {
                self.stats.sessions_closed += 1;
                debug!(
                    "Closed session started {}: {} raw bytes, {} rows",
                    summary.started_at.format(FILE_TIMESTAMP_FORMAT),
                    summary.raw_bytes,
                    summary.rows
                );
            }
            Ok(None) => {}
            Err(e) => error!("Failed to close session sinks: {}", e),
        }
    }

    fn poll_child(&mut self) {
        if let Some(status) = self.supervisor.poll_exited() {
            self.stats.children_exited += 1;
            warn!("Perception process exited unexpectedly ({}), not restarting", status);
        }
    }

    /// Stop perception and close sinks; runs once
    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.stop_perception().await;
        self.close_session();

        info!("Shutdown complete: {}", self.stats());
    }
}

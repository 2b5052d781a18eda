//! # Telemetry Recorder
//!
//! Routes telemetry samples into the structured log of the open session.

use tracing::warn;

use super::logger::TelemetryRow;
use super::types::TelemetrySample;
use crate::session::SessionManager;

/// Outcome of routing one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Written,
    /// No session open (vehicle disarmed)
    Skipped,
    /// The write failed and was logged
    Dropped,
}

/// One row per sample, in arrival order, while a session is open
#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    rows_written: u64,
    rows_dropped: u64,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `sample` as one row if a session is open
    ///
    /// Write failures are logged and swallowed; they never reach the
    /// controller loop.
    pub fn record(&mut self, sessions: &mut SessionManager, sample: &TelemetrySample) -> RecordOutcome {
        if !sessions.is_open() {
            return RecordOutcome::Skipped;
        }

        let row = TelemetryRow::from_sample(sample);
        match sessions.write_row(&row) {
            Ok(()) => {
                self.rows_written += 1;
                RecordOutcome::Written
            }
            Err(e) => {
                self.rows_dropped += 1;
                warn!("Dropped telemetry row: {}", e);
                RecordOutcome::Dropped
            }
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogScope, RecordingConfig};
    use crate::telemetry::logger::LogFormat;
    use crate::telemetry::types::SampleKind;
    use chrono::Local;
    use tempfile::tempdir;

    fn manager(dir: &tempfile::TempDir) -> SessionManager {
        let config = RecordingConfig {
            raw_log_dir: dir.path().join("raw").to_string_lossy().to_string(),
            structured_log_dir: dir.path().join("rows").to_string_lossy().to_string(),
            format: LogFormat::Csv,
            structured_scope: LogScope::Session,
        };
        SessionManager::new(&config, Local::now())
    }

    #[test]
    fn test_disarmed_sample_is_skipped() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(&dir);
        let mut recorder = TelemetryRecorder::new();

        let sample = TelemetrySample::new(SampleKind::Battery { remaining_pct: 90 });
        assert_eq!(recorder.record(&mut sessions, &sample), RecordOutcome::Skipped);
        assert_eq!(recorder.rows_written(), 0);
    }

    #[test]
    fn test_rows_keep_arrival_order() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(&dir);
        let mut recorder = TelemetryRecorder::new();
        let paths = sessions.open_session(Local::now()).unwrap();

        let samples = [
            SampleKind::Attitude { roll: 0.1, pitch: 0.2, yaw: 0.3 },
            SampleKind::Speed { ground_speed: 4.0, climb: 0.5 },
            SampleKind::Battery { remaining_pct: 77 },
        ];
        for kind in samples {
            let outcome = recorder.record(&mut sessions, &TelemetrySample::new(kind));
            assert_eq!(outcome, RecordOutcome::Written);
        }
        sessions.close_session().unwrap();

        let contents = std::fs::read_to_string(paths.structured).unwrap();
        let rows: Vec<Vec<&str>> = contents
            .lines()
            .skip(1)
            .map(|l| l.split(',').collect())
            .collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][4], "0.1");
        assert_eq!(rows[1][7], "4");
        assert_eq!(rows[2][9], "77");
        assert_eq!(recorder.rows_written(), 3);
        assert_eq!(recorder.rows_dropped(), 0);
    }
}

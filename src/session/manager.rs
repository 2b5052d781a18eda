//! # Session Resource Manager
//!
//! Opens the raw recording and structured telemetry sinks when the vehicle
//! arms and closes them when it disarms. Both sinks are opened together and
//! closed together; closing is idempotent.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::sink::Sink;
use crate::config::{LogScope, RecordingConfig};
use crate::error::ResourceError;
use crate::telemetry::logger::{LogFormat, TelemetryRow};

/// Timestamp embedded in sink file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Highest `_N` suffix tried when a session file name is taken
const MAX_NAME_SUFFIX: u32 = 999;

/// Paths of the sinks backing an open session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub raw: PathBuf,
    pub structured: PathBuf,
}

/// What a closed session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub started_at: DateTime<Local>,
    pub paths: SessionPaths,
    pub raw_bytes: u64,
    pub rows: u64,
}

#[derive(Debug)]
struct ActiveSession {
    started_at: DateTime<Local>,
    raw: Sink,
    structured: Sink,
    rows: u64,
}

/// Owner of the per-session sinks
#[derive(Debug)]
pub struct SessionManager {
    raw_dir: PathBuf,
    structured_dir: PathBuf,
    format: LogFormat,
    scope: LogScope,
    run_started: DateTime<Local>,
    active: Option<ActiveSession>,
}

impl SessionManager {
    /// Create a manager with no open session
    ///
    /// # Arguments
    ///
    /// * `config` - Sink directories, row format and structured log scope
    /// * `run_started` - Controller start time, names the per-run structured log
    pub fn new(config: &RecordingConfig, run_started: DateTime<Local>) -> Self {
        Self {
            raw_dir: PathBuf::from(&config.raw_log_dir),
            structured_dir: PathBuf::from(&config.structured_log_dir),
            format: config.format,
            scope: config.structured_scope,
            run_started,
            active: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Start time of the open session
    pub fn session_start(&self) -> Option<DateTime<Local>> {
        self.active.as_ref().map(|s| s.started_at)
    }

    /// Raw recording path for a session starting at `start`
    ///
    /// A session gets `_1`, `_2`, ... appended when an earlier session in
    /// the same second already owns this name.
    pub fn raw_path(&self, start: DateTime<Local>) -> PathBuf {
        self.raw_dir
            .join(format!("flightlog_{}.tlog", start.format(FILE_TIMESTAMP_FORMAT)))
    }

    /// Structured log path for a session starting at `start`
    pub fn structured_path(&self, start: DateTime<Local>) -> PathBuf {
        let stamp = match self.scope {
            LogScope::Run => self.run_started,
            LogScope::Session => start,
        };
        self.structured_dir.join(format!(
            "telemetry_{}.{}",
            stamp.format(FILE_TIMESTAMP_FORMAT),
            self.format.extension()
        ))
    }

    /// Open both sinks for a session starting at `start`
    ///
    /// All-or-nothing: if either sink cannot be set up, neither is left
    /// open. Calling this while a session is open keeps the open session.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` if a directory or file cannot be created or
    /// the CSV header cannot be written
    pub fn open_session(&mut self, start: DateTime<Local>) -> Result<SessionPaths, ResourceError> {
        if let Some(active) = &self.active {
            warn!("Session already open since {}, keeping it", active.started_at);
            return Ok(SessionPaths {
                raw: active.raw.path().to_path_buf(),
                structured: active.structured.path().to_path_buf(),
            });
        }

        create_dir(&self.raw_dir)?;
        create_dir(&self.structured_dir)?;

        let raw = create_unique(&self.raw_path(start))?;
        let structured_base = self.structured_path(start);
        let structured = match self.scope {
            LogScope::Run => Sink::open(&structured_base),
            LogScope::Session => create_unique(&structured_base),
        };
        let mut structured = match structured {
            Ok(sink) => sink,
            Err(e) => {
                raw.discard();
                return Err(e);
            }
        };

        let paths = SessionPaths {
            raw: raw.path().to_path_buf(),
            structured: structured.path().to_path_buf(),
        };

        if structured.is_blank() {
            if let Some(header) = self.format.header() {
                if let Err(e) = structured.append_line(header) {
                    raw.discard();
                    structured.discard();
                    return Err(e);
                }
            }
        }

        debug!(
            "Opened session sinks: raw={}, structured={}",
            paths.raw.display(),
            paths.structured.display()
        );

        self.active = Some(ActiveSession {
            started_at: start,
            raw,
            structured,
            rows: 0,
        });

        Ok(paths)
    }

    /// Append verbatim link bytes to the raw recording
    ///
    /// No-op when no session is open.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ResourceError> {
        match self.active.as_mut() {
            Some(active) => active.raw.append(bytes),
            None => Ok(()),
        }
    }

    /// Append one row to the structured log and flush it
    ///
    /// No-op when no session is open.
    pub fn write_row(&mut self, row: &TelemetryRow) -> Result<(), ResourceError> {
        let format = self.format;
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        let line = row.encode(format).map_err(|e| ResourceError::Write {
            path: active.structured.path().to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        active.structured.append_line(&line)?;
        active.rows += 1;
        Ok(())
    }

    /// Flush, fsync and close both sinks
    ///
    /// Idempotent: returns `Ok(None)` when no session is open. Both sinks are
    /// released even if closing the first one fails.
    ///
    /// # Errors
    ///
    /// Returns the first `ResourceError::Sync` encountered
    pub fn close_session(&mut self) -> Result<Option<SessionSummary>, ResourceError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };

        let paths = SessionPaths {
            raw: active.raw.path().to_path_buf(),
            structured: active.structured.path().to_path_buf(),
        };

        let raw_result = active.raw.close();
        let structured_result = active.structured.close();
        let raw_bytes = raw_result?;
        structured_result?;

        Ok(Some(SessionSummary {
            started_at: active.started_at,
            paths,
            raw_bytes,
            rows: active.rows,
        }))
    }
}

/// `base` with `_n` appended to its file stem
fn suffixed(base: &Path, n: u32) -> PathBuf {
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    base.with_file_name(name)
}

/// Create a fresh file at `base`, or at the first free suffixed name
fn create_unique(base: &Path) -> Result<Sink, ResourceError> {
    let mut candidate = base.to_path_buf();
    let mut n = 0;
    loop {
        match Sink::create_new(&candidate) {
            Err(e) if Sink::is_taken(&e) && n < MAX_NAME_SUFFIX => {
                n += 1;
                candidate = suffixed(base, n);
            }
            result => return result,
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), ResourceError> {
    std::fs::create_dir_all(dir).map_err(|source| ResourceError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::logger::CSV_HEADER;
    use crate::telemetry::types::{SampleKind, TelemetrySample};
    use chrono::TimeZone;
    use tempfile::{tempdir, TempDir};

    fn config(dir: &TempDir, format: LogFormat, scope: LogScope) -> RecordingConfig {
        RecordingConfig {
            raw_log_dir: dir.path().join("raw").to_string_lossy().to_string(),
            structured_log_dir: dir.path().join("rows").to_string_lossy().to_string(),
            format,
            structured_scope: scope,
        }
    }

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, hour, min, sec).unwrap()
    }

    fn position_row() -> TelemetryRow {
        TelemetryRow::from_sample(&TelemetrySample::new(SampleKind::Position {
            lat: 1.5,
            lon: 2.5,
            alt_m: 3.5,
        }))
    }

    #[test]
    fn test_paths_are_named_from_timestamps() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Session), at(9, 0, 0));

        let raw = manager.raw_path(at(10, 15, 30));
        assert_eq!(raw.file_name().unwrap(), "flightlog_2024-06-01_10-15-30.tlog");

        let rows = manager.structured_path(at(10, 15, 30));
        assert_eq!(rows.file_name().unwrap(), "telemetry_2024-06-01_10-15-30.csv");
    }

    #[test]
    fn test_run_scope_names_structured_log_from_run_start() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(&config(&dir, LogFormat::Jsonl, LogScope::Run), at(9, 0, 0));

        let rows = manager.structured_path(at(10, 15, 30));
        assert_eq!(rows.file_name().unwrap(), "telemetry_2024-06-01_09-00-00.jsonl");
    }

    #[test]
    fn test_open_write_close() {
        let dir = tempdir().unwrap();
        let mut manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Session), at(9, 0, 0));

        let paths = manager.open_session(at(10, 0, 0)).unwrap();
        assert!(manager.is_open());
        assert_eq!(manager.session_start(), Some(at(10, 0, 0)));

        manager.write_raw(&[0xFE, 0x09]).unwrap();
        manager.write_row(&position_row()).unwrap();

        let summary = manager.close_session().unwrap().unwrap();
        assert!(!manager.is_open());
        assert_eq!(summary.raw_bytes, 2);
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.paths, paths);

        let contents = std::fs::read_to_string(&paths.structured).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(std::fs::read(&paths.raw).unwrap(), vec![0xFE, 0x09]);
    }

    #[test]
    fn test_same_second_sessions_get_separate_files() {
        let dir = tempdir().unwrap();
        let mut manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Session), at(9, 0, 0));

        let first = manager.open_session(at(10, 0, 0)).unwrap();
        manager.write_raw(&[1]).unwrap();
        manager.close_session().unwrap();

        let second = manager.open_session(at(10, 0, 0)).unwrap();
        manager.write_raw(&[2]).unwrap();
        manager.close_session().unwrap();

        assert_ne!(first.raw, second.raw);
        assert_ne!(first.structured, second.structured);
        assert_eq!(second.raw.file_name().unwrap(), "flightlog_2024-06-01_10-00-00_1.tlog");
        assert_eq!(second.structured.file_name().unwrap(), "telemetry_2024-06-01_10-00-00_1.csv");
        assert_eq!(std::fs::read(&first.raw).unwrap(), vec![1]);
        assert_eq!(std::fs::read(&second.raw).unwrap(), vec![2]);
    }

    #[test]
    fn test_suffixed_keeps_extension() {
        let base = Path::new("/logs/flightlog_2024-06-01_10-00-00.tlog");
        assert_eq!(suffixed(base, 3), Path::new("/logs/flightlog_2024-06-01_10-00-00_3.tlog"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Session), at(9, 0, 0));

        assert!(manager.close_session().unwrap().is_none());

        manager.open_session(at(10, 0, 0)).unwrap();
        assert!(manager.close_session().unwrap().is_some());
        assert!(manager.close_session().unwrap().is_none());
        assert!(manager.close_session().unwrap().is_none());
    }

    #[test]
    fn test_writes_without_session_are_noops() {
        let dir = tempdir().unwrap();
        let mut manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Session), at(9, 0, 0));

        manager.write_raw(&[1, 2, 3]).unwrap();
        manager.write_row(&position_row()).unwrap();
        assert!(!dir.path().join("raw").exists());
    }

    #[test]
    fn test_second_open_keeps_existing_session() {
        let dir = tempdir().unwrap();
        let mut manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Session), at(9, 0, 0));

        let first = manager.open_session(at(10, 0, 0)).unwrap();
        let second = manager.open_session(at(10, 5, 0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.session_start(), Some(at(10, 0, 0)));
    }

    #[test]
    fn test_run_scope_header_written_once_across_sessions() {
        let dir = tempdir().unwrap();
        let mut manager = SessionManager::new(&config(&dir, LogFormat::Csv, LogScope::Run), at(9, 0, 0));

        let first = manager.open_session(at(10, 0, 0)).unwrap();
        manager.write_row(&position_row()).unwrap();
        manager.close_session().unwrap();

        let second = manager.open_session(at(11, 0, 0)).unwrap();
        manager.write_row(&position_row()).unwrap();
        manager.close_session().unwrap();

        assert_eq!(first.structured, second.structured);
        assert_ne!(first.raw, second.raw);

        let contents = std::fs::read_to_string(&first.structured).unwrap();
        assert_eq!(contents.lines().filter(|l| *l == CSV_HEADER).count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_structured_failure_leaves_nothing_open() {
        let dir = tempdir().unwrap();
        let mut cfg = config(&dir, LogFormat::Csv, LogScope::Session);
        // A regular file where the structured directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        cfg.structured_log_dir = blocker.join("rows").to_string_lossy().to_string();

        let mut manager = SessionManager::new(&cfg, at(9, 0, 0));
        let err = manager.open_session(at(10, 0, 0)).unwrap_err();
        assert!(matches!(err, ResourceError::CreateDir { .. }));
        assert!(!manager.is_open());
    }

    #[test]
    fn test_structured_open_failure_discards_raw_file() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, LogFormat::Csv, LogScope::Run);
        let mut manager = SessionManager::new(&cfg, at(9, 0, 0));

        // Occupy the structured path with a directory so the file open fails
        let structured = manager.structured_path(at(10, 0, 0));
        std::fs::create_dir_all(&structured).unwrap();

        let err = manager.open_session(at(10, 0, 0)).unwrap_err();
        assert!(matches!(err, ResourceError::Create { .. }));
        assert!(!manager.is_open());
        assert!(!manager.raw_path(at(10, 0, 0)).exists());
    }
}

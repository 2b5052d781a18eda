//! # Structured Telemetry Rows
//!
//! Fixed row schema for the structured telemetry log and its two on-disk
//! encodings (CSV and JSON Lines).

use serde::{Deserialize, Serialize};

use super::types::{SampleKind, TelemetrySample};

/// Column order of the CSV encoding
pub const CSV_HEADER: &str = "timestamp,lat,lon,alt,roll,pitch,yaw,ground_speed,climb,battery_pct";

/// Row timestamp format (local time, millisecond precision)
const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Structured log encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Csv,
    Jsonl,
}

impl LogFormat {
    /// File extension for sinks in this format
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::Jsonl => "jsonl",
        }
    }

    /// Line written once at the top of a new file, if any
    pub fn header(&self) -> Option<&'static str> {
        match self {
            LogFormat::Csv => Some(CSV_HEADER),
            LogFormat::Jsonl => None,
        }
    }
}

/// One structured log row; only the sample's own columns are populated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRow {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climb: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_pct: Option<u8>,
}

impl TelemetryRow {
    fn empty(timestamp: String) -> Self {
        Self {
            timestamp,
            lat: None,
            lon: None,
            alt: None,
            roll: None,
            pitch: None,
            yaw: None,
            ground_speed: None,
            climb: None,
            battery_pct: None,
        }
    }

    /// Map a sample onto the row schema
    pub fn from_sample(sample: &TelemetrySample) -> Self {
        let mut row = Self::empty(sample.captured_at.format(ROW_TIMESTAMP_FORMAT).to_string());

        match sample.kind {
            SampleKind::Position { lat, lon, alt_m } => {
                row.lat = Some(lat);
                row.lon = Some(lon);
                row.alt = Some(alt_m);
            }
            SampleKind::Attitude { roll, pitch, yaw } => {
                row.roll = Some(roll);
                row.pitch = Some(pitch);
                row.yaw = Some(yaw);
            }
            SampleKind::Speed { ground_speed, climb } => {
                row.ground_speed = Some(ground_speed);
                row.climb = Some(climb);
            }
            SampleKind::Battery { remaining_pct } => {
                row.battery_pct = Some(remaining_pct);
            }
        }

        row
    }

    /// Render as a CSV line (no trailing newline)
    ///
    /// Every column is numeric or a timestamp, so no quoting is needed.
    pub fn to_csv(&self) -> String {
        fn cell<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        [
            self.timestamp.clone(),
            cell(self.lat),
            cell(self.lon),
            cell(self.alt),
            cell(self.roll),
            cell(self.pitch),
            cell(self.yaw),
            cell(self.ground_speed),
            cell(self.climb),
            cell(self.battery_pct),
        ]
        .join(",")
    }

    /// Render in the given format (no trailing newline)
    pub fn encode(&self, format: LogFormat) -> serde_json::Result<String> {
        match format {
            LogFormat::Csv => Ok(self.to_csv()),
            LogFormat::Jsonl => serde_json::to_string(self),
        }
    }
}

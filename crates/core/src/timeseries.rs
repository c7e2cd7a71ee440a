//! Sensor stream samples: parsing and validation of uploaded GPS/speed CSV
//! files and button press logs.
//!
//! Parsing is all-or-nothing: the first malformed row rejects the whole file
//! so that a partial series is never stored.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of samples accepted in a single upload.
pub const MAX_SAMPLES_PER_UPLOAD: usize = 500_000;

/// Columns that must be present in a speed CSV header.
pub const REQUIRED_SPEED_COLUMNS: &[&str] = &["timestamp", "speed", "latitude", "longitude"];

// ---------------------------------------------------------------------------
// Sample inputs
// ---------------------------------------------------------------------------

/// One GPS/speed reading as uploaded, before it gets an id and offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSampleInput {
    pub timestamp: f64,
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub accuracy: f64,
}

/// One button state change as uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonSampleInput {
    pub timestamp: f64,
    /// `true` when the button is pressed.
    pub state: bool,
}

impl SpeedSampleInput {
    pub fn validate(&self) -> Result<(), String> {
        require_finite("timestamp", self.timestamp)?;
        require_finite("speed", self.speed)?;
        require_finite("latitude", self.latitude)?;
        require_finite("longitude", self.longitude)?;
        require_finite("altitude", self.altitude)?;
        require_finite("accuracy", self.accuracy)?;
        if self.timestamp < 0.0 {
            return Err(format!("timestamp must be >= 0, got {}", self.timestamp));
        }
        if self.speed < 0.0 {
            return Err(format!("speed must be >= 0, got {}", self.speed));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "latitude must be between -90 and 90, got {}",
                self.latitude
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "longitude must be between -180 and 180, got {}",
                self.longitude
            ));
        }
        if self.accuracy < 0.0 {
            return Err(format!("accuracy must be >= 0, got {}", self.accuracy));
        }
        Ok(())
    }
}

impl ButtonSampleInput {
    pub fn validate(&self) -> Result<(), String> {
        require_finite("timestamp", self.timestamp)?;
        if self.timestamp < 0.0 {
            return Err(format!("timestamp must be >= 0, got {}", self.timestamp));
        }
        Ok(())
    }
}

fn require_finite(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{field} must be a finite number"))
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a speed/GPS CSV file.
///
/// The first non-empty line is a header. `timestamp`, `speed`, `latitude` and
/// `longitude` are required; `altitude` and `accuracy` default to 0 when the
/// column is absent or the cell is empty. Unknown columns are ignored.
pub fn parse_speed_csv(content: &str) -> Result<Vec<SpeedSampleInput>, CoreError> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines
        .next()
        .ok_or_else(|| CoreError::Validation("CSV file is empty".into()))?;
    let header: Vec<String> = header_line
        .trim_start_matches('\u{feff}')
        .split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let column = |name: &str| header.iter().position(|h| h == name);
    let mut required = [0usize; 4];
    for (slot, name) in required.iter_mut().zip(REQUIRED_SPEED_COLUMNS) {
        *slot = column(*name).ok_or_else(|| {
            CoreError::Validation(format!("CSV header is missing required column '{name}'"))
        })?;
    }
    let [ts_col, speed_col, lat_col, lon_col] = required;
    let alt_col = column("altitude");
    let acc_col = column("accuracy");

    let mut samples = Vec::new();
    for (index, line) in lines {
        let row = index + 1;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();

        let sample = SpeedSampleInput {
            timestamp: required_cell(&cells, ts_col, "timestamp", row)?,
            speed: required_cell(&cells, speed_col, "speed", row)?,
            latitude: required_cell(&cells, lat_col, "latitude", row)?,
            longitude: required_cell(&cells, lon_col, "longitude", row)?,
            altitude: optional_cell(&cells, alt_col, "altitude", row)?,
            accuracy: optional_cell(&cells, acc_col, "accuracy", row)?,
        };
        sample
            .validate()
            .map_err(|msg| CoreError::Validation(format!("Row {row}: {msg}")))?;

        samples.push(sample);
        check_sample_count(samples.len())?;
    }

    if samples.is_empty() {
        return Err(CoreError::Validation("CSV file contains no data rows".into()));
    }

    Ok(samples)
}

/// Parse a button press log: one `timestamp,state` pair per line.
///
/// `state` is `1`/`true` for pressed and `0`/`false` for released. Blank lines
/// are skipped.
pub fn parse_button_log(content: &str) -> Result<Vec<ButtonSampleInput>, CoreError> {
    let mut samples = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let row = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (ts, state) = line.split_once(',').ok_or_else(|| {
            CoreError::Validation(format!("Row {row}: expected 'timestamp,state'"))
        })?;
        let timestamp = parse_number(ts.trim(), "timestamp", row)?;
        let state = match state.trim() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(CoreError::Validation(format!(
                    "Row {row}: invalid button state '{other}', expected 1 or 0"
                )))
            }
        };

        let sample = ButtonSampleInput { timestamp, state };
        sample
            .validate()
            .map_err(|msg| CoreError::Validation(format!("Row {row}: {msg}")))?;

        samples.push(sample);
        check_sample_count(samples.len())?;
    }

    if samples.is_empty() {
        return Err(CoreError::Validation("Button data file is empty".into()));
    }

    Ok(samples)
}

fn check_sample_count(count: usize) -> Result<(), CoreError> {
    if count > MAX_SAMPLES_PER_UPLOAD {
        return Err(CoreError::Validation(format!(
            "Upload exceeds the maximum of {MAX_SAMPLES_PER_UPLOAD} samples"
        )));
    }
    Ok(())
}

fn required_cell(cells: &[&str], col: usize, name: &str, row: usize) -> Result<f64, CoreError> {
    match cells.get(col) {
        Some(cell) if !cell.is_empty() => parse_number(cell, name, row),
        _ => Err(CoreError::Validation(format!(
            "Row {row}: missing value for '{name}'"
        ))),
    }
}

fn optional_cell(
    cells: &[&str],
    col: Option<usize>,
    name: &str,
    row: usize,
) -> Result<f64, CoreError> {
    match col.and_then(|c| cells.get(c)) {
        Some(cell) if !cell.is_empty() => parse_number(cell, name, row),
        _ => Ok(0.0),
    }
}

fn parse_number(cell: &str, name: &str, row: usize) -> Result<f64, CoreError> {
    cell.parse::<f64>().map_err(|_| {
        CoreError::Validation(format!(
            "Row {row}: '{cell}' is not a valid number for '{name}'"
        ))
    })
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Total order on raw timestamps, used wherever samples are returned.
pub fn cmp_timestamps(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

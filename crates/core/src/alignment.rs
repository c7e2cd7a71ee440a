//! Timestamp alignment between the video clock and sensor streams.
//!
//! Each series keeps its raw capture timestamps untouched and carries a
//! separate `timestamp_offset`. Setting an offset overwrites the previous value
//! rather than adding to it, so re-aligning with the same value is a no-op.
//! The timestamp shown to clients is `timestamp + timestamp_offset`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which series an offset applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesTarget {
    /// The video's own clock reference (`videos.timestamp_offset`).
    Video,
    /// The GPS / speed samples of the video.
    Speed,
    /// The button press samples of the video.
    Button,
}

impl SeriesTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Speed => "speed",
            Self::Button => "button",
        }
    }
}

/// A sample with a raw timestamp and an adjustable offset.
pub trait Aligned {
    fn raw_timestamp(&self) -> f64;

    fn timestamp_offset(&self) -> f64;

    fn set_timestamp_offset(&mut self, offset: f64);

    fn effective_timestamp(&self) -> f64 {
        effective_timestamp(self.raw_timestamp(), self.timestamp_offset())
    }
}

/// Offsets must be finite. Magnitude is unrestricted because device clocks may
/// report epoch seconds while the video starts at zero.
pub fn validate_offset(offset: f64) -> Result<(), CoreError> {
    if !offset.is_finite() {
        return Err(CoreError::Validation(
            "timestamp offset must be a finite number".into(),
        ));
    }
    Ok(())
}

pub fn effective_timestamp(timestamp: f64, offset: f64) -> f64 {
    timestamp + offset
}

/// Overwrite the offset of every sample in `samples`.
///
/// Raw timestamps are never touched. Returns the number of samples updated.
pub fn apply_offset<T: Aligned>(samples: &mut [T], offset: f64) -> Result<usize, CoreError> {
    validate_offset(offset)?;
    for sample in samples.iter_mut() {
        sample.set_timestamp_offset(offset);
    }
    Ok(samples.len())
}

//! Sensor sample models: GPS/speed readings and button events.

use dashlabel_core::alignment::Aligned;
use dashlabel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `speed_samples` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SpeedSample {
    pub id: DbId,
    pub video_id: DbId,
    pub timestamp: f64,
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub accuracy: f64,
    pub timestamp_offset: f64,
    pub created_at: Timestamp,
}

/// A row from the `button_samples` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ButtonSample {
    pub id: DbId,
    pub video_id: DbId,
    pub timestamp: f64,
    pub state: bool,
    pub timestamp_offset: f64,
    pub created_at: Timestamp,
}

impl Aligned for SpeedSample {
    fn raw_timestamp(&self) -> f64 {
        self.timestamp
    }
    fn timestamp_offset(&self) -> f64 {
        self.timestamp_offset
    }
    fn set_timestamp_offset(&mut self, offset: f64) {
        self.timestamp_offset = offset;
    }
}

impl Aligned for ButtonSample {
    fn raw_timestamp(&self) -> f64 {
        self.timestamp
    }
    fn timestamp_offset(&self) -> f64 {
        self.timestamp_offset
    }
    fn set_timestamp_offset(&mut self, offset: f64) {
        self.timestamp_offset = offset;
    }
}

/// A sample together with its effective (offset-adjusted) timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct AlignedSample<T> {
    #[serde(flatten)]
    pub sample: T,
    pub effective_timestamp: f64,
}

impl<T: Aligned> From<T> for AlignedSample<T> {
    fn from(sample: T) -> Self {
        let effective_timestamp = sample.effective_timestamp();
        Self {
            sample,
            effective_timestamp,
        }
    }
}

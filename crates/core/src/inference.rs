//! Speed inference results and the placeholder predictor.
//!
//! Real inference is produced outside this system. Whatever produces
//! predictions must satisfy [`validate_prediction`]: finite values and a
//! confidence in `[0, 1]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the timeline covered by placeholder predictions, in seconds.
pub const PLACEHOLDER_DURATION_SECS: f64 = 100.0;

/// Spacing between placeholder predictions, in seconds.
pub const PLACEHOLDER_STEP_SECS: f64 = 0.5;

/// Mean and standard deviation of placeholder speeds.
pub const PLACEHOLDER_SPEED_MEAN: f64 = 30.0;
pub const PLACEHOLDER_SPEED_STD_DEV: f64 = 5.0;

/// Range of placeholder confidences.
pub const PLACEHOLDER_MIN_CONFIDENCE: f64 = 0.8;
pub const PLACEHOLDER_MAX_CONFIDENCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One predicted speed at a point on the video timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: f64,
    pub predicted_speed: f64,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_prediction(p: &Prediction) -> Result<(), CoreError> {
    if !p.timestamp.is_finite() || p.timestamp < 0.0 {
        return Err(CoreError::Validation(format!(
            "prediction timestamp must be a finite number >= 0, got {}",
            p.timestamp
        )));
    }
    if !p.predicted_speed.is_finite() {
        return Err(CoreError::Validation(
            "predicted_speed must be a finite number".into(),
        ));
    }
    if !(0.0..=1.0).contains(&p.confidence) {
        return Err(CoreError::Validation(format!(
            "confidence must be between 0 and 1, got {}",
            p.confidence
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Placeholder predictor
// ---------------------------------------------------------------------------

/// Generate a placeholder prediction track: one point every
/// [`PLACEHOLDER_STEP_SECS`] over `[0, PLACEHOLDER_DURATION_SECS)`.
pub fn placeholder_predictions<R: Rng>(rng: &mut R) -> Vec<Prediction> {
    let count = (PLACEHOLDER_DURATION_SECS / PLACEHOLDER_STEP_SECS) as usize;
    (0..count)
        .map(|i| {
            let timestamp = i as f64 * PLACEHOLDER_STEP_SECS;
            let speed =
                PLACEHOLDER_SPEED_MEAN + PLACEHOLDER_SPEED_STD_DEV * standard_normal(rng);
            let confidence =
                rng.random_range(PLACEHOLDER_MIN_CONFIDENCE..PLACEHOLDER_MAX_CONFIDENCE);
            Prediction {
                timestamp,
                predicted_speed: speed.max(0.0),
                confidence,
            }
        })
        .collect()
}

/// Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - u keeps the argument of ln in (0, 1].
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn placeholder_covers_timeline() {
        let mut rng = StdRng::seed_from_u64(7);
        let preds = placeholder_predictions(&mut rng);
        assert_eq!(preds.len(), 200);
        assert_eq!(preds[0].timestamp, 0.0);
        assert_eq!(preds[199].timestamp, 99.5);
    }

    #[test]
    fn placeholder_predictions_are_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        for p in placeholder_predictions(&mut rng) {
            validate_prediction(&p).unwrap();
            assert!(p.confidence >= PLACEHOLDER_MIN_CONFIDENCE);
            assert!(p.predicted_speed >= 0.0);
        }
    }

    #[test]
    fn placeholder_mean_is_near_thirty() {
        let mut rng = StdRng::seed_from_u64(1);
        let preds = placeholder_predictions(&mut rng);
        let mean = preds.iter().map(|p| p.predicted_speed).sum::<f64>() / preds.len() as f64;
        assert!((mean - PLACEHOLDER_SPEED_MEAN).abs() < 2.0, "mean was {mean}");
    }

    #[test]
    fn confidence_out_of_range_rejected() {
        let p = Prediction {
            timestamp: 1.0,
            predicted_speed: 10.0,
            confidence: 1.2,
        };
        assert!(validate_prediction(&p).is_err());
        let p = Prediction {
            confidence: -0.1,
            ..p
        };
        assert!(validate_prediction(&p).is_err());
    }

    #[test]
    fn boundary_confidences_accepted() {
        for confidence in [0.0, 1.0] {
            let p = Prediction {
                timestamp: 0.0,
                predicted_speed: 0.0,
                confidence,
            };
            assert!(validate_prediction(&p).is_ok());
        }
    }
}

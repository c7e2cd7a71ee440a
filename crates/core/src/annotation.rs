//! Per-timestamp annotation inputs and validation.
//!
//! Annotations are committed in batches. A batch is validated as a whole
//! before anything is stored; one bad entry rejects all of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of annotations in a single commit.
pub const MAX_ANNOTATIONS_PER_COMMIT: usize = 10_000;

/// Maximum length of the free-text notes field.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Maximum length of a label.
pub const MAX_LABEL_LENGTH: usize = 100;

/// Maximum number of tags per annotation.
pub const MAX_TAGS: usize = 32;

/// Maximum number of keys in the extension map.
pub const MAX_EXTRA_KEYS: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structured metadata attached to an annotation.
///
/// Known fields are typed. Anything else goes into `extra`, an explicit
/// extension map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single annotation as submitted by the lock holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationInput {
    /// Raw timestamp on the video timeline, in seconds.
    pub timestamp: f64,
    pub speed: f64,
    pub button_state: bool,
    #[serde(default)]
    pub error_detected: bool,
    #[serde(default)]
    pub metadata: AnnotationMetadata,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AnnotationMetadata {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(label) = &self.label {
            if label.trim().is_empty() {
                return Err("label must not be blank".into());
            }
            if label.chars().count() > MAX_LABEL_LENGTH {
                return Err(format!("label exceeds {MAX_LABEL_LENGTH} characters"));
            }
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LENGTH {
                return Err(format!("notes exceed {MAX_NOTES_LENGTH} characters"));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(format!("at most {MAX_TAGS} tags are allowed"));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err("tags must not be blank".into());
        }
        if self.extra.len() > MAX_EXTRA_KEYS {
            return Err(format!("at most {MAX_EXTRA_KEYS} extra keys are allowed"));
        }
        Ok(())
    }
}

impl AnnotationInput {
    pub fn validate(&self) -> Result<(), String> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(format!(
                "timestamp must be a finite number >= 0, got {}",
                self.timestamp
            ));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(format!(
                "speed must be a finite number >= 0, got {}",
                self.speed
            ));
        }
        self.metadata.validate()
    }
}

/// Validate a whole commit batch, reporting the index of the first bad entry.
pub fn validate_batch(inputs: &[AnnotationInput]) -> Result<(), CoreError> {
    if inputs.len() > MAX_ANNOTATIONS_PER_COMMIT {
        return Err(CoreError::Validation(format!(
            "A commit may contain at most {MAX_ANNOTATIONS_PER_COMMIT} annotations, got {}",
            inputs.len()
        )));
    }
    for (i, input) in inputs.iter().enumerate() {
        input
            .validate()
            .map_err(|msg| CoreError::Validation(format!("annotations[{i}]: {msg}")))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn input(timestamp: f64, speed: f64) -> AnnotationInput {
        AnnotationInput {
            timestamp,
            speed,
            button_state: false,
            error_detected: false,
            metadata: AnnotationMetadata::default(),
        }
    }

    #[test]
    fn minimal_json_deserializes_with_defaults() {
        let json = r#"{"timestamp": 10.0, "speed": 25.5, "button_state": false}"#;
        let parsed: AnnotationInput = serde_json::from_str(json).unwrap();
        assert!(!parsed.error_detected);
        assert_eq!(parsed.metadata, AnnotationMetadata::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn metadata_extension_map_round_trips() {
        let json = r#"{
            "timestamp": 1.0, "speed": 2.0, "button_state": true,
            "metadata": {"label": "overtake", "tags": ["night"], "extra": {"lane": 2}}
        }"#;
        let parsed: AnnotationInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.metadata.label.as_deref(), Some("overtake"));
        assert_eq!(parsed.metadata.extra["lane"], serde_json::json!(2));
    }

    #[test]
    fn negative_speed_rejected() {
        assert!(input(1.0, -0.5).validate().is_err());
    }

    #[test]
    fn non_finite_timestamp_rejected() {
        assert!(input(f64::NAN, 1.0).validate().is_err());
        assert!(input(f64::INFINITY, 1.0).validate().is_err());
    }

    #[test]
    fn batch_reports_first_bad_index() {
        let batch = vec![input(1.0, 1.0), input(2.0, 2.0), input(-3.0, 3.0)];
        assert_matches!(
            validate_batch(&batch),
            Err(CoreError::Validation(msg)) if msg.starts_with("annotations[2]")
        );
    }

    #[test]
    fn empty_batch_is_valid() {
        assert!(validate_batch(&[]).is_ok());
    }

    #[test]
    fn blank_tag_rejected() {
        let mut a = input(1.0, 1.0);
        a.metadata.tags = vec!["ok".into(), "  ".into()];
        assert!(a.validate().is_err());
    }

    #[test]
    fn long_notes_rejected() {
        let mut a = input(1.0, 1.0);
        a.metadata.notes = Some("x".repeat(MAX_NOTES_LENGTH + 1));
        assert!(a.validate().is_err());
    }
}

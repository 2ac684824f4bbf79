//! Session history records.
//!
//! A record is appended when a session ends (completed or abandoned) and is
//! immutable afterwards except for the user's rating/notes feedback.

use crate::error::{ReposeError, Result};
use crate::session::model::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable history record of one ended session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_id: Option<String>,
    #[serde(rename = "startedAtEpochMs", with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(
        rename = "completedAtEpochMs",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_duration_ms: i64,
    pub zones_completed: u32,
    pub total_zones: u32,
    pub completed_zone_ids: Vec<String>,
    pub average_intensity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completed: bool,
    pub used_circuit_mode: bool,
    pub used_voice_instructions: bool,
}

impl SessionRecord {
    /// Builds a record from a final session state.
    ///
    /// `completed_at` is `Some` only for successfully completed sessions;
    /// abandoned sessions keep it empty.
    pub fn from_state(
        id: String,
        user_id: String,
        practice_id: Option<String>,
        state: &SessionState,
        completed: bool,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            practice_id,
            started_at: state.session_started_at,
            completed_at: completed.then_some(ended_at),
            total_duration_ms: state.session_elapsed.as_millis() as i64,
            zones_completed: state.zones_completed() as u32,
            total_zones: state.zones.len() as u32,
            completed_zone_ids: state.completed_zone_ids(),
            average_intensity: state.intensity_level.as_str().to_string(),
            rating: None,
            notes: None,
            completed,
            used_circuit_mode: state.circuit_mode_active,
            used_voice_instructions: state.voice_instructions_active,
        }
    }
}

/// The only mutation a stored record permits: the user's feedback.
///
/// An explicit typed patch rather than a free-form field map, so the update
/// path cannot touch anything else in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFeedback {
    /// Rating from 1 to 5.
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

impl RecordFeedback {
    /// Validates the feedback before it reaches a store.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the rating is outside 1..=5.
    pub fn validate(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(ReposeError::validation(format!(
                    "rating must be between 1 and 5, got {rating}"
                )));
            }
        }
        Ok(())
    }
}

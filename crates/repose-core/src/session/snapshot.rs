//! Checkpoint snapshot format and restore reconciliation.
//!
//! A snapshot is the persisted wire form of a [`SessionState`]. Restore
//! reconciles a saved snapshot against the *current* zone catalog with a
//! deliberate fail-soft policy: the catalog is authoritative, unknown
//! labels degrade to defaults, and a restore never fails on bad field
//! content.

use super::model::SessionState;
use crate::error::{ReposeError, Result};
use crate::zone::{Intensity, Zone, ZoneDefinition, ZoneState};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Persisted snapshot of an in-progress session.
///
/// Intensity and zone states are serialized as plain string labels so that
/// a label this version does not recognize degrades to a default on
/// restore instead of failing document deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSnapshot {
    pub current_zone_index: usize,
    pub zone_time_remaining_ms: i64,
    pub zone_repetitions_remaining: u32,
    pub completed_zone_ids: Vec<String>,
    /// Zone id -> zone state label.
    pub zone_states: HashMap<String, String>,
    pub intensity_level: String,
    pub media_position_ms: i64,
    pub circuit_mode_active: bool,
    pub voice_instructions_active: bool,
    pub session_duration_ms: i64,
    pub session_started_at_epoch_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at_epoch_ms: Option<i64>,
}

/// A stored checkpoint: the snapshot plus its key and save time.
///
/// At most one checkpoint exists per `(user, practice)` key; a new save
/// always supersedes the prior one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub user_id: String,
    pub practice_id: String,
    pub snapshot: CheckpointSnapshot,
    #[serde(rename = "savedAtEpochMs", with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
}

impl CheckpointSnapshot {
    /// Captures the persisted form of a session state.
    pub fn capture(state: &SessionState) -> Self {
        Self {
            current_zone_index: state.current_zone_index,
            zone_time_remaining_ms: state.zone_time_remaining.as_millis() as i64,
            zone_repetitions_remaining: state.zone_repetitions_remaining,
            completed_zone_ids: state.completed_zone_ids(),
            zone_states: state
                .zones
                .iter()
                .map(|z| (z.id.clone(), z.state.as_str().to_string()))
                .collect(),
            intensity_level: state.intensity_level.as_str().to_string(),
            media_position_ms: state.media_position.as_millis() as i64,
            circuit_mode_active: state.circuit_mode_active,
            voice_instructions_active: state.voice_instructions_active,
            session_duration_ms: state.session_elapsed.as_millis() as i64,
            session_started_at_epoch_ms: state.session_started_at.timestamp_millis(),
            paused_at_epoch_ms: state.paused_at.map(|t| t.timestamp_millis()),
        }
    }

    /// Rebuilds a session state from this snapshot against the current
    /// catalog.
    ///
    /// Reconciliation policy:
    /// - zones in the snapshot but absent from the catalog are dropped
    ///   silently (the catalog is authoritative)
    /// - zones in the catalog but absent from the snapshot start `Pending`
    /// - unrecognized intensity or zone-state labels fall back to `Medium`
    ///   and `Pending`
    /// - a current index beyond the catalog is clamped to the last zone
    ///
    /// # Errors
    ///
    /// Returns a validation error only for an empty catalog; bad field
    /// content never fails the restore.
    pub fn restore(&self, catalog: &[ZoneDefinition]) -> Result<SessionState> {
        if catalog.is_empty() {
            return Err(ReposeError::validation(
                "cannot restore a session against an empty zone catalog",
            ));
        }

        let mut zones: Vec<Zone> = catalog
            .iter()
            .map(|def| {
                let mut zone = Zone::from(def);
                zone.state = self
                    .zone_states
                    .get(&def.id)
                    .map(|label| ZoneState::parse_or_default(label))
                    .unwrap_or_default();
                if self.completed_zone_ids.contains(&def.id) {
                    zone.state = ZoneState::Completed;
                }
                zone
            })
            .collect();

        let current_zone_index = self.current_zone_index.min(zones.len() - 1);
        // The session must have a zone to stand on after reconciliation.
        if zones[current_zone_index].state == ZoneState::Pending {
            zones[current_zone_index].state = ZoneState::Active;
        }
        let completed = zones.iter().all(|z| z.state == ZoneState::Completed);

        Ok(SessionState {
            zones,
            current_zone_index,
            zone_time_remaining: millis_to_duration(self.zone_time_remaining_ms),
            zone_repetitions_remaining: self.zone_repetitions_remaining,
            intensity_level: Intensity::parse_or_default(&self.intensity_level),
            media_position: millis_to_duration(self.media_position_ms),
            session_started_at: epoch_ms(self.session_started_at_epoch_ms),
            session_elapsed: millis_to_duration(self.session_duration_ms),
            circuit_mode_active: self.circuit_mode_active,
            voice_instructions_active: self.voice_instructions_active,
            paused_at: self.paused_at_epoch_ms.map(epoch_ms),
            completed,
        })
    }
}

fn millis_to_duration(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

fn epoch_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

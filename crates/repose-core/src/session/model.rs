//! Session state domain model.

use crate::zone::{Intensity, Zone, ZoneState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The full in-memory state of one guided session.
///
/// Created when a session starts, mutated only by the state machine (and
/// the circuit scheduler driving it), and discarded on completion or
/// explicit abandonment. The UI observes read-only clones of this value.
///
/// Remaining time and repetitions are stored as *remaining counts*, not as
/// absolute end-timestamps: suspending the app and resuming days later must
/// show exactly the remaining time captured at suspension, never "catch up".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Ordered zones of this session.
    pub zones: Vec<Zone>,
    /// Index of the zone currently active (or awaiting advance).
    pub current_zone_index: usize,
    /// Time remaining in the current zone.
    pub zone_time_remaining: Duration,
    /// Repetitions remaining in the current zone.
    pub zone_repetitions_remaining: u32,
    /// Session-wide intensity selected by the user.
    pub intensity_level: Intensity,
    /// Playback position of the accompanying media track.
    pub media_position: Duration,
    /// Wall-clock instant the session started.
    pub session_started_at: DateTime<Utc>,
    /// Accumulated active (ticking) time across the whole session.
    pub session_elapsed: Duration,
    /// Whether circuit mode (automatic zone advancement) is on.
    pub circuit_mode_active: bool,
    /// Whether voice instructions are on.
    pub voice_instructions_active: bool,
    /// Set while the session is suspended; `tick` is ignored until resume.
    pub paused_at: Option<DateTime<Utc>>,
    /// True once the last zone has been completed.
    pub completed: bool,
}

impl SessionState {
    /// Returns the currently indexed zone.
    pub fn current_zone(&self) -> Option<&Zone> {
        self.zones.get(self.current_zone_index)
    }

    /// IDs of all completed zones, in catalog order.
    pub fn completed_zone_ids(&self) -> Vec<String> {
        self.zones
            .iter()
            .filter(|z| z.state == ZoneState::Completed)
            .map(|z| z.id.clone())
            .collect()
    }

    /// Number of completed zones.
    pub fn zones_completed(&self) -> usize {
        self.zones
            .iter()
            .filter(|z| z.state == ZoneState::Completed)
            .count()
    }

    /// Whether the session is currently suspended.
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}

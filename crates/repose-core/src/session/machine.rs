//! Zone session state machine.
//!
//! Owns the in-memory progression of a single guided session through an
//! ordered list of zones. The machine never advances zones on its own:
//! manual navigation or the circuit scheduler decides when the next zone
//! becomes active.

use super::model::SessionState;
use crate::error::{ReposeError, Result};
use crate::zone::{Zone, ZoneDefinition, ZoneState};
use crate::Intensity;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;

/// Outcome of completing the current zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneCompletion {
    /// The completed zone was the last one; the whole session is done.
    SessionCompleted,
    /// More zones remain; the session waits for an explicit or scheduled
    /// advance.
    AwaitingAdvance,
}

/// State machine for one guided multi-zone session.
#[derive(Debug, Clone)]
pub struct ZoneSessionStateMachine {
    state: SessionState,
}

impl ZoneSessionStateMachine {
    /// Starts a new session over the given catalog zones.
    ///
    /// All zones begin `Pending` and the first becomes `Active` with its
    /// planned duration and repetitions loaded.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the catalog is empty or contains
    /// blank or duplicate zone ids.
    pub fn start(catalog: &[ZoneDefinition], started_at: DateTime<Utc>) -> Result<Self> {
        if catalog.is_empty() {
            return Err(ReposeError::validation(
                "cannot start a session with an empty zone list",
            ));
        }
        let mut seen = HashSet::new();
        for def in catalog {
            if def.id.trim().is_empty() {
                return Err(ReposeError::validation("zone id must not be blank"));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(ReposeError::validation(format!(
                    "duplicate zone id '{}'",
                    def.id
                )));
            }
        }

        let mut zones: Vec<Zone> = catalog.iter().map(Zone::from).collect();
        zones[0].state = ZoneState::Active;
        let state = SessionState {
            zone_time_remaining: zones[0].planned_duration,
            zone_repetitions_remaining: zones[0].planned_repetitions,
            zones,
            current_zone_index: 0,
            intensity_level: Intensity::default(),
            media_position: Duration::ZERO,
            session_started_at: started_at,
            session_elapsed: Duration::ZERO,
            circuit_mode_active: false,
            voice_instructions_active: false,
            paused_at: None,
            completed: false,
        };
        Ok(Self { state })
    }

    /// Wraps a previously captured state, e.g. one produced by checkpoint
    /// restore.
    pub fn resume(state: SessionState) -> Self {
        Self { state }
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Consumes the machine, yielding the final state.
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Advances session and zone timers by `delta`.
    ///
    /// The zone timer saturates at zero and never advances zones by itself.
    /// Ignored while the session is paused or after completion.
    pub fn tick(&mut self, delta: Duration) {
        if self.state.completed || self.state.is_paused() {
            return;
        }
        self.state.zone_time_remaining = self.state.zone_time_remaining.saturating_sub(delta);
        self.state.session_elapsed += delta;
    }

    /// Marks the active zone `Completed`.
    ///
    /// If it was the last zone the whole session completes; otherwise the
    /// session stays on the completed zone until an explicit
    /// [`advance_to_next_zone`](Self::advance_to_next_zone).
    ///
    /// # Errors
    ///
    /// Returns a validation error if the session has already completed.
    pub fn complete_current_zone(&mut self) -> Result<ZoneCompletion> {
        if self.state.completed {
            return Err(ReposeError::validation("session is already completed"));
        }
        let index = self.state.current_zone_index;
        self.state.zones[index].state = ZoneState::Completed;

        if index + 1 == self.state.zones.len() {
            self.state.completed = true;
            Ok(ZoneCompletion::SessionCompleted)
        } else {
            Ok(ZoneCompletion::AwaitingAdvance)
        }
    }

    /// Activates the zone after the current one.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the current zone has not been
    /// completed or no zone remains.
    pub fn advance_to_next_zone(&mut self) -> Result<()> {
        let index = self.state.current_zone_index;
        if self.state.zones[index].state != ZoneState::Completed {
            return Err(ReposeError::validation(
                "cannot advance past a zone that is not completed",
            ));
        }
        let next = index + 1;
        if next >= self.state.zones.len() {
            return Err(ReposeError::validation("no zone remains to advance to"));
        }
        self.activate_zone(next);
        Ok(())
    }

    /// Explicit jump used by manual navigation.
    ///
    /// Progression is monotonic: jumping backwards is rejected. Checkpoint
    /// restore rebuilds the state directly and is the only path that may
    /// land on an earlier index.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `index` is out of bounds or earlier
    /// than the current zone.
    pub fn advance_to_zone(&mut self, index: usize) -> Result<()> {
        if index >= self.state.zones.len() {
            return Err(ReposeError::validation(format!(
                "zone index {} out of range (0..{})",
                index,
                self.state.zones.len()
            )));
        }
        if index < self.state.current_zone_index {
            return Err(ReposeError::validation(format!(
                "zone index {} would move the session backwards (current {})",
                index, self.state.current_zone_index
            )));
        }
        if index == self.state.current_zone_index {
            return Ok(());
        }
        // Leaving an unfinished zone returns it to Pending.
        let current = self.state.current_zone_index;
        if self.state.zones[current].state == ZoneState::Active {
            self.state.zones[current].state = ZoneState::Pending;
        }
        self.activate_zone(index);
        Ok(())
    }

    /// Decrements the repetition counter for the current zone, floored at 0.
    pub fn record_repetition(&mut self) {
        self.state.zone_repetitions_remaining =
            self.state.zone_repetitions_remaining.saturating_sub(1);
    }

    /// Sets the session-wide intensity level.
    pub fn set_intensity(&mut self, level: Intensity) {
        self.state.intensity_level = level;
    }

    /// Updates the media playback position.
    pub fn set_media_position(&mut self, position: Duration) {
        self.state.media_position = position;
    }

    /// Toggles circuit mode on the state.
    pub fn set_circuit_mode(&mut self, active: bool) {
        self.state.circuit_mode_active = active;
    }

    /// Toggles voice instructions on the state.
    pub fn set_voice_instructions(&mut self, active: bool) {
        self.state.voice_instructions_active = active;
    }

    /// Suspends the session at `now`. Ticks are ignored until resume, so
    /// the remaining zone time is exactly preserved across the suspension.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.state.paused_at.is_none() && !self.state.completed {
            self.state.paused_at = Some(now);
        }
    }

    /// Resumes a suspended session.
    pub fn unpause(&mut self) {
        self.state.paused_at = None;
    }

    fn activate_zone(&mut self, index: usize) {
        self.state.zones[index].state = ZoneState::Active;
        self.state.current_zone_index = index;
        self.state.zone_time_remaining = self.state.zones[index].planned_duration;
        self.state.zone_repetitions_remaining = self.state.zones[index].planned_repetitions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn catalog(n: usize) -> Vec<ZoneDefinition> {
        (0..n)
            .map(|i| ZoneDefinition {
                id: format!("zone-{i}"),
                name: format!("Zone {i}"),
                planned_duration: Duration::from_secs(60),
                planned_repetitions: 3,
                recommended_intensity: Intensity::Medium,
            })
            .collect()
    }

    fn started_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn start_rejects_empty_catalog() {
        let err = ZoneSessionStateMachine::start(&[], started_at()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn start_rejects_duplicate_zone_ids() {
        let mut defs = catalog(2);
        defs[1].id = defs[0].id.clone();
        let err = ZoneSessionStateMachine::start(&defs, started_at()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn start_activates_first_zone_only() {
        let machine = ZoneSessionStateMachine::start(&catalog(3), started_at()).unwrap();
        let state = machine.state();
        assert_eq!(state.zones[0].state, ZoneState::Active);
        assert_eq!(state.zones[1].state, ZoneState::Pending);
        assert_eq!(state.zones[2].state, ZoneState::Pending);
        assert_eq!(state.current_zone_index, 0);
        assert_eq!(state.zone_time_remaining, Duration::from_secs(60));
        assert_eq!(state.zone_repetitions_remaining, 3);
        assert!(!state.completed);
    }

    #[test]
    fn tick_saturates_at_zero() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(1), started_at()).unwrap();
        machine.tick(Duration::from_secs(59));
        assert_eq!(machine.state().zone_time_remaining, Duration::from_secs(1));
        machine.tick(Duration::from_secs(30));
        assert_eq!(machine.state().zone_time_remaining, Duration::ZERO);
        assert_eq!(machine.state().session_elapsed, Duration::from_secs(89));
    }

    #[test]
    fn tick_is_ignored_while_paused() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(1), started_at()).unwrap();
        machine.pause(started_at());
        machine.tick(Duration::from_secs(30));
        assert_eq!(machine.state().zone_time_remaining, Duration::from_secs(60));
        machine.unpause();
        machine.tick(Duration::from_secs(30));
        assert_eq!(machine.state().zone_time_remaining, Duration::from_secs(30));
    }

    #[test]
    fn completing_a_middle_zone_awaits_advance() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(3), started_at()).unwrap();
        let outcome = machine.complete_current_zone().unwrap();
        assert_eq!(outcome, ZoneCompletion::AwaitingAdvance);
        // Next zone is not active until explicitly advanced.
        assert_eq!(machine.state().zones[1].state, ZoneState::Pending);
        machine.advance_to_next_zone().unwrap();
        assert_eq!(machine.state().zones[1].state, ZoneState::Active);
        assert_eq!(machine.state().current_zone_index, 1);
    }

    #[test]
    fn completing_the_last_zone_completes_the_session() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(2), started_at()).unwrap();
        machine.complete_current_zone().unwrap();
        machine.advance_to_next_zone().unwrap();
        let outcome = machine.complete_current_zone().unwrap();
        assert_eq!(outcome, ZoneCompletion::SessionCompleted);
        assert!(machine.state().completed);
        assert_eq!(machine.state().zones_completed(), 2);
    }

    #[test]
    fn advance_requires_completed_current_zone() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(2), started_at()).unwrap();
        assert!(machine.advance_to_next_zone().unwrap_err().is_validation());
    }

    #[test]
    fn advance_to_zone_rejects_out_of_range() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(2), started_at()).unwrap();
        assert!(machine.advance_to_zone(2).unwrap_err().is_validation());
    }

    #[test]
    fn advance_to_zone_never_decreases_the_index() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(3), started_at()).unwrap();
        machine.advance_to_zone(2).unwrap();
        assert_eq!(machine.state().current_zone_index, 2);
        assert!(machine.advance_to_zone(0).unwrap_err().is_validation());
        assert_eq!(machine.state().current_zone_index, 2);
    }

    #[test]
    fn manual_jump_returns_unfinished_zone_to_pending() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(3), started_at()).unwrap();
        machine.advance_to_zone(1).unwrap();
        assert_eq!(machine.state().zones[0].state, ZoneState::Pending);
        assert_eq!(machine.state().zones[1].state, ZoneState::Active);
        assert_eq!(machine.state().zone_time_remaining, Duration::from_secs(60));
    }

    #[test]
    fn record_repetition_floors_at_zero() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(1), started_at()).unwrap();
        for _ in 0..5 {
            machine.record_repetition();
        }
        assert_eq!(machine.state().zone_repetitions_remaining, 0);
    }

    #[test]
    fn set_intensity_has_no_side_effects() {
        let mut machine = ZoneSessionStateMachine::start(&catalog(2), started_at()).unwrap();
        let before = machine.state().clone();
        machine.set_intensity(Intensity::High);
        let after = machine.state();
        assert_eq!(after.intensity_level, Intensity::High);
        assert_eq!(after.zones, before.zones);
        assert_eq!(after.current_zone_index, before.current_zone_index);
        assert_eq!(after.zone_time_remaining, before.zone_time_remaining);
    }
}

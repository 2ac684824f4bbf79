//! Zone domain models.
//!
//! A zone is one ordered step of a guided multi-step practice session
//! (e.g., a body region or a pose). Zone definitions come from an external
//! catalog and are immutable once a session starts; only the runtime
//! [`ZoneState`] changes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session intensity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
}

impl Intensity {
    /// Stable wire label, used in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "Low",
            Intensity::Medium => "Medium",
            Intensity::High => "High",
        }
    }

    /// Parses a wire label, falling back to [`Intensity::Medium`] for
    /// anything unrecognized. Checkpoint restore relies on this fail-soft
    /// behavior: an unknown label degrades instead of failing the restore.
    pub fn parse_or_default(label: &str) -> Self {
        match label {
            "Low" => Intensity::Low,
            "High" => Intensity::High,
            _ => Intensity::Medium,
        }
    }
}

/// Runtime state of a single zone within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ZoneState {
    #[default]
    Pending,
    Active,
    Completed,
}

impl ZoneState {
    /// Stable wire label, used in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneState::Pending => "Pending",
            ZoneState::Active => "Active",
            ZoneState::Completed => "Completed",
        }
    }

    /// Parses a wire label, falling back to [`ZoneState::Pending`] for
    /// anything unrecognized.
    pub fn parse_or_default(label: &str) -> Self {
        match label {
            "Active" => ZoneState::Active,
            "Completed" => ZoneState::Completed,
            _ => ZoneState::Pending,
        }
    }
}

/// An entry of the external zone catalog.
///
/// The catalog is the authoritative, ordered list of zones for a practice.
/// The core never mutates definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    /// Unique zone identifier within the practice.
    pub id: String,
    /// Human-readable zone name.
    pub name: String,
    /// Planned time to spend in this zone.
    pub planned_duration: Duration,
    /// Planned repetitions for this zone (0 for time-only zones).
    pub planned_repetitions: u32,
    /// Catalog-recommended intensity for this zone.
    pub recommended_intensity: Intensity,
}

/// A zone as it appears inside a running session: the definition fields
/// plus the runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub planned_duration: Duration,
    pub planned_repetitions: u32,
    pub recommended_intensity: Intensity,
    pub state: ZoneState,
}

impl From<&ZoneDefinition> for Zone {
    fn from(def: &ZoneDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            planned_duration: def.planned_duration,
            planned_repetitions: def.planned_repetitions,
            recommended_intensity: def.recommended_intensity,
            state: ZoneState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_labels_round_trip() {
        for intensity in [Intensity::Low, Intensity::Medium, Intensity::High] {
            assert_eq!(Intensity::parse_or_default(intensity.as_str()), intensity);
        }
    }

    #[test]
    fn unknown_intensity_degrades_to_medium() {
        assert_eq!(Intensity::parse_or_default("Extreme"), Intensity::Medium);
        assert_eq!(Intensity::parse_or_default(""), Intensity::Medium);
    }

    #[test]
    fn unknown_zone_state_degrades_to_pending() {
        assert_eq!(ZoneState::parse_or_default("Paused"), ZoneState::Pending);
    }
}

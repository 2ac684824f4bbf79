//! Aggregate statistics domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user aggregate totals, one row per user.
///
/// Created lazily on first completion and mutated exclusively through the
/// versioned compare-and-swap path of the stats engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub user_id: String,
    pub total_sessions: u32,
    pub total_minutes: u64,
    pub streak_days: u32,
    #[serde(
        rename = "lastSessionAtEpochMs",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_session_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAtEpochMs", with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl AggregateStats {
    /// The empty aggregate for a user who has no completions yet.
    pub fn empty(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_sessions: 0,
            total_minutes: 0,
            streak_days: 0,
            last_session_at: None,
            updated_at: now,
        }
    }
}

/// An aggregate row paired with its version marker.
///
/// The version is what makes the no-lost-update property provable: a write
/// is accepted only if the version it read is still current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedStats {
    pub version: u64,
    pub stats: AggregateStats,
}

//! Aggregate statistics domain module.
//!
//! - `model`: per-user aggregate row and its versioned wrapper
//! - `streak`: pure day-streak calendar math
//! - `repository`: versioned storage trait with compare-and-swap
//! - `engine`: bounded-retry optimistic-concurrency increment path

mod engine;
mod model;
mod repository;
pub mod streak;

pub use engine::{AggregateStatsEngine, DEFAULT_MAX_ATTEMPTS, StatsIncrement};
pub use model::{AggregateStats, VersionedStats};
pub use repository::StatsRepository;
pub use streak::StreakUpdate;

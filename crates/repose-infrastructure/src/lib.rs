//! Repose infrastructure.
//!
//! JSON-file implementations of the `repose-core` repository traits,
//! mirroring the document layout of the remote store the app syncs with:
//!
//! - [`JsonCheckpointRepository`]: one checkpoint per `(user, practice)`
//!   key, last-write-wins, with TTL cleanup
//! - [`JsonSessionRecordRepository`]: append-only session history
//! - [`JsonStatsRepository`]: versioned aggregate row with a file-locked
//!   compare-and-swap

mod atomic_json;
mod json_checkpoint_repository;
mod json_session_record_repository;
mod json_stats_repository;
mod paths;

pub use atomic_json::AtomicJsonFile;
pub use json_checkpoint_repository::JsonCheckpointRepository;
pub use json_session_record_repository::JsonSessionRecordRepository;
pub use json_stats_repository::JsonStatsRepository;
pub use paths::ReposePaths;

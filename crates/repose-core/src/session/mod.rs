//! Session domain module.
//!
//! Contains the session state model, the zone session state machine, the
//! checkpoint snapshot format, history records, and the repository traits
//! for persisting all of them.
//!
//! # Module Structure
//!
//! - `model`: in-memory session state (`SessionState`)
//! - `machine`: zone progression state machine (`ZoneSessionStateMachine`)
//! - `snapshot`: persisted checkpoint format and restore reconciliation
//! - `record`: session history records and the feedback patch
//! - `repository`: persistence traits (`CheckpointRepository`,
//!   `SessionRecordRepository`)

mod machine;
mod model;
mod record;
mod repository;
mod snapshot;

pub use machine::{ZoneCompletion, ZoneSessionStateMachine};
pub use model::SessionState;
pub use record::{RecordFeedback, SessionRecord};
pub use repository::{CheckpointRepository, SessionRecordRepository};
pub use snapshot::{Checkpoint, CheckpointSnapshot};

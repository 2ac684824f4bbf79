//! Repose core domain.
//!
//! The session-continuity core of a personal wellness application: the
//! zone session state machine, checkpoint snapshots and their fail-soft
//! restore, day-streak calculation, session history records, and the
//! versioned aggregate-stats engine. Everything here is storage-agnostic;
//! persistence goes through the repository traits implemented by
//! `repose-infrastructure`.

pub mod clock;
pub mod error;
pub mod session;
pub mod stats;
pub mod zone;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ReposeError, Result};
pub use zone::{Intensity, Zone, ZoneDefinition, ZoneState};

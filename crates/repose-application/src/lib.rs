//! Repose application layer.
//!
//! Orchestrates the `repose-core` domain against the repositories: the
//! live [`PracticeRunner`] with its snapshot stream and autosaves, circuit
//! scheduling, the completion use case, the post-completion side-effect
//! queue, and checkpoint housekeeping.

mod circuit;
mod completion_usecase;
mod housekeeping;
mod runner;
mod side_effects;

pub use circuit::{CircuitPhase, CircuitState};
pub use completion_usecase::CompletionUseCase;
pub use housekeeping::{DEFAULT_CHECKPOINT_TTL, spawn_checkpoint_cleanup};
pub use runner::{PracticeRunner, RunnerConfig};
pub use side_effects::{SessionEvent, SessionEventHandler, SideEffectQueue};

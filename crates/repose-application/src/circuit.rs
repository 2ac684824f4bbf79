//! Circuit-mode scheduling state.
//!
//! Circuit mode advances zones automatically with a pause between them.
//! Every scheduled pause carries a monotonically increasing generation
//! token; a timer whose token no longer matches the current generation is
//! a no-op. That is what makes skipping a pause or disabling circuit mode
//! race-free against an in-flight timer, without any thread cancellation.

use std::time::Duration;

/// Scheduling phase of circuit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitPhase {
    /// Circuit mode is off; zones advance manually.
    Disabled,
    /// Circuit mode is on and a zone is in progress.
    Running,
    /// A zone just completed; the countdown to the next zone is running.
    PausedBetweenZones,
}

/// The bookkeeping half of the circuit scheduler: phase transitions and
/// generation tokens. Timer wiring lives in the practice runner.
#[derive(Debug, Clone)]
pub struct CircuitState {
    phase: CircuitPhase,
    generation: u64,
    pause_duration: Duration,
}

impl CircuitState {
    /// Creates a disabled circuit with the configured inter-zone pause.
    /// A zero pause is valid and means no visible pause.
    pub fn new(pause_duration: Duration) -> Self {
        Self {
            phase: CircuitPhase::Disabled,
            generation: 0,
            pause_duration,
        }
    }

    pub fn phase(&self) -> CircuitPhase {
        self.phase
    }

    pub fn pause_duration(&self) -> Duration {
        self.pause_duration
    }

    pub fn is_enabled(&self) -> bool {
        self.phase != CircuitPhase::Disabled
    }

    /// Enables or disables circuit mode.
    ///
    /// Disabling while a pause countdown is in flight invalidates its
    /// token, so the scheduled advance becomes a no-op and the session
    /// stays on the completed zone awaiting a manual advance.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            if self.phase == CircuitPhase::Disabled {
                self.phase = CircuitPhase::Running;
            }
        } else {
            self.generation += 1;
            self.phase = CircuitPhase::Disabled;
        }
    }

    /// Enters the between-zones pause and returns the token the timer must
    /// present to advance.
    pub fn schedule_pause(&mut self) -> u64 {
        self.generation += 1;
        self.phase = CircuitPhase::PausedBetweenZones;
        self.generation
    }

    /// Consumes a pause if `token` is still current.
    ///
    /// Returns `true` exactly once per scheduled pause: a stale token, a
    /// skipped pause, or a disabled circuit all return `false`.
    pub fn try_finish_pause(&mut self, token: u64) -> bool {
        if self.phase == CircuitPhase::PausedBetweenZones && self.generation == token {
            self.phase = CircuitPhase::Running;
            true
        } else {
            false
        }
    }

    /// Cancels the current pause countdown by invalidating its token.
    /// Used by skip-pause, which then advances immediately itself.
    pub fn cancel_pause(&mut self) {
        if self.phase == CircuitPhase::PausedBetweenZones {
            self.generation += 1;
            self.phase = CircuitPhase::Running;
        }
    }
}

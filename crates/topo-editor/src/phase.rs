//! Phase flags for the two long-running store operations.
//!
//! Each phase is a tiny state machine: `begin` moves it out of `Idle` or
//! refuses with [`EditorError::Reentrant`], `finish` always returns it to
//! `Idle`.

use crate::error::{EditorError, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPhase {
    #[default]
    Idle,
    Applying,
}

impl ApplyPhase {
    pub fn begin(&mut self) -> Result<(), EditorError> {
        match self {
            ApplyPhase::Idle => {
                *self = ApplyPhase::Applying;
                Ok(())
            }
            ApplyPhase::Applying => Err(EditorError::Reentrant(Operation::Apply)),
        }
    }

    pub fn finish(&mut self) {
        *self = ApplyPhase::Idle;
    }

    pub fn is_busy(&self) -> bool {
        *self != ApplyPhase::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutPhase {
    #[default]
    Idle,
    /// `stale` is set when the graph's shape changed after the pass started.
    LayingOut { stale: bool },
}

impl LayoutPhase {
    pub fn begin(&mut self) -> Result<(), EditorError> {
        match self {
            LayoutPhase::Idle => {
                *self = LayoutPhase::LayingOut { stale: false };
                Ok(())
            }
            LayoutPhase::LayingOut { .. } => Err(EditorError::Reentrant(Operation::Layout)),
        }
    }

    /// Record a structural edit. No-op when idle.
    pub fn mark_stale(&mut self) {
        if let LayoutPhase::LayingOut { stale } = self {
            *stale = true;
        }
    }

    /// Clear and return the stale flag, staying in `LayingOut`.
    pub fn take_stale(&mut self) -> bool {
        match self {
            LayoutPhase::LayingOut { stale } => std::mem::take(stale),
            LayoutPhase::Idle => false,
        }
    }

    pub fn finish(&mut self) {
        *self = LayoutPhase::Idle;
    }

    pub fn is_busy(&self) -> bool {
        *self != LayoutPhase::Idle
    }
}

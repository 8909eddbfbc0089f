//! Character domain: stance, per-step state, and state snapshotting.

use bevy::prelude::*;

/// Mutually exclusive body stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stance {
    #[default]
    Stand,
    Crouch,
    Slide,
}

/// Value snapshot of the character for one physics step.
///
/// `acceleration` is advisory (effects/telemetry); it is recomputed every
/// step and never integrated. A `Slide` stance can only be entered while
/// grounded and is forced back to `Crouch` the moment grounding is lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterState {
    pub grounded: bool,
    pub stance: Stance,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

/// The current/last/temp state triple with explicit step lifecycle.
///
/// `begin_step` snapshots the live state before any stance transition runs;
/// `commit_step` promotes that snapshot to "last" once the step is done. This
/// is what lets the pipeline distinguish "was standing / was airborne at the
/// start of this step" from "is now", which slide entry depends on.
#[derive(Debug, Default)]
pub struct StateSnapshots {
    current: CharacterState,
    last: CharacterState,
    temp: CharacterState,
}

impl StateSnapshots {
    /// Snapshot the live state at the start of a physics step.
    pub fn begin_step(&mut self) {
        self.temp = self.current;
    }

    /// Promote the step-start snapshot at the end of a physics step.
    pub fn commit_step(&mut self) {
        self.last = self.temp;
    }

    pub fn current(&self) -> &CharacterState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut CharacterState {
        &mut self.current
    }

    /// State as of the start of the previous physics step.
    pub fn last(&self) -> &CharacterState {
        &self.last
    }
}

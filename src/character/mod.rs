//! Character domain: controller state machine, input aggregation, and the
//! Bevy plugin wiring the hook sequence into the fixed-update loop.

use std::marker::PhantomData;
use std::path::PathBuf;

use bevy::ecs::component::Mutable;
use bevy::prelude::*;

pub mod components;
pub mod controller;
pub mod resources;

#[cfg(feature = "dev-tools")]
pub(crate) mod dev;
pub(crate) mod systems;


pub use components::{CharacterState, Stance, StateSnapshots};
pub use controller::PlayerCharacter;
pub use resources::{
    CameraCue, CameraCueEvent, CharacterInput, CharacterInputEvent, CharacterTuning, CrouchInput,
    RequestedInput, TuningLoadError, TuningPath, load_tuning,
};

use crate::motor::{Motor, MotorHitEvent};

/// Phases of one locomotion step.
///
/// `Input` and `Step` run in `FixedUpdate`, before the physics backend
/// integrates; `Callbacks` and `Commit` run in `FixedPostUpdate` so they see
/// the integrated state. Backend plugins order their own systems against
/// these sets.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Fold input samples into requested intent.
    Input,
    /// Snapshot, grounding reaction, velocity and rotation hooks.
    Step,
    /// Dispatch collision callbacks reported by the motor.
    Callbacks,
    /// Stand-up validation and snapshot promotion.
    Commit,
}

/// Plugin wiring a [`PlayerCharacter`] driven by the motor component `M`.
pub struct CharacterControllerPlugin<M: Motor + Component<Mutability = Mutable>> {
    /// Optional RON tuning file applied over the defaults at startup.
    pub tuning_path: Option<PathBuf>,
    _marker: PhantomData<M>,
}

impl<M: Motor + Component<Mutability = Mutable>> Default for CharacterControllerPlugin<M> {
    fn default() -> Self {
        Self {
            tuning_path: None,
            _marker: PhantomData,
        }
    }
}

impl<M: Motor + Component<Mutability = Mutable>> CharacterControllerPlugin<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tuning_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tuning_path = Some(path.into());
        self
    }
}

impl<M: Motor + Component<Mutability = Mutable>> Plugin for CharacterControllerPlugin<M> {
    fn build(&self, app: &mut App) {
        app.init_resource::<CharacterTuning>()
            .add_message::<CharacterInputEvent>()
            .add_message::<CameraCueEvent>()
            .add_message::<MotorHitEvent>()
            .configure_sets(
                FixedUpdate,
                (LocomotionSet::Input, LocomotionSet::Step).chain(),
            )
            .configure_sets(
                FixedPostUpdate,
                (LocomotionSet::Callbacks, LocomotionSet::Commit).chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    systems::aggregate_input::<M>.in_set(LocomotionSet::Input),
                    systems::drive_step::<M>.in_set(LocomotionSet::Step),
                ),
            )
            .add_systems(
                FixedPostUpdate,
                (
                    systems::dispatch_hits::<M>.in_set(LocomotionSet::Callbacks),
                    systems::commit_step::<M>.in_set(LocomotionSet::Commit),
                ),
            );

        if let Some(path) = &self.tuning_path {
            app.insert_resource(TuningPath(path.clone()))
                .add_systems(Startup, systems::load_tuning_at_startup);
        }

        #[cfg(feature = "dev-tools")]
        app.add_systems(Update, dev::log_character_state);
    }
}

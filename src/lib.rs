//! First-person kinematic locomotion core.
//!
//! Turns per-frame input intent into velocity, rotation, and stance for a
//! capsule character moving over arbitrary geometry: ground locomotion with
//! slope-relative movement, slope sliding, air control, multi-jump with coyote
//! time, crouching with capsule-resize validation, and arbitration between
//! auxiliary movement modes (wall-run, wall-climb, grapple-swing, dash,
//! crouch-slam) that temporarily own velocity computation.
//!
//! The collision engine is abstracted behind the [`motor::Motor`] contract so
//! the controller can be driven by any integrator; [`backend`] ships an
//! avian3d-backed reference motor. The controller itself exposes the step
//! hooks the integrator invokes (`before_update`, `post_grounding_update`,
//! `update_velocity`, `update_rotation`, `after_update`) plus the collision
//! callbacks (`on_ground_hit`, `on_movement_hit`, `on_discrete_collision`).

pub mod backend;
pub mod character;
pub mod math;
pub mod modes;
pub mod motor;

pub mod prelude {
    //! Re-exports for common usage.

    pub use crate::backend::{KinematicMotor, KinematicMotorPlugin};
    pub use crate::character::{
        CameraCue, CameraCueEvent, CharacterControllerPlugin, CharacterInput, CharacterInputEvent,
        CharacterState, CharacterTuning, CrouchInput, LocomotionSet, PlayerCharacter, Stance,
    };
    pub use crate::modes::{
        CrouchSlamBehavior, DashBehavior, ExclusiveMode, ModeRegistry, SwingBehavior,
        WallClimbBehavior, WallRunBehavior,
    };
    pub use crate::motor::{
        CapsuleDims, GroundingStatus, HitReport, Motor, MotorHitEvent, MotorHitKind,
    };
}

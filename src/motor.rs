//! Contract between the locomotion core and the collision/integration engine.
//!
//! The controller never sweeps or integrates on its own; it reads the motor's
//! queries, mutates the working velocity/rotation it is handed, and issues the
//! narrow set of commands below. Anything implementing [`Motor`] can drive the
//! controller: the avian3d-backed [`crate::backend::KinematicMotor`] is the
//! reference implementation, and tests use an in-memory mock.

use bevy::ecs::message::Message;
use bevy::prelude::*;

use crate::math;

/// Result of the motor's ground probe for the current step.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundingStatus {
    /// Ground was detected within probe range, stable or not.
    pub found_any_ground: bool,
    /// Contact is walkable (slope within tolerance, no pending unground).
    pub is_stable_on_ground: bool,
    /// Surface normal of the detected ground. Only meaningful when
    /// `found_any_ground` is set.
    pub ground_normal: Vec3,
}

/// Capsule dimensions in character-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleDims {
    pub radius: f32,
    pub height: f32,
    /// Capsule center offset along the character's up axis.
    pub y_offset: f32,
}

impl CapsuleDims {
    /// Capsule of the given height with its bottom at the character origin.
    pub fn grounded(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            y_offset: height * 0.5,
        }
    }
}

/// A collision reported by the motor during its sweep.
#[derive(Debug, Clone, Copy)]
pub struct HitReport {
    pub normal: Vec3,
    pub point: Vec3,
    /// Whether the motor classified the hit surface as stable ground.
    pub is_stable: bool,
    /// The other collider, when the motor knows it.
    pub other: Option<Entity>,
}

/// Which collision callback a [`MotorHitEvent`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorHitKind {
    /// Ground probe landed on stable ground.
    Ground,
    /// The movement sweep hit something.
    Movement,
    /// Discrete (non-sweep) overlap detected.
    Discrete,
}

/// Collision callback delivery from a motor backend to the controller.
#[derive(Debug)]
pub struct MotorHitEvent {
    pub character: Entity,
    pub kind: MotorHitKind,
    pub hit: HitReport,
}

impl Message for MotorHitEvent {}

/// Queries and commands the controller needs from the collision engine.
///
/// The collidable-layer mask is folded into [`Motor::capsule_overlap`]: the
/// motor applies its own filter, so the controller never handles layer state.
pub trait Motor {
    fn grounding(&self) -> GroundingStatus;

    /// The character's up axis in world space.
    fn up(&self) -> Vec3;

    fn velocity(&self) -> Vec3;

    fn set_velocity(&mut self, velocity: Vec3);

    fn capsule(&self) -> CapsuleDims;

    fn set_capsule(&mut self, dims: CapsuleDims);

    /// Position the motor will integrate from this step.
    fn transient_position(&self) -> Vec3;

    /// Rotation the motor will integrate from this step.
    fn transient_rotation(&self) -> Quat;

    fn set_rotation(&mut self, rotation: Quat);

    /// Detach from the ground and suppress re-grounding for `delay` seconds.
    /// A zero delay unsticks the character for the current step only.
    fn force_unground(&mut self, delay: f32);

    /// Overlap-test the current capsule at the given pose against the world,
    /// filling `results` with up to `results.len()` hits. Returns the number
    /// of hits found.
    fn capsule_overlap(&self, position: Vec3, rotation: Quat, results: &mut [Entity]) -> usize;

    /// Teleport the character, optionally zeroing its velocity.
    fn set_position(&mut self, position: Vec3, kill_velocity: bool);

    /// Magnitude-preserving remap of `direction` onto the surface tangent
    /// plane, keeping its heading relative to the character's up axis.
    fn direction_tangent_to_surface(&self, direction: Vec3, surface_normal: Vec3) -> Vec3 {
        math::tangent_to_surface(direction, surface_normal, self.up())
    }
}

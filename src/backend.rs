//! Reference [`Motor`] backend on top of avian3d.
//!
//! [`KinematicMotor`] mirrors the physics state it needs (pose, velocity,
//! grounding, stand-up clearance) into plain fields each step, answers the
//! [`Motor`] contract from those mirrors, and writes the controller's results
//! back to the avian components after the step hooks run. Spawn it alongside
//! `RigidBody::Kinematic`, a capsule `Collider`, `LinearVelocity`, and
//! `CollisionEventsEnabled` for movement-hit callbacks.

use avian3d::prelude::*;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::character::{CharacterTuning, LocomotionSet};
use crate::motor::{CapsuleDims, GroundingStatus, HitReport, Motor, MotorHitEvent, MotorHitKind};

/// Avian-backed kinematic motor state for one character.
#[derive(Component)]
pub struct KinematicMotor {
    /// Up axis for this character.
    pub up: Vec3,
    /// Steepest walkable slope, in radians from horizontal.
    pub max_slope_angle: f32,
    /// How far below the feet the ground probe reaches.
    pub ground_probe_distance: f32,
    /// Layers the motor collides with; folded into every spatial query.
    pub query_mask: LayerMask,

    capsule: CapsuleDims,
    /// Dimensions currently applied to the avian collider.
    applied_capsule: CapsuleDims,
    grounding: GroundingStatus,
    velocity: Vec3,
    position: Vec3,
    rotation: Quat,
    unground_timer: f32,
    pending_teleport: Option<Vec3>,
    /// Stand-up clearance hits cached by the probe this step.
    clearance_hits: Vec<Entity>,
}

impl KinematicMotor {
    pub fn new(radius: f32, height: f32) -> Self {
        let capsule = CapsuleDims::grounded(radius, height);
        Self {
            up: Vec3::Y,
            max_slope_angle: 60f32.to_radians(),
            ground_probe_distance: 0.25,
            query_mask: LayerMask::ALL,
            capsule,
            applied_capsule: capsule,
            grounding: GroundingStatus::default(),
            velocity: Vec3::ZERO,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            unground_timer: 0.0,
            pending_teleport: None,
            clearance_hits: Vec::new(),
        }
    }

    /// Capsule collider matching the given dimensions.
    fn collider_for(dims: &CapsuleDims) -> Collider {
        let cylinder_length = (dims.height - 2.0 * dims.radius).max(0.01);
        Collider::capsule(dims.radius, cylinder_length)
    }

    /// World position of the capsule's bottom point.
    fn feet(&self) -> Vec3 {
        self.position - self.up * (self.applied_capsule.height * 0.5)
    }

    fn query_filter(&self, entity: Entity) -> SpatialQueryFilter {
        SpatialQueryFilter::from_mask(self.query_mask).with_excluded_entities([entity])
    }
}

impl Motor for KinematicMotor {
    fn grounding(&self) -> GroundingStatus {
        self.grounding
    }

    fn up(&self) -> Vec3 {
        self.up
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn capsule(&self) -> CapsuleDims {
        self.capsule
    }

    fn set_capsule(&mut self, dims: CapsuleDims) {
        self.capsule = dims;
    }

    fn transient_position(&self) -> Vec3 {
        self.position
    }

    fn transient_rotation(&self) -> Quat {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn force_unground(&mut self, delay: f32) {
        self.unground_timer = self.unground_timer.max(delay);
        self.grounding.is_stable_on_ground = false;
        self.grounding.found_any_ground = false;
    }

    /// Served from the clearance probe run after physics sync this step,
    /// which tests the standing capsule at the integrated pose; the pose
    /// arguments are trusted to match it.
    fn capsule_overlap(&self, _position: Vec3, _rotation: Quat, results: &mut [Entity]) -> usize {
        for (slot, hit) in results.iter_mut().zip(self.clearance_hits.iter()) {
            *slot = *hit;
        }
        self.clearance_hits.len()
    }

    fn set_position(&mut self, position: Vec3, kill_velocity: bool) {
        self.pending_teleport = Some(position);
        self.position = position;
        if kill_velocity {
            self.velocity = Vec3::ZERO;
        }
    }
}

/// Mirror avian state into the motor and tick the unground suppression.
pub(crate) fn mirror_motor_state(
    time: Res<Time>,
    mut query: Query<(&Transform, &LinearVelocity, &mut KinematicMotor)>,
) {
    let dt = time.delta_secs();
    for (transform, linear_velocity, mut motor) in &mut query {
        motor.position = transform.translation;
        motor.rotation = transform.rotation;
        motor.velocity = linear_velocity.0;
        motor.unground_timer = (motor.unground_timer - dt).max(0.0);
    }
}

/// Downward ray probe classifying ground contact, with a ground-hit callback
/// on the airborne-to-stable transition.
pub(crate) fn probe_ground(
    spatial_query: SpatialQuery,
    mut hit_events: MessageWriter<MotorHitEvent>,
    mut query: Query<(Entity, &mut KinematicMotor)>,
) {
    for (entity, mut motor) in &mut query {
        let was_stable = motor.grounding.is_stable_on_ground;
        let filter = motor.query_filter(entity);

        let origin = motor.feet() + motor.up * 0.05;
        let Ok(down) = Dir3::new(-motor.up) else {
            continue;
        };
        let max_distance = 0.05 + motor.ground_probe_distance;

        let hit = spatial_query.cast_ray(origin, down, max_distance, true, &filter);

        motor.grounding = match hit {
            Some(ray_hit) => {
                let walkable =
                    ray_hit.normal.dot(motor.up) >= motor.max_slope_angle.cos();
                GroundingStatus {
                    found_any_ground: true,
                    is_stable_on_ground: walkable && motor.unground_timer <= 0.0,
                    ground_normal: ray_hit.normal,
                }
            }
            None => GroundingStatus::default(),
        };

        if motor.grounding.is_stable_on_ground && !was_stable {
            hit_events.write(MotorHitEvent {
                character: entity,
                kind: MotorHitKind::Ground,
                hit: HitReport {
                    normal: motor.grounding.ground_normal,
                    point: motor.feet(),
                    is_stable: true,
                    other: hit.map(|h| h.entity),
                },
            });
        }
    }
}

/// Cache whether a standing capsule fits at the integrated pose, so the
/// stand-up validation in the commit phase is answered without a live query.
/// Runs after physics sync and re-mirrors the pose first: validating against
/// the pre-integration pose could commit a stand-up inside a ceiling the
/// character slid under this step.
pub(crate) fn probe_stand_clearance(
    spatial_query: SpatialQuery,
    tuning: Res<CharacterTuning>,
    mut query: Query<(Entity, &Transform, &mut KinematicMotor)>,
) {
    for (entity, transform, mut motor) in &mut query {
        motor.position = transform.translation;
        motor.rotation = transform.rotation;
        motor.clearance_hits.clear();
        // Standing characters have nothing to validate.
        if motor.applied_capsule.height >= tuning.stand_height {
            continue;
        }

        let stand_dims = CapsuleDims::grounded(motor.applied_capsule.radius, tuning.stand_height);
        let shape = KinematicMotor::collider_for(&stand_dims);
        // Bottom stays planted; the standing capsule's center sits higher.
        let center = motor.feet() + motor.up * (stand_dims.height * 0.5);
        let filter = motor.query_filter(entity);

        let hits = spatial_query.shape_intersections(&shape, center, motor.rotation, &filter);
        motor.clearance_hits.extend(hits);
    }
}

/// Write the controller's results back to the avian components.
pub(crate) fn apply_motor_state(
    mut query: Query<(&mut Transform, &mut LinearVelocity, &mut Collider, &mut KinematicMotor)>,
) {
    for (mut transform, mut linear_velocity, mut collider, mut motor) in &mut query {
        if let Some(target) = motor.pending_teleport.take() {
            transform.translation = target;
        }

        if motor.capsule != motor.applied_capsule {
            // Keep the feet planted through the resize.
            let feet = motor.feet();
            *collider = KinematicMotor::collider_for(&motor.capsule);
            motor.applied_capsule = motor.capsule;
            transform.translation = feet + motor.up * (motor.capsule.height * 0.5);
            motor.position = transform.translation;
        }

        transform.rotation = motor.rotation;
        linear_velocity.0 = motor.velocity;
    }
}

/// Forward avian collision starts as movement-hit callbacks.
pub(crate) fn report_movement_hits(
    mut collision_events: MessageReader<CollisionStart>,
    mut hit_events: MessageWriter<MotorHitEvent>,
    query: Query<(Entity, &KinematicMotor)>,
) {
    for event in collision_events.read() {
        let pairs = [
            (event.collider1, event.collider2),
            (event.collider2, event.collider1),
        ];

        for (motor_entity, other) in pairs {
            let Ok((entity, motor)) = query.get(motor_entity) else {
                continue;
            };
            hit_events.write(MotorHitEvent {
                character: entity,
                kind: MotorHitKind::Movement,
                hit: HitReport {
                    normal: motor.grounding.ground_normal,
                    point: motor.position,
                    is_stable: motor.grounding.is_stable_on_ground,
                    other: Some(other),
                },
            });
        }
    }
}

/// Registers the avian-backed motor systems around the locomotion phases.
/// Add [`crate::character::CharacterControllerPlugin`] for [`KinematicMotor`]
/// alongside this, plus avian's `PhysicsPlugins`.
pub struct KinematicMotorPlugin;

impl Plugin for KinematicMotorPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedPostUpdate,
            LocomotionSet::Callbacks.after(PhysicsSystems::Writeback),
        )
        .add_systems(
            FixedUpdate,
            (mirror_motor_state, probe_ground)
                .chain()
                .before(LocomotionSet::Input),
        )
        .add_systems(FixedUpdate, apply_motor_state.after(LocomotionSet::Step))
        .add_systems(
            FixedPostUpdate,
            (report_movement_hits, probe_stand_clearance)
                .after(PhysicsSystems::Writeback)
                .before(LocomotionSet::Callbacks),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{
        CharacterInput, CharacterTuning, CrouchInput, PlayerCharacter, Stance,
    };
    use crate::modes::ModeRegistry;

    const DT: f32 = 1.0 / 60.0;

    fn crouch_toggle() -> CharacterInput {
        CharacterInput {
            crouch: CrouchInput::Toggle,
            ..default()
        }
    }

    #[test]
    fn test_capsule_overlap_serves_cached_clearance_hits() {
        let mut motor = KinematicMotor::new(0.5, 2.0);
        let mut results = [Entity::PLACEHOLDER; 4];
        assert_eq!(motor.capsule_overlap(Vec3::ZERO, Quat::IDENTITY, &mut results), 0);

        motor.clearance_hits.push(Entity::PLACEHOLDER);
        motor.clearance_hits.push(Entity::PLACEHOLDER);
        assert_eq!(motor.capsule_overlap(Vec3::ZERO, Quat::IDENTITY, &mut results), 2);
    }

    #[test]
    fn test_stand_up_blocked_by_ceiling_entered_this_step() {
        let tuning = CharacterTuning::default();
        let mut character = PlayerCharacter::new(&tuning);
        let mut modes = ModeRegistry::default();
        let mut motor = KinematicMotor::new(0.5, tuning.stand_height);

        // Crouch, then release it within the same step.
        character.update_input(&crouch_toggle(), &motor, &mut modes);
        character.before_update(&mut motor, &tuning, DT);
        assert_eq!(motor.capsule.height, tuning.crouch_height);
        character.update_input(&crouch_toggle(), &motor, &mut modes);

        // The clearance probe found a ceiling at the integrated pose: the
        // stand-up must be rejected, not committed into the geometry.
        motor.clearance_hits.push(Entity::PLACEHOLDER);
        character.after_update(&mut motor, &mut modes, &tuning, DT);
        assert_eq!(character.state().stance, Stance::Crouch);
        assert_eq!(motor.capsule.height, tuning.crouch_height);
        assert!(character.requested_input().crouch);

        // A later step's probe reports the ceiling gone; the retry commits.
        motor.clearance_hits.clear();
        character.update_input(&crouch_toggle(), &motor, &mut modes);
        character.after_update(&mut motor, &mut modes, &tuning, DT);
        assert_eq!(character.state().stance, Stance::Stand);
        assert_eq!(motor.capsule.height, tuning.stand_height);
    }
}

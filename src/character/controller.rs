//! Character domain: the per-step locomotion state machine.
//!
//! One `PlayerCharacter` per capsule. The integrator (any [`Motor`] backend)
//! invokes the hooks in a fixed order each physics step:
//!
//! 1. [`PlayerCharacter::before_update`]: snapshot state, optimistic crouch
//! 2. motor ground probe, then [`PlayerCharacter::post_grounding_update`]
//! 3. [`PlayerCharacter::update_velocity`]: the locomotion pipeline
//! 4. [`PlayerCharacter::update_rotation`]
//! 5. motor sweep/integration
//! 6. [`PlayerCharacter::after_update`]: stand-up validation, commit snapshot
//!
//! Collision callbacks ([`PlayerCharacter::on_ground_hit`],
//! [`PlayerCharacter::on_movement_hit`]) arrive from the motor's sweep.

use bevy::prelude::*;

use crate::math;
use crate::modes::{ExclusiveMode, ModeRegistry};
use crate::motor::{CapsuleDims, HitReport, Motor};

use super::components::{CharacterState, Stance, StateSnapshots};
use super::resources::{CameraCue, CharacterInput, CharacterTuning, CrouchInput, RequestedInput};

/// FOV cue while sliding or falling fast.
const FOV_WIDE: f32 = 100.0;
/// FOV cue for normal locomotion.
const FOV_NORMAL: f32 = 80.0;
/// Airborne speed above which the wide FOV cue kicks in.
const FAST_AIR_SPEED: f32 = 50.0;
/// Ground-hit speed below which the landing FOV cue is raised.
const LANDING_CUE_MAX_SPEED: f32 = 40.0;

/// Per-character locomotion controller.
#[derive(Component)]
pub struct PlayerCharacter {
    snapshots: StateSnapshots,
    requested: RequestedInput,

    time_since_ungrounded: f32,
    time_since_jump_request: f32,
    ungrounded_due_to_jump: bool,
    remaining_jumps: u32,

    overlap_results: [Entity; 8],
    camera_cues: Vec<CameraCue>,
}

impl PlayerCharacter {
    pub fn new(tuning: &CharacterTuning) -> Self {
        Self {
            snapshots: StateSnapshots::default(),
            requested: RequestedInput::default(),
            time_since_ungrounded: 0.0,
            time_since_jump_request: 0.0,
            ungrounded_due_to_jump: false,
            remaining_jumps: tuning.max_jump_count,
            overlap_results: [Entity::PLACEHOLDER; 8],
            camera_cues: Vec::new(),
        }
    }

    pub fn state(&self) -> &CharacterState {
        self.snapshots.current()
    }

    /// State as of the start of the previous physics step.
    pub fn last_state(&self) -> &CharacterState {
        self.snapshots.last()
    }

    pub fn requested_input(&self) -> &RequestedInput {
        &self.requested
    }

    pub fn remaining_jumps(&self) -> u32 {
        self.remaining_jumps
    }

    pub fn reset_jump_count(&mut self, tuning: &CharacterTuning) {
        self.remaining_jumps = tuning.max_jump_count;
    }

    /// True when the motor reports no stable ground under the character.
    pub fn above_ground(&self, motor: &dyn Motor) -> bool {
        !motor.grounding().is_stable_on_ground
    }

    /// Camera anchor height for the current stance, as a world offset along
    /// the capsule axis. The presentation layer eases toward this with
    /// `tuning.crouch_height_response`.
    pub fn camera_target_height(&self, motor: &dyn Motor, tuning: &CharacterTuning) -> f32 {
        let fraction = match self.snapshots.current().stance {
            Stance::Stand => tuning.stand_camera_target_height,
            Stance::Crouch | Stance::Slide => tuning.crouch_camera_target_height,
        };
        motor.capsule().height * fraction
    }

    /// Camera cues raised since the last drain. Presentation-only.
    pub fn drain_camera_cues(&mut self) -> impl Iterator<Item = CameraCue> + '_ {
        self.camera_cues.drain(..)
    }

    // -------------------------------------------------------------------------
    // Input aggregation
    // -------------------------------------------------------------------------

    /// Fold one raw input sample into the persistent requested intent.
    ///
    /// May start or stop auxiliary modes as a direct consequence of edge
    /// transitions (crouch-slam on crouch edges, swing toggle while airborne,
    /// dash requests).
    pub fn update_input(
        &mut self,
        input: &CharacterInput,
        motor: &dyn Motor,
        modes: &mut ModeRegistry,
    ) {
        modes.refresh_active();

        self.requested.rotation = input.rotation;

        // 2D axis to a camera-relative world direction, magnitude <= 1.
        let movement =
            Vec3::new(input.move_axis.x, 0.0, -input.move_axis.y).clamp_length_max(1.0);
        self.requested.movement = input.rotation * movement;

        let was_requesting_jump = self.requested.jump;
        self.requested.jump = self.requested.jump || input.jump;
        if self.requested.jump && !was_requesting_jump && self.remaining_jumps > 0 {
            self.time_since_jump_request = 0.0;
        }
        self.requested.sustain_jump = input.sustain_jump;

        let was_requesting_crouch = self.requested.crouch;
        if input.crouch == CrouchInput::Toggle {
            self.requested.crouch = !self.requested.crouch;
        }
        if self.requested.crouch
            && !was_requesting_crouch
            && !modes.is_wall_running()
            && !modes.is_swinging()
        {
            self.requested.crouch_in_air = !self.snapshots.current().grounded;
            modes.start_crouch_slam();
        } else if !self.requested.crouch && was_requesting_crouch {
            self.requested.crouch_in_air = false;
            modes.stop_crouch_slam();
        }

        // Swing only toggles while off stable ground.
        self.requested.grappling_swing = input.grappling_swing;
        if self.requested.grappling_swing && !motor.grounding().is_stable_on_ground {
            modes.toggle_swing();
        }

        self.requested.dash = input.dash;
        if self.requested.dash
            && self.snapshots.current().stance != Stance::Slide
            && modes.active() == ExclusiveMode::None
            && !modes.is_grappling()
        {
            modes.start_dash();
        }
    }

    // -------------------------------------------------------------------------
    // Step lifecycle hooks
    // -------------------------------------------------------------------------

    /// Snapshot state and apply a requested crouch optimistically; shrinking
    /// the capsule never needs validation.
    pub fn before_update(&mut self, motor: &mut dyn Motor, tuning: &CharacterTuning, _dt: f32) {
        self.snapshots.begin_step();

        if self.requested.crouch && self.snapshots.current().stance == Stance::Stand {
            self.snapshots.current_mut().stance = Stance::Crouch;
            motor.set_capsule(CapsuleDims::grounded(
                motor.capsule().radius,
                tuning.crouch_height,
            ));
            debug!("Crouched: capsule shrunk to {}", tuning.crouch_height);
        }
    }

    /// A slide cannot exist airborne.
    pub fn post_grounding_update(&mut self, motor: &dyn Motor, _dt: f32) {
        if !motor.grounding().is_stable_on_ground
            && self.snapshots.current().stance == Stance::Slide
        {
            self.snapshots.current_mut().stance = Stance::Crouch;
        }
    }

    /// The locomotion pipeline: resolve stance and velocity for this step,
    /// deferring to at most one exclusive auxiliary mode, then arbitrate the
    /// jump request.
    pub fn update_velocity(
        &mut self,
        motor: &mut dyn Motor,
        modes: &mut ModeRegistry,
        tuning: &CharacterTuning,
        velocity: &mut Vec3,
        dt: f32,
    ) {
        self.snapshots.current_mut().acceleration = Vec3::ZERO;
        let active = modes.refresh_active();

        // Dash contribution comes first, whatever else happens.
        if modes.is_dashing() {
            modes.dash_velocity(velocity);
        }

        let grounding = motor.grounding();
        if grounding.is_stable_on_ground {
            if active == ExclusiveMode::WallClimb {
                modes.climb_velocity(velocity, dt);
            }
            self.time_since_ungrounded = 0.0;
            self.ungrounded_due_to_jump = false;

            // Requested movement snapped to the surface, magnitude preserved.
            let grounded_movement = motor
                .direction_tangent_to_surface(self.requested.movement, grounding.ground_normal)
                * self.requested.movement.length();

            self.try_enter_slide(motor, tuning, grounded_movement, velocity);

            match self.snapshots.current().stance {
                Stance::Stand | Stance::Crouch => {
                    let (speed, response) = if self.snapshots.current().stance == Stance::Stand {
                        (tuning.walk_speed, tuning.walk_response)
                    } else {
                        (tuning.crouch_speed, tuning.crouch_response)
                    };

                    // Exponential approach toward the target ground velocity.
                    let target_velocity = grounded_movement * speed;
                    let move_velocity =
                        velocity.lerp(target_velocity, 1.0 - (-response * dt).exp());
                    self.snapshots.current_mut().acceleration = move_velocity - *velocity;
                    *velocity = move_velocity;
                }
                Stance::Slide => {
                    self.continue_slide(motor, tuning, grounded_movement, velocity, dt);
                }
            }
        } else {
            match active {
                ExclusiveMode::WallRun => modes.wall_run_velocity(velocity, dt),
                ExclusiveMode::WallClimb => modes.climb_velocity(velocity, dt),
                _ => {
                    if motor.velocity().length() > FAST_AIR_SPEED {
                        self.camera_cues.push(CameraCue::Fov(FOV_WIDE));
                    } else {
                        self.camera_cues.push(CameraCue::Fov(FOV_NORMAL));
                    }
                    self.time_since_ungrounded += dt;

                    self.air_steer(motor, tuning, &grounding, velocity, dt);

                    // Gravity, softened while a sustained jump is still rising.
                    let up = motor.up();
                    let mut effective_gravity = tuning.gravity;
                    if self.requested.sustain_jump && velocity.dot(up) > 0.0 {
                        effective_gravity *= tuning.jump_sustain_gravity;
                    }
                    *velocity += up * effective_gravity * dt;

                    if active == ExclusiveMode::Swing {
                        modes.swing_velocity(velocity, dt);
                    }
                }
            }
        }

        // Crouch-slam layers last, grounded or not.
        if modes.is_slamming() {
            modes.slam_velocity(velocity);
        }

        if self.requested.jump {
            self.resolve_jump(motor, modes, tuning, velocity, dt);
        }
    }

    /// Flatten the look direction onto the ground plane so the body never
    /// pitches with the camera. A degenerate forward skips the update.
    pub fn update_rotation(&mut self, motor: &dyn Motor, rotation: &mut Quat, _dt: f32) {
        let forward = math::project_onto_plane(self.requested.rotation * Vec3::NEG_Z, motor.up());
        if let Ok(forward) = Dir3::new(forward) {
            *rotation = Transform::IDENTITY
                .looking_to(forward, motor.up())
                .rotation;
        }
    }

    /// Validate a pending stand-up against the world, refresh the state from
    /// the motor's authoritative values, and commit the step snapshot.
    pub fn after_update(
        &mut self,
        motor: &mut dyn Motor,
        modes: &mut ModeRegistry,
        tuning: &CharacterTuning,
        _dt: f32,
    ) {
        if !self.requested.crouch && self.snapshots.current().stance != Stance::Stand {
            // Tentatively stand the capsule up, then check for obstructions.
            let radius = motor.capsule().radius;
            motor.set_capsule(CapsuleDims::grounded(radius, tuning.stand_height));

            let position = motor.transient_position();
            let orientation = motor.transient_rotation();
            let overlaps =
                motor.capsule_overlap(position, orientation, &mut self.overlap_results);

            if overlaps > 0 {
                // Blocked: stay crouched and keep requesting crouch so a later
                // step can retry.
                self.requested.crouch = true;
                motor.set_capsule(CapsuleDims::grounded(radius, tuning.crouch_height));
                debug!("Stand-up blocked by {} overlap(s)", overlaps);
            } else {
                self.snapshots.current_mut().stance = Stance::Stand;
            }
        }

        self.snapshots.current_mut().grounded = motor.grounding().is_stable_on_ground;
        self.snapshots.current_mut().velocity = motor.velocity();
        self.snapshots.commit_step();

        // Swinging and slamming are mutually exclusive.
        if modes.is_swinging() && modes.is_slamming() {
            modes.stop_crouch_slam();
        }
    }

    // -------------------------------------------------------------------------
    // Collision callbacks
    // -------------------------------------------------------------------------

    pub fn on_ground_hit(&mut self, motor: &dyn Motor, modes: &mut ModeRegistry, _hit: &HitReport) {
        if modes.is_swinging() {
            modes.stop_swing();
        }

        let stance = self.snapshots.current().stance;
        if matches!(stance, Stance::Stand | Stance::Crouch)
            && motor.velocity().length() < LANDING_CUE_MAX_SPEED
        {
            self.camera_cues.push(CameraCue::Fov(FOV_NORMAL));
        }

        if modes.is_slamming() {
            modes.stop_crouch_slam();
        }
    }

    pub fn on_movement_hit(
        &mut self,
        _motor: &dyn Motor,
        modes: &mut ModeRegistry,
        tuning: &CharacterTuning,
        hit: &HitReport,
    ) {
        if hit.is_stable {
            self.remaining_jumps = tuning.max_jump_count;
            debug!("Stable hit: jump charges reset to {}", self.remaining_jumps);
        }

        if modes.is_swinging() {
            modes.stop_swing();
        }

        if modes.is_dashing() {
            modes.dash_check_wall();
        }
    }

    pub fn on_discrete_collision(&mut self, _motor: &dyn Motor, _hit: &HitReport) {}

    // -------------------------------------------------------------------------
    // Pipeline internals
    // -------------------------------------------------------------------------

    /// Stand/air to slide transition while grounded, crouched, and moving.
    fn try_enter_slide(
        &mut self,
        motor: &mut dyn Motor,
        tuning: &CharacterTuning,
        grounded_movement: Vec3,
        velocity: &mut Vec3,
    ) {
        let moving = grounded_movement.length_squared() > 0.0;
        let crouching = self.snapshots.current().stance == Stance::Crouch;
        let was_standing = self.snapshots.last().stance == Stance::Stand;
        let was_in_air = !self.snapshots.last().grounded;
        if !(moving && crouching && (was_standing || was_in_air)) {
            return;
        }

        self.snapshots.current_mut().stance = Stance::Slide;
        let ground_normal = motor.grounding().ground_normal;

        // The motor flattens velocity when landing on stable ground, which
        // would kill a slide started out of the air. Re-project last step's
        // falling velocity onto the new ground plane to seed the slide.
        if was_in_air {
            *velocity = math::project_onto_plane(self.snapshots.last().velocity, ground_normal);
        }

        let mut effective_start_speed = tuning.slide_start_speed;
        if !self.snapshots.last().grounded && !self.requested.crouch_in_air {
            // Landing into a crouch that was not requested in the air does
            // not grant the slide boost.
            effective_start_speed = 0.0;
            self.requested.crouch_in_air = false;
        }

        let slide_speed = effective_start_speed.max(velocity.length());
        *velocity =
            motor.direction_tangent_to_surface(*velocity, ground_normal) * slide_speed;
        debug!("Slide entered at speed {:.1}", slide_speed);
    }

    /// Friction, slope force, and speed-capped steering while sliding.
    fn continue_slide(
        &mut self,
        motor: &dyn Motor,
        tuning: &CharacterTuning,
        grounded_movement: Vec3,
        velocity: &mut Vec3,
        dt: f32,
    ) {
        self.camera_cues.push(CameraCue::Fov(FOV_WIDE));

        *velocity -= *velocity * (tuning.slide_friction * dt);

        // Slope force: "up" projected onto the ground plane, scaled by the
        // slide gravity. Applied additively; that is the shipped behavior.
        let ground_normal = motor.grounding().ground_normal;
        let slope_force =
            math::project_onto_plane(-motor.up(), ground_normal) * tuning.slide_gravity;
        *velocity += slope_force * dt;

        // Steer toward the input direction at the current speed. Clamping to
        // the pre-steer speed keeps direct input from accelerating the slide.
        let current_speed = velocity.length();
        let target_velocity = grounded_movement * current_speed;
        let steer_force = (target_velocity - *velocity) * tuning.slide_steer_acceleration * dt;
        let steered_velocity = (*velocity + steer_force).clamp_length_max(current_speed);

        self.snapshots.current_mut().acceleration = (steered_velocity - *velocity) / dt;
        *velocity = steered_velocity;

        if velocity.length() < tuning.slide_end_speed {
            self.snapshots.current_mut().stance = Stance::Crouch;
            debug!("Slide ended below {:.1}", tuning.slide_end_speed);
        }
    }

    /// Planar air steering, capped at `air_speed` and constrained against
    /// climbing steep slopes.
    fn air_steer(
        &mut self,
        motor: &dyn Motor,
        tuning: &CharacterTuning,
        grounding: &crate::motor::GroundingStatus,
        velocity: &mut Vec3,
        dt: f32,
    ) {
        if self.requested.movement.length_squared() == 0.0 {
            return;
        }
        let up = motor.up();

        let planar_movement = math::project_onto_plane(self.requested.movement, up)
            * self.requested.movement.length();
        let planar_velocity = math::project_onto_plane(*velocity, up);

        let mut movement_force = planar_movement * tuning.air_acceleration * dt;

        if planar_velocity.length() < tuning.air_speed {
            // Under the cap: steer toward a clamped target planar velocity.
            let target_planar_velocity =
                (planar_velocity + movement_force).clamp_length_max(tuning.air_speed);
            movement_force = target_planar_velocity - planar_velocity;
        } else if movement_force.dot(planar_velocity) > 0.0 {
            // At or over the cap and pushing along it: allow turning but not
            // further acceleration.
            movement_force =
                math::project_onto_plane(movement_force, planar_velocity.normalize_or_zero());
        }

        // Unstable ground nearby (steep slope): keep steering from climbing it.
        if grounding.found_any_ground && movement_force.dot(*velocity + movement_force) > 0.0 {
            let obstruction = math::obstruction_normal(up, grounding.ground_normal);
            movement_force = math::project_onto_plane(movement_force, obstruction);
        }

        *velocity += movement_force;
    }

    /// Jump arbitration, first match wins. Every consuming branch clears the
    /// jump and crouch latches.
    fn resolve_jump(
        &mut self,
        motor: &mut dyn Motor,
        modes: &mut ModeRegistry,
        tuning: &CharacterTuning,
        velocity: &mut Vec3,
        dt: f32,
    ) {
        let grounded = motor.grounding().is_stable_on_ground;
        let can_coyote_jump =
            self.time_since_ungrounded < tuning.coyote_time && !self.ungrounded_due_to_jump;

        match modes.active() {
            // Jumping off a swing cancels it without an impulse.
            ExclusiveMode::Swing if !grounded => {
                self.remaining_jumps = 1;
                self.clear_jump_latches();
                modes.stop_swing();
                debug!("Jump cancelled swing");
            }
            ExclusiveMode::WallRun => {
                self.remaining_jumps = self.remaining_jumps.saturating_sub(1);
                self.clear_jump_latches();
                modes.wall_jump(velocity);
            }
            ExclusiveMode::WallClimb => {
                self.remaining_jumps = self.remaining_jumps.saturating_sub(1);
                self.clear_jump_latches();
                modes.climb_jump(velocity);
            }
            _ if grounded || can_coyote_jump || self.remaining_jumps > 0 => {
                self.remaining_jumps = self.remaining_jumps.saturating_sub(1);
                self.clear_jump_latches();

                motor.force_unground(0.0);
                self.ungrounded_due_to_jump = true;

                // Raise vertical speed to at least the jump speed, never
                // lowering it.
                let up = motor.up();
                let current_vertical_speed = velocity.dot(up);
                let target_vertical_speed = current_vertical_speed.max(tuning.jump_speed);
                *velocity += up * (target_vertical_speed - current_vertical_speed);
                debug!(
                    "Jump consumed: {} charge(s) left, coyote={}",
                    self.remaining_jumps, can_coyote_jump
                );
            }
            _ => {
                // Defer the request, but only within the coyote window.
                self.time_since_jump_request += dt;
                self.requested.jump = self.time_since_jump_request < tuning.coyote_time;
            }
        }
    }

    fn clear_jump_latches(&mut self) {
        self.requested.jump = false;
        self.requested.crouch = false;
        self.requested.crouch_in_air = false;
    }
}

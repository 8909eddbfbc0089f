//! Character domain: systems driving the hook sequence each fixed step.
//!
//! Generic over the motor component so any collision backend can drive the
//! controller. Hook order per step: input aggregation, then before/grounding/
//! velocity/rotation in the step driver, then (after the backend integrates)
//! collision callback dispatch and the commit pass.

use bevy::ecs::component::Mutable;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::modes::ModeRegistry;
use crate::motor::{Motor, MotorHitEvent, MotorHitKind};

use super::controller::PlayerCharacter;
use super::resources::{
    CameraCueEvent, CharacterInputEvent, CharacterTuning, TuningPath, load_tuning,
};

pub(crate) fn load_tuning_at_startup(
    path: Res<TuningPath>,
    mut tuning: ResMut<CharacterTuning>,
) {
    match load_tuning(&path.0) {
        Ok(loaded) => {
            *tuning = loaded;
            info!("Loaded character tuning from {}", path.0.display());
        }
        Err(e) => {
            warn!("{}; using default tuning", e);
        }
    }
}

pub(crate) fn aggregate_input<M: Motor + Component>(
    mut input_events: MessageReader<CharacterInputEvent>,
    mut query: Query<(&mut PlayerCharacter, &mut ModeRegistry, &M)>,
) {
    for event in input_events.read() {
        let Ok((mut character, mut modes, motor)) = query.get_mut(event.character) else {
            continue;
        };
        character.update_input(&event.input, motor, &mut modes);
    }
}

pub(crate) fn drive_step<M: Motor + Component<Mutability = Mutable>>(
    time: Res<Time>,
    tuning: Res<CharacterTuning>,
    mut camera_cues: MessageWriter<CameraCueEvent>,
    mut query: Query<(&mut PlayerCharacter, &mut ModeRegistry, &mut M)>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (mut character, mut modes, mut motor) in &mut query {
        character.before_update(&mut *motor, &tuning, dt);
        character.post_grounding_update(&*motor, dt);

        let mut velocity = motor.velocity();
        character.update_velocity(&mut *motor, &mut modes, &tuning, &mut velocity, dt);
        motor.set_velocity(velocity);

        let mut rotation = motor.transient_rotation();
        character.update_rotation(&*motor, &mut rotation, dt);
        motor.set_rotation(rotation);

        for cue in character.drain_camera_cues() {
            camera_cues.write(CameraCueEvent { cue });
        }
    }
}

pub(crate) fn dispatch_hits<M: Motor + Component>(
    mut hit_events: MessageReader<MotorHitEvent>,
    tuning: Res<CharacterTuning>,
    mut query: Query<(&mut PlayerCharacter, &mut ModeRegistry, &M)>,
) {
    for event in hit_events.read() {
        let Ok((mut character, mut modes, motor)) = query.get_mut(event.character) else {
            continue;
        };
        match event.kind {
            MotorHitKind::Ground => character.on_ground_hit(motor, &mut modes, &event.hit),
            MotorHitKind::Movement => {
                character.on_movement_hit(motor, &mut modes, &tuning, &event.hit)
            }
            MotorHitKind::Discrete => character.on_discrete_collision(motor, &event.hit),
        }
    }
}

pub(crate) fn commit_step<M: Motor + Component<Mutability = Mutable>>(
    time: Res<Time>,
    tuning: Res<CharacterTuning>,
    mut camera_cues: MessageWriter<CameraCueEvent>,
    mut query: Query<(&mut PlayerCharacter, &mut ModeRegistry, &mut M)>,
) {
    let dt = time.delta_secs();
    for (mut character, mut modes, mut motor) in &mut query {
        character.after_update(&mut *motor, &mut modes, &tuning, dt);
        for cue in character.drain_camera_cues() {
            camera_cues.write(CameraCueEvent { cue });
        }
    }
}

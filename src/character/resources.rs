//! Character domain: tuning, input sample, and requested-intent types.

use bevy::ecs::message::Message;
use bevy::prelude::*;
use ron::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// All scalar tuning for the locomotion pipeline.
///
/// Defaults match the shipped character. Loadable from RON via
/// [`load_tuning`]; invalid values (negative speeds and the like) are a
/// config-authoring concern, not validated here.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct CharacterTuning {
    pub walk_speed: f32,
    pub crouch_speed: f32,
    /// Exponential approach rate for stand locomotion (per second).
    pub walk_response: f32,
    pub crouch_response: f32,

    pub max_jump_count: u32,
    pub jump_speed: f32,
    /// Grace window after leaving the ground during which a jump still
    /// succeeds, and the lifetime of a deferred jump request.
    pub coyote_time: f32,
    /// Gravity multiplier while the jump button is held and the character
    /// is still rising. 0..=1.
    pub jump_sustain_gravity: f32,
    pub gravity: f32,

    pub slide_start_speed: f32,
    pub slide_end_speed: f32,
    pub slide_friction: f32,
    pub slide_steer_acceleration: f32,
    pub slide_gravity: f32,

    pub air_speed: f32,
    pub air_acceleration: f32,

    pub stand_height: f32,
    pub crouch_height: f32,
    /// Easing rate for the presentation-side height blend.
    pub crouch_height_response: f32,
    /// Camera target as a fraction of capsule height, per stance. 0..=1.
    pub stand_camera_target_height: f32,
    pub crouch_camera_target_height: f32,
}

impl Default for CharacterTuning {
    fn default() -> Self {
        Self {
            walk_speed: 20.0,
            crouch_speed: 7.0,
            walk_response: 25.0,
            crouch_response: 20.0,

            max_jump_count: 2,
            jump_speed: 20.0,
            coyote_time: 0.2,
            jump_sustain_gravity: 0.4,
            gravity: -90.0,

            slide_start_speed: 25.0,
            slide_end_speed: 15.0,
            slide_friction: 0.8,
            slide_steer_acceleration: 5.0,
            slide_gravity: -90.0,

            air_speed: 15.0,
            air_acceleration: 70.0,

            stand_height: 2.0,
            crouch_height: 1.0,
            crouch_height_response: 15.0,
            stand_camera_target_height: 0.9,
            crouch_camera_target_height: 0.7,
        }
    }
}

/// Error type for tuning-file load failures.
#[derive(Debug)]
pub struct TuningLoadError {
    pub file: String,
    pub message: String,
}

impl std::fmt::Display for TuningLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to load {}: {}", self.file, self.message)
    }
}

/// RON options with extensions enabled for more flexible parsing.
fn ron_options() -> Options {
    Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

/// Load tuning from a RON file.
pub fn load_tuning(path: &Path) -> Result<CharacterTuning, TuningLoadError> {
    let file_name = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|e| TuningLoadError {
        file: file_name.clone(),
        message: format!("IO error: {}", e),
    })?;

    ron_options()
        .from_str(&contents)
        .map_err(|e| TuningLoadError {
            file: file_name,
            message: format!("Parse error: {}", e),
        })
}

/// Optional path to a tuning RON file, applied at startup.
#[derive(Resource, Debug, Clone)]
pub struct TuningPath(pub PathBuf);

/// Raw crouch input for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrouchInput {
    #[default]
    None,
    /// The crouch key was pressed this frame; crouch is toggle-semantics.
    Toggle,
}

/// One frame's structured input sample, produced by the host's input layer.
/// Key/button binding is outside this crate; only edges and axes arrive here.
#[derive(Debug, Clone, Copy)]
pub struct CharacterInput {
    /// Look rotation from the camera.
    pub rotation: Quat,
    /// Raw 2D move axis, x = strafe, y = forward.
    pub move_axis: Vec2,
    pub jump: bool,
    pub sustain_jump: bool,
    pub crouch: CrouchInput,
    pub dash: bool,
    pub grappling_swing: bool,
}

impl Default for CharacterInput {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            move_axis: Vec2::ZERO,
            jump: false,
            sustain_jump: false,
            crouch: CrouchInput::None,
            dash: false,
            grappling_swing: false,
        }
    }
}

/// Host-to-controller delivery of one input sample, addressed to a single
/// character so multiple controllers never consume each other's toggles.
#[derive(Debug)]
pub struct CharacterInputEvent {
    pub character: Entity,
    pub input: CharacterInput,
}

impl Message for CharacterInputEvent {}

/// Persistent intent aggregated from raw input samples.
///
/// `jump` and `crouch` are latching: set on a rising edge and cleared only
/// when the pipeline consumes or expires them, so a press can never be lost
/// to contact-detection lag between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestedInput {
    pub rotation: Quat,
    /// World-space movement intent, magnitude <= 1.
    pub movement: Vec3,
    pub dash: bool,
    pub jump: bool,
    pub sustain_jump: bool,
    pub crouch: bool,
    /// Whether the character was airborne when the current crouch began.
    pub crouch_in_air: bool,
    pub grappling_swing: bool,
}

/// Presentation hints raised by the simulation. Consuming them never feeds
/// back into simulation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCue {
    /// Suggested field of view in degrees.
    Fov(f32),
}

/// Camera cue delivery to the presentation layer.
#[derive(Debug)]
pub struct CameraCueEvent {
    pub cue: CameraCue,
}

impl Message for CameraCueEvent {}

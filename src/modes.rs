//! Auxiliary movement modes and their arbitration.
//!
//! Wall-run, wall-climb, grapple-swing, dash, and crouch-slam are external
//! collaborators: each exposes an activity flag, start/stop entry points, and
//! a velocity contribution. The controller consults them but never owns their
//! internals. Which one gets to own velocity on a given step is resolved once
//! per step into a single [`ExclusiveMode`] tag instead of cross-checking
//! every module's activity flag at every call site.

use bevy::prelude::*;

/// The single auxiliary mode allowed to own or augment velocity this step.
///
/// Dash and crouch-slam are not exclusive: dash is applied before the main
/// pipeline and crouch-slam is layered after it, whichever mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExclusiveMode {
    #[default]
    None,
    WallRun,
    WallClimb,
    Swing,
}

pub trait WallRunBehavior: Send + Sync {
    fn is_active(&self) -> bool;
    fn contribute_velocity(&mut self, velocity: &mut Vec3, dt: f32);
    /// Replace `velocity` with the wall-jump impulse.
    fn wall_jump(&mut self, velocity: &mut Vec3);
}

pub trait WallClimbBehavior: Send + Sync {
    fn is_active(&self) -> bool;
    fn contribute_velocity(&mut self, velocity: &mut Vec3, dt: f32);
    /// Replace `velocity` with the climb-jump impulse.
    fn climb_jump(&mut self, velocity: &mut Vec3);
}

pub trait SwingBehavior: Send + Sync {
    /// Swinging on an attached rope.
    fn is_swinging(&self) -> bool;
    /// Being pulled toward the anchor (grapple), before the swing proper.
    fn is_grappling(&self) -> bool;
    fn start(&mut self);
    fn stop(&mut self);
    fn contribute_velocity(&mut self, velocity: &mut Vec3, dt: f32);
}

pub trait DashBehavior: Send + Sync {
    fn is_active(&self) -> bool;
    fn start(&mut self);
    fn contribute_velocity(&mut self, velocity: &mut Vec3);
    /// Probe for a wall ahead after a movement hit while dashing.
    fn check_wall(&mut self);
}

pub trait CrouchSlamBehavior: Send + Sync {
    fn is_active(&self) -> bool;
    fn start(&mut self);
    fn stop(&mut self);
    fn contribute_velocity(&mut self, velocity: &mut Vec3);
}

/// Handles to the auxiliary modes registered for one character.
///
/// Unregistered modes simply never activate. All entry/exit passes through
/// this registry so the [`ExclusiveMode`] tag is swapped in exactly one place.
#[derive(Component, Default)]
pub struct ModeRegistry {
    pub wall_run: Option<Box<dyn WallRunBehavior>>,
    pub wall_climb: Option<Box<dyn WallClimbBehavior>>,
    pub swing: Option<Box<dyn SwingBehavior>>,
    pub dash: Option<Box<dyn DashBehavior>>,
    pub crouch_slam: Option<Box<dyn CrouchSlamBehavior>>,
    active: ExclusiveMode,
}

impl ModeRegistry {
    /// Re-resolve the exclusive tag from the modules' activity flags.
    /// Priority when several claim activity: wall-run, wall-climb, swing.
    pub fn refresh_active(&mut self) -> ExclusiveMode {
        self.active = if self.is_wall_running() {
            ExclusiveMode::WallRun
        } else if self.is_climbing() {
            ExclusiveMode::WallClimb
        } else if self.is_swinging() {
            ExclusiveMode::Swing
        } else {
            ExclusiveMode::None
        };
        self.active
    }

    pub fn active(&self) -> ExclusiveMode {
        self.active
    }

    pub fn is_wall_running(&self) -> bool {
        self.wall_run.as_ref().is_some_and(|m| m.is_active())
    }

    pub fn is_climbing(&self) -> bool {
        self.wall_climb.as_ref().is_some_and(|m| m.is_active())
    }

    pub fn is_swinging(&self) -> bool {
        self.swing.as_ref().is_some_and(|m| m.is_swinging())
    }

    pub fn is_grappling(&self) -> bool {
        self.swing.as_ref().is_some_and(|m| m.is_grappling())
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.as_ref().is_some_and(|m| m.is_active())
    }

    pub fn is_slamming(&self) -> bool {
        self.crouch_slam.as_ref().is_some_and(|m| m.is_active())
    }

    /// Start swing/grapple if neither is running, otherwise stop it.
    pub fn toggle_swing(&mut self) {
        let Some(swing) = self.swing.as_mut() else {
            return;
        };
        if !swing.is_swinging() && !swing.is_grappling() {
            swing.start();
        } else {
            swing.stop();
        }
        self.refresh_active();
    }

    pub fn stop_swing(&mut self) {
        if let Some(swing) = self.swing.as_mut() {
            swing.stop();
        }
        self.refresh_active();
    }

    pub fn start_dash(&mut self) {
        if let Some(dash) = self.dash.as_mut() {
            dash.start();
        }
    }

    pub fn start_crouch_slam(&mut self) {
        if let Some(slam) = self.crouch_slam.as_mut() {
            slam.start();
        }
    }

    pub fn stop_crouch_slam(&mut self) {
        if let Some(slam) = self.crouch_slam.as_mut() {
            slam.stop();
        }
    }

    pub fn wall_run_velocity(&mut self, velocity: &mut Vec3, dt: f32) {
        if let Some(wall_run) = self.wall_run.as_mut() {
            wall_run.contribute_velocity(velocity, dt);
        }
    }

    pub fn climb_velocity(&mut self, velocity: &mut Vec3, dt: f32) {
        if let Some(climb) = self.wall_climb.as_mut() {
            climb.contribute_velocity(velocity, dt);
        }
    }

    pub fn swing_velocity(&mut self, velocity: &mut Vec3, dt: f32) {
        if let Some(swing) = self.swing.as_mut() {
            swing.contribute_velocity(velocity, dt);
        }
    }

    pub fn dash_velocity(&mut self, velocity: &mut Vec3) {
        if let Some(dash) = self.dash.as_mut() {
            dash.contribute_velocity(velocity);
        }
    }

    pub fn slam_velocity(&mut self, velocity: &mut Vec3) {
        if let Some(slam) = self.crouch_slam.as_mut() {
            slam.contribute_velocity(velocity);
        }
    }

    pub fn wall_jump(&mut self, velocity: &mut Vec3) {
        if let Some(wall_run) = self.wall_run.as_mut() {
            wall_run.wall_jump(velocity);
        }
    }

    pub fn climb_jump(&mut self, velocity: &mut Vec3) {
        if let Some(climb) = self.wall_climb.as_mut() {
            climb.climb_jump(velocity);
        }
    }

    pub fn dash_check_wall(&mut self) {
        if let Some(dash) = self.dash.as_mut() {
            dash.check_wall();
        }
    }
}

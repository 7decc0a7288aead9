use glam::{vec3, EulerRot, Quat, Vec3};

use crate::{
    config::{FlyConfig, GroundedConfig},
    input::InputCommand,
    lerp::approach_angle,
    orientation::OrientationState,
};

/// Where the avatar stands and which way it faces. Only exists once the avatar asset is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvatarPose {
    pub position: Vec3,
    /// radians around world up, 0 faces +Z
    pub facing_yaw: f32,
}

/// The things a strategy is allowed to move this frame.
#[derive(Debug)]
pub struct Movable<'a> {
    pub camera_position: &'a mut Vec3,
    pub avatar: Option<&'a mut AvatarPose>,
}

pub trait Locomotion {
    /// Applies one frame of movement and returns the displacement that was applied.
    fn step(
        &self,
        command: &InputCommand,
        orientation: OrientationState,
        dt: f32,
        movable: Movable<'_>,
    ) -> Vec3;
}

/// First-person free flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fly {
    pub speed: f32,
    pub boost_multiplier: f32,
}

impl Fly {
    pub fn new(config: &FlyConfig) -> Self {
        Fly {
            speed: config.move_speed,
            boost_multiplier: config.boost_multiplier,
        }
    }

    /// Unnormalized direction built from the view basis and world up.
    pub fn direction(command: &InputCommand, orientation: OrientationState) -> Vec3 {
        let rotation = Quat::from_euler(EulerRot::YXZ, orientation.yaw, orientation.pitch, 0.0);
        let forward = rotation * Vec3::NEG_Z;
        let right = rotation * Vec3::X;
        // move_axis.y is -1 for W
        forward * -command.move_axis.y
            + right * command.move_axis.x
            + Vec3::Y * command.vertical_axis
    }
}

impl Locomotion for Fly {
    fn step(
        &self,
        command: &InputCommand,
        orientation: OrientationState,
        dt: f32,
        movable: Movable<'_>,
    ) -> Vec3 {
        if !command.look_locked {
            return Vec3::ZERO;
        }
        let Some(direction) = Self::direction(command, orientation).try_normalize() else {
            return Vec3::ZERO;
        };
        let boost = if command.boosted {
            self.boost_multiplier
        } else {
            1.0
        };
        let displacement = direction * self.speed * boost * dt;
        *movable.camera_position += displacement;
        displacement
    }
}

/// Third-person walking on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grounded {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub turn_rate: f32,
}

impl Grounded {
    pub fn new(config: &GroundedConfig) -> Self {
        Grounded {
            walk_speed: config.walk_speed,
            run_speed: config.run_speed,
            turn_rate: config.turn_rate,
        }
    }

    /// Rotates the key axis by yaw only, `x' = x cos - z sin`, `z' = x sin + z cos`. Pitch never tilts the heading.
    pub fn heading(command: &InputCommand, yaw: f32) -> Vec3 {
        let (sin, cos) = yaw.sin_cos();
        let x = command.move_axis.x;
        let z = command.move_axis.y;
        vec3(x * cos - z * sin, 0.0, x * sin + z * cos)
    }
}

impl Locomotion for Grounded {
    fn step(
        &self,
        command: &InputCommand,
        orientation: OrientationState,
        dt: f32,
        movable: Movable<'_>,
    ) -> Vec3 {
        let Some(avatar) = movable.avatar else {
            return Vec3::ZERO;
        };
        let speed = if command.boosted {
            self.run_speed
        } else {
            self.walk_speed
        };

        let mut displacement = Vec3::ZERO;
        if let Some(heading) = Self::heading(command, orientation.yaw).try_normalize() {
            displacement = heading * speed * dt;
            let target_yaw = heading.x.atan2(heading.z);
            avatar.facing_yaw =
                approach_angle(avatar.facing_yaw, target_yaw, self.turn_rate * dt);
        }
        // no ground snapping, vertical input lifts the avatar off the plane
        displacement.y = command.vertical_axis * speed * dt;

        avatar.position += displacement;
        displacement
    }
}

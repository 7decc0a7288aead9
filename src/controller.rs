use glam::Vec3;

use crate::{
    animation::AnimationStateMachine,
    config::{CameraRigConfig, ControlMode, ViewerConfig},
    input::InputCommand,
    locomotion::{AvatarPose, Fly, Grounded, Locomotion, Movable},
    orientation::OrientationController,
    placement, Camera,
};

/// Everything the controller mutates between frames. Owned by the render loop.
pub struct ControllerState {
    mode: ControlMode,
    pub orientation: OrientationController,
    locomotion: Box<dyn Locomotion>,
    rig: CameraRigConfig,
    /// `None` until the avatar has loaded, and forever if it failed
    pub avatar: Option<AvatarPose>,
    pub animation: AnimationStateMachine,
}

impl std::fmt::Debug for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerState")
            .field("mode", &self.mode)
            .field("orientation", &self.orientation)
            .field("avatar", &self.avatar)
            .field("animation", &self.animation)
            .finish_non_exhaustive()
    }
}

impl ControllerState {
    pub fn new(config: &ViewerConfig) -> Self {
        let (orientation, locomotion): (_, Box<dyn Locomotion>) = match config.mode {
            ControlMode::Fly => (
                OrientationController::first_person(&config.fly),
                Box::new(Fly::new(&config.fly)),
            ),
            ControlMode::ThirdPerson => (
                OrientationController::orbit(&config.grounded.rig, config.grounded.mouse_sensitivity),
                Box::new(Grounded::new(&config.grounded)),
            ),
        };
        let expected_clips = if config.assets.avatar.is_some() {
            config.animation.clips.len()
        } else {
            0
        };
        ControllerState {
            mode: config.mode,
            orientation,
            locomotion,
            rig: config.grounded.rig,
            avatar: None,
            animation: AnimationStateMachine::new(expected_clips, config.animation.crossfade),
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Runs one frame and returns the displacement applied to the camera or avatar.
    pub fn frame(&mut self, command: &InputCommand, dt: f32, camera: &mut Camera) -> Vec3 {
        self.orientation.integrate(command.look_delta);
        let orientation = self.orientation.state();

        let displacement = self.locomotion.step(
            command,
            orientation,
            dt,
            Movable {
                camera_position: &mut camera.position,
                avatar: self.avatar.as_mut(),
            },
        );

        match self.mode {
            ControlMode::Fly => {
                placement::apply_fly_orientation(camera, orientation);
                self.animation.update(false, dt);
            }
            ControlMode::ThirdPerson => {
                // without an avatar the camera keeps its framed pose
                if let Some(avatar) = &self.avatar {
                    placement::apply_orbit(camera, &self.rig, orientation, avatar.position);
                }
                self.animation.update(command.movement_held, dt);
            }
        }
        displacement
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec2, vec3, Vec3};

    use super::ControllerState;
    use crate::{
        config::{ControlMode, ViewerConfig},
        input::InputCommand,
        locomotion::AvatarPose,
        Camera,
    };

    #[test]
    fn third_person_without_avatar_leaves_camera_alone() {
        let mut state = ControllerState::new(&ViewerConfig::new(ControlMode::ThirdPerson));
        let mut camera = Camera::new(640, 480);
        let before = camera.position;
        let command = InputCommand {
            move_axis: vec2(1.0, 0.0),
            movement_held: true,
            ..InputCommand::IDLE
        };
        assert_eq!(state.frame(&command, 0.1, &mut camera), Vec3::ZERO);
        assert_eq!(camera.position, before);
    }

    #[test]
    fn third_person_camera_follows_avatar() {
        let config = ViewerConfig::new(ControlMode::ThirdPerson);
        let mut state = ControllerState::new(&config);
        state.avatar = Some(AvatarPose::default());
        let mut camera = Camera::new(640, 480);
        let command = InputCommand {
            move_axis: vec2(0.0, -1.0),
            movement_held: true,
            ..InputCommand::IDLE
        };
        for _ in 0..10 {
            state.frame(&command, 0.1, &mut camera);
        }
        let avatar = state.avatar.map(|a| a.position).unwrap_or_default();
        assert!((avatar - vec3(0.0, 0.0, -2.0)).length() < 1e-5);
        let rig = config.grounded.rig;
        assert!((camera.position - (avatar + vec3(0.0, rig.height, rig.distance))).length() < 1e-4);
    }

    #[test]
    fn fly_mode_moves_the_camera_along_view() {
        let mut state = ControllerState::new(&ViewerConfig::new(ControlMode::Fly));
        let mut camera = Camera::new(640, 480);
        camera.position = Vec3::ZERO;
        let command = InputCommand {
            move_axis: vec2(0.0, -1.0),
            movement_held: true,
            look_locked: true,
            ..InputCommand::IDLE
        };
        state.frame(&command, 0.1, &mut camera);
        assert!((camera.position - vec3(0.0, 0.0, -0.6)).length() < 1e-5);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
    }
}

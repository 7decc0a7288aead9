use glam::{vec3, Vec3};
use log::{info, warn};

use crate::{
    config::CameraRigConfig,
    error::ViewerError,
    orientation::{OrientationController, OrientationState, PitchConvention},
    Aabb, Camera,
};

/// Standoff distance as a multiple of the largest splat extent.
pub const FRAMING_DISTANCE_FACTOR: f32 = 1.5;
/// Height above the splat center as a fraction of the standoff distance.
pub const FRAMING_HEIGHT_FACTOR: f32 = 0.4;

/// First-person: the camera is the player, only its rotation is resolved here.
/// Its position was already moved by the fly strategy.
pub fn apply_fly_orientation(camera: &mut Camera, orientation: OrientationState) {
    camera.set_yaw_pitch(orientation.yaw, orientation.pitch);
}

/// Offset of the orbit camera from the avatar's feet.
pub fn orbit_offset(rig: &CameraRigConfig, orientation: OrientationState) -> Vec3 {
    let (sin_yaw, cos_yaw) = orientation.yaw.sin_cos();
    let (sin_pitch, cos_pitch) = orientation.pitch.sin_cos();
    vec3(
        rig.distance * sin_yaw * cos_pitch,
        rig.height + rig.distance * sin_pitch,
        rig.distance * cos_yaw * cos_pitch,
    )
}

/// Third-person: places the camera on a sphere around the avatar and aims at its upper body.
pub fn apply_orbit(
    camera: &mut Camera,
    rig: &CameraRigConfig,
    orientation: OrientationState,
    avatar_position: Vec3,
) {
    camera.position = avatar_position + orbit_offset(rig, orientation);
    camera.look_at(avatar_position + Vec3::Y * rig.look_at_height);
}

/// Result of [`auto_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Framing {
    Framed { center: Vec3, distance: f32 },
    Fallback,
}

/// Camera position and target that show all of `bounds`, `None` if the box is empty or not finite.
pub fn framing_for(bounds: &Aabb) -> Option<(Vec3, Vec3, f32)> {
    if !bounds.is_finite() {
        return None;
    }
    let center = bounds.center();
    let distance = bounds.max_extent() * FRAMING_DISTANCE_FACTOR;
    let position = center + vec3(0.0, distance * FRAMING_HEIGHT_FACTOR, distance);
    Some((position, center, distance))
}

/// Frames the splat once it is ready. Falls back to a fixed pose if its bounds are unusable.
///
/// Either way the orientation controller is re-synchronised from the new camera rotation,
/// so the next mouse-look continues from what is on screen instead of jumping.
pub fn auto_frame(
    camera: &mut Camera,
    orientation: &mut OrientationController,
    bounds: Result<Aabb, ViewerError>,
    fallback_position: Vec3,
    fallback_target: Vec3,
) -> Framing {
    let framed = bounds.and_then(|b| {
        framing_for(&b).ok_or_else(|| ViewerError::AutoFrameUnavailable("splat bounds are empty".into()))
    });
    let framing = match framed {
        Ok((position, center, distance)) => {
            camera.position = position;
            camera.look_at(center);
            info!("Auto-framed: center={center}, dist={distance:.2}");
            Framing::Framed { center, distance }
        }
        Err(err) => {
            warn!("{err}, using the default camera pose");
            camera.position = fallback_position;
            camera.look_at(fallback_target);
            Framing::Fallback
        }
    };
    sync_orientation_from_camera(camera, orientation);
    framing
}

/// Reads yaw and pitch back out of the camera rotation (YXZ).
///
/// The orbit convention measures pitch as elevation above the target, so the camera's look-down pitch is negated.
pub fn sync_orientation_from_camera(camera: &Camera, orientation: &mut OrientationController) {
    let (yaw, pitch) = camera.yaw_pitch();
    match orientation.convention() {
        PitchConvention::FirstPerson => orientation.sync(yaw, pitch),
        PitchConvention::Orbit => orientation.sync(yaw, -pitch),
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Vec3};

    use super::{apply_fly_orientation, apply_orbit, auto_frame, sync_orientation_from_camera, Framing};
    use crate::{
        config::{CameraRigConfig, FlyConfig, GroundedConfig},
        error::ViewerError,
        orientation::{OrientationController, OrientationState},
        Aabb, Camera,
    };

    fn fallback(camera: &mut Camera, orientation: &mut OrientationController, bounds: Result<Aabb, ViewerError>) -> Framing {
        auto_frame(camera, orientation, bounds, vec3(0.0, 5.0, 20.0), Vec3::ZERO)
    }

    #[test]
    fn frames_box_from_above_and_behind() {
        let mut camera = Camera::new(800, 600);
        let mut orientation = OrientationController::first_person(&FlyConfig::default());
        let bounds = Aabb::from_center_size(Vec3::ZERO, vec3(10.0, 4.0, 10.0));
        let framing = fallback(&mut camera, &mut orientation, Ok(bounds));
        assert_eq!(
            framing,
            Framing::Framed {
                center: Vec3::ZERO,
                distance: 15.0
            }
        );
        assert!((camera.position - vec3(0.0, 6.0, 15.0)).length() < 1e-5);
        assert!((camera.forward() - vec3(0.0, -6.0, -15.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn framing_resyncs_orientation() {
        let mut camera = Camera::new(800, 600);
        let mut orientation = OrientationController::first_person(&FlyConfig::default());
        orientation.sync(2.0, 0.5);
        let bounds = Aabb::from_center_size(vec3(3.0, 1.0, -4.0), vec3(2.0, 8.0, 6.0));
        fallback(&mut camera, &mut orientation, Ok(bounds));

        let before = camera.forward();
        apply_fly_orientation(&mut camera, orientation.state());
        assert!((camera.forward() - before).length() < 1e-4, "mouse-look would jump");
    }

    #[test]
    fn framing_in_orbit_mode_yields_positive_elevation() {
        let grounded = GroundedConfig::default();
        let mut camera = Camera::new(800, 600);
        let mut orientation = OrientationController::orbit(&grounded.rig, grounded.mouse_sensitivity);
        let bounds = Aabb::from_center_size(Vec3::ZERO, vec3(10.0, 4.0, 10.0));
        fallback(&mut camera, &mut orientation, Ok(bounds));

        // the camera looks down at the splat, the orbit measures that as elevation above the target
        let (_, camera_pitch) = camera.yaw_pitch();
        assert!(camera_pitch < 0.0);
        let expected = (6.0f32 / 15.0).atan();
        assert!((orientation.pitch() - expected).abs() < 1e-5);
        let (min, max) = orientation.pitch_range();
        assert!((-10f32.to_radians()..=60f32.to_radians()).contains(&orientation.pitch()));
        assert!(min <= orientation.pitch() && orientation.pitch() <= max);

        // a near vertical view gets clamped to the orbit's upper bound
        camera.set_yaw_pitch(0.0, -80f32.to_radians());
        sync_orientation_from_camera(&camera, &mut orientation);
        assert!((orientation.pitch() - 60f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn empty_bounds_use_fallback_pose() {
        let mut camera = Camera::new(800, 600);
        let mut orientation = OrientationController::first_person(&FlyConfig::default());
        let framing = fallback(&mut camera, &mut orientation, Ok(Aabb::EMPTY));
        assert_eq!(framing, Framing::Fallback);
        assert_eq!(camera.position, vec3(0.0, 5.0, 20.0));
        assert!(orientation.pitch() < 0.0);
        assert!(orientation.yaw().abs() < 1e-5);
    }

    #[test]
    fn errors_use_fallback_pose() {
        let mut camera = Camera::new(800, 600);
        let mut orientation = OrientationController::first_person(&FlyConfig::default());
        let err = ViewerError::AutoFrameUnavailable("no geometry".into());
        assert_eq!(fallback(&mut camera, &mut orientation, Err(err)), Framing::Fallback);
        assert_eq!(camera.position, vec3(0.0, 5.0, 20.0));
    }

    #[test]
    fn orbit_sits_behind_avatar_at_zero_yaw() {
        let rig = CameraRigConfig::default();
        let mut camera = Camera::new(800, 600);
        let avatar = vec3(1.0, 0.0, -3.0);
        apply_orbit(&mut camera, &rig, OrientationState::default(), avatar);
        assert!((camera.position - (avatar + vec3(0.0, rig.height, rig.distance))).length() < 1e-5);
        let aim = (avatar + vec3(0.0, rig.look_at_height, 0.0) - camera.position).normalize();
        assert!((camera.forward() - aim).length() < 1e-5);
    }

    #[test]
    fn orbit_distance_is_constant() {
        let rig = CameraRigConfig::default();
        let mut camera = Camera::new(800, 600);
        for (yaw, pitch) in [(0.3, 0.1), (-2.0, 0.9), (5.0, -0.15)] {
            apply_orbit(&mut camera, &rig, OrientationState { yaw, pitch }, Vec3::ZERO);
            let pivot = vec3(0.0, rig.height, 0.0);
            assert!(((camera.position - pivot).length() - rig.distance).abs() < 1e-4);
        }
    }
}

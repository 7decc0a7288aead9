use glam::Vec2;

use crate::config::{CameraRigConfig, FlyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchConvention {
    /// pitch decreases with upward pointer motion
    FirstPerson,
    /// pitch increases with upward pointer motion
    Orbit,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationState {
    /// radians around world up
    pub yaw: f32,
    /// radians around the local right axis
    pub pitch: f32,
}

/// Mouse-look integration. First-person uses `pitch -= dy` within ±89°, the orbit camera flips the
/// sign (`pitch += dy`) and keeps pitch within -10°..60°. Yaw is never clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationController {
    state: OrientationState,
    sensitivity: f32,
    convention: PitchConvention,
    pitch_min: f32,
    pitch_max: f32,
}

impl OrientationController {
    /// `pitch_min`/`pitch_max` in radians.
    pub fn new(
        convention: PitchConvention,
        sensitivity: f32,
        pitch_min: f32,
        pitch_max: f32,
    ) -> Self {
        debug_assert!(pitch_min <= pitch_max);
        OrientationController {
            state: OrientationState::default(),
            sensitivity,
            convention,
            pitch_min,
            pitch_max,
        }
    }

    pub fn first_person(config: &FlyConfig) -> Self {
        let limit = config.pitch_limit_deg.to_radians();
        Self::new(
            PitchConvention::FirstPerson,
            config.mouse_sensitivity,
            -limit,
            limit,
        )
    }

    pub fn orbit(rig: &CameraRigConfig, sensitivity: f32) -> Self {
        Self::new(
            PitchConvention::Orbit,
            sensitivity,
            rig.pitch_min_deg.to_radians(),
            rig.pitch_max_deg.to_radians(),
        )
    }

    /// Applies a pointer delta in pixels.
    pub fn integrate(&mut self, delta: Vec2) {
        self.state.yaw -= delta.x * self.sensitivity;
        match self.convention {
            PitchConvention::FirstPerson => self.state.pitch -= delta.y * self.sensitivity,
            PitchConvention::Orbit => self.state.pitch += delta.y * self.sensitivity,
        }
        self.state.pitch = self.clamp_pitch(self.state.pitch);
    }

    /// Overwrites the angles, e.g. after the camera was re-aimed by auto-framing. Pitch is still clamped.
    pub fn sync(&mut self, yaw: f32, pitch: f32) {
        self.state.yaw = yaw;
        self.state.pitch = self.clamp_pitch(pitch);
    }

    #[inline]
    fn clamp_pitch(&self, pitch: f32) -> f32 {
        if pitch.is_nan() {
            return self.state.pitch.clamp(self.pitch_min, self.pitch_max);
        }
        pitch.clamp(self.pitch_min, self.pitch_max)
    }

    #[inline]
    pub fn state(&self) -> OrientationState {
        self.state
    }

    pub fn yaw(&self) -> f32 {
        self.state.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.state.pitch
    }

    pub fn pitch_range(&self) -> (f32, f32) {
        (self.pitch_min, self.pitch_max)
    }

    pub fn convention(&self) -> PitchConvention {
        self.convention
    }
}

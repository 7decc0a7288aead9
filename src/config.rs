use std::{path::PathBuf, time::Duration};

use glam::{vec3, Vec3};

use crate::{time::DEFAULT_MAX_DELTA, Color};

/// Which control scheme drives the camera. Picked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// First-person free-fly camera.
    #[default]
    Fly,
    /// Avatar walks on the ground, camera orbits behind it.
    ThirdPerson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub mode: ControlMode,
    pub fly: FlyConfig,
    pub grounded: GroundedConfig,
    pub animation: AnimationConfig,
    pub assets: AssetPaths,
    pub scene: SceneConfig,
    pub splat_readiness: SplatReadiness,
    pub splat_poll: SplatPollPolicy,
    pub max_frame_delta: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Fly,
            fly: FlyConfig::default(),
            grounded: GroundedConfig::default(),
            animation: AnimationConfig::default(),
            assets: AssetPaths::default(),
            scene: SceneConfig::default(),
            splat_readiness: SplatReadiness::Signal,
            splat_poll: SplatPollPolicy::default(),
            max_frame_delta: DEFAULT_MAX_DELTA,
        }
    }
}

impl ViewerConfig {
    pub fn new(mode: ControlMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_splat(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets.splat = path.into();
        self
    }

    pub fn with_avatar(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets.avatar = Some(path.into());
        self
    }

    pub fn without_avatar(mut self) -> Self {
        self.assets.avatar = None;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyConfig {
    /// units per second
    pub move_speed: f32,
    /// applied while Shift is held
    pub boost_multiplier: f32,
    /// radians per pixel of pointer delta
    pub mouse_sensitivity: f32,
    pub pitch_limit_deg: f32,
}

impl Default for FlyConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            boost_multiplier: 3.0,
            mouse_sensitivity: 0.002,
            pitch_limit_deg: 89.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundedConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    /// how quickly the avatar turns towards its heading, per second
    pub turn_rate: f32,
    pub mouse_sensitivity: f32,
    pub rig: CameraRigConfig,
}

impl Default for GroundedConfig {
    fn default() -> Self {
        Self {
            walk_speed: 2.0,
            run_speed: 5.0,
            turn_rate: 10.0,
            mouse_sensitivity: 0.002,
            rig: CameraRigConfig::default(),
        }
    }
}

/// Orbit camera around the avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRigConfig {
    pub distance: f32,
    pub height: f32,
    pub pitch_min_deg: f32,
    pub pitch_max_deg: f32,
    /// the camera aims this far above the avatar's feet
    pub look_at_height: f32,
}

impl Default for CameraRigConfig {
    fn default() -> Self {
        Self {
            distance: 4.0,
            height: 1.5,
            pitch_min_deg: -10.0,
            pitch_max_deg: 60.0,
            look_at_height: 1.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    pub crossfade: Duration,
    /// clip name and where to load it from
    pub clips: Vec<(String, PathBuf)>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            crossfade: Duration::from_millis(300),
            clips: vec![
                ("idle".into(), "assets/idle.glb".into()),
                ("walk".into(), "assets/walk.glb".into()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetPaths {
    pub splat: PathBuf,
    pub avatar: Option<PathBuf>,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            splat: "assets/scene.ply".into(),
            avatar: Some("assets/avatar.glb".into()),
        }
    }
}

/// Static scene setup: background, lights, initial camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub background: Color,
    pub ambient_light: f32,
    pub directional_light: f32,
    pub directional_light_position: Vec3,
    pub camera_start: Vec3,
    pub avatar_height: f32,
    pub fallback_camera_position: Vec3,
    pub fallback_camera_target: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: Color::from_rgb_hex(0x0a0a0f),
            ambient_light: 0.6,
            directional_light: 0.8,
            directional_light_position: vec3(5.0, 10.0, 7.0),
            camera_start: vec3(0.0, 2.0, 10.0),
            avatar_height: 1.8,
            fallback_camera_position: vec3(0.0, 5.0, 20.0),
            fallback_camera_target: Vec3::ZERO,
        }
    }
}

/// How the viewer learns that the splat can be framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplatReadiness {
    /// the load reports completion
    #[default]
    Signal,
    /// the splat node's bounds are polled, see [`SplatPollPolicy`]
    Poll,
}

/// Used when the splat loader gives no ready signal: the bounds are checked every `interval` up to `max_attempts` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatPollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for SplatPollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            max_attempts: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub window_name: String,
    pub width: u32,
    pub height: u32,
}

impl WindowConfig {
    pub fn new() -> Self {
        Self {
            window_name: "splatwalk".into(),
            width: 1280,
            height: 720,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}

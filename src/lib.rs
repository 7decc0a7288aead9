pub mod aabb;
pub mod animation;
pub mod app;
pub mod asset;
pub mod avatar;
pub mod camera;
pub mod color;
pub mod config;
pub mod controller;
pub mod error;
pub mod graphics_context;
pub mod input;
pub mod lerp;
pub mod locomotion;
pub mod orientation;
pub mod placement;
pub mod present;
pub mod scene;
pub mod splat;
pub mod time;
pub mod transform;
pub mod viewer;

pub use aabb::Aabb;
pub use animation::{AnimationClip, AnimationStateMachine, Mixer};
pub use app::{AppT, Runner, RunnerCallbacks};
pub use asset::{AssetT, LoadBarrier, LoadResult, LoadingAsset, Progress};
pub use avatar::{Avatar, ModelTree, NodeKind};
pub use camera::{Camera, Projection};
pub use color::Color;
pub use config::{ControlMode, ViewerConfig, WindowConfig};
pub use controller::ControllerState;
pub use error::{ModelError, SplatError, ViewerError};
pub use graphics_context::{GraphicsContext, GraphicsContextConfig};
pub use input::{Input, InputCommand, KeyState};
pub use lerp::{approach_angle, shortest_angle_delta, wrap_angle, Lerp};
pub use locomotion::{AvatarPose, Fly, Grounded, Locomotion};
pub use orientation::{OrientationController, OrientationState};
pub use present::{ClearPass, Renderer};
pub use scene::{Node, NodeContent, NodeId, Scene};
pub use splat::SplatCloud;
pub use time::{Stats as TimeStats, Time};
pub use transform::Transform;
pub use viewer::{Viewer, ViewerApp};
pub use winit::{dpi::PhysicalSize, event::WindowEvent, keyboard::KeyCode, window::Window};

pub mod ext {
    pub use anyhow;
    pub use glam;
    pub use gltf;
    pub use smallvec;
    pub use tokio;
    pub use wgpu;
    pub use winit;
}

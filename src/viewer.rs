use std::time::Duration;

use log::{error, info};
use tokio::runtime::Handle;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, WindowEvent},
};

use crate::{
    animation::AnimationClip,
    app::{AppT, RunnerCallbacks},
    asset::{LoadResult, LoadingAsset},
    avatar::Avatar,
    config::{SplatReadiness, ViewerConfig},
    controller::ControllerState,
    error::ViewerError,
    input::{Input, InputCommand},
    locomotion::AvatarPose,
    placement::{self, Framing},
    present::Renderer,
    scene::{Node, NodeContent, NodeId, Scene, SPLAT_FLIP},
    splat::{BoundsPoller, PollOutcome, SplatCloud},
    Aabb, Camera, Time, Transform,
};

#[derive(Debug)]
enum Bootstrap {
    /// framing happens when the splat load reports back
    AwaitingSignal,
    Polling(BoundsPoller),
    Done,
}

#[derive(Debug, Default)]
struct PendingLoads {
    splat: Option<LoadingAsset<SplatCloud>>,
    avatar: Option<LoadingAsset<Avatar>>,
    clips: Vec<(String, LoadingAsset<AnimationClip>)>,
}

/// Window-independent viewer state. Drive it with [`Viewer::frame`] after advancing [`Viewer::time`].
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    pub scene: Scene,
    pub camera: Camera,
    pub controller: ControllerState,
    pub time: Time,
    loads: PendingLoads,
    splat_node: Option<NodeId>,
    avatar_node: Option<NodeId>,
    bootstrap: Bootstrap,
    framing: Option<Framing>,
}

impl Viewer {
    pub fn new(config: ViewerConfig, size: PhysicalSize<u32>) -> Self {
        let mut camera = Camera::new(size.width, size.height);
        camera.position = config.scene.camera_start;
        let bootstrap = match config.splat_readiness {
            SplatReadiness::Signal => Bootstrap::AwaitingSignal,
            SplatReadiness::Poll => Bootstrap::Polling(BoundsPoller::new(config.splat_poll)),
        };
        Viewer {
            scene: Scene::new(&config.scene),
            camera,
            controller: ControllerState::new(&config),
            time: Time::new(config.max_frame_delta),
            loads: PendingLoads::default(),
            splat_node: None,
            avatar_node: None,
            bootstrap,
            framing: None,
            config,
        }
    }

    /// Kicks off every configured load on the blocking pool of `rt`.
    pub fn start_loading(&mut self, rt: &Handle) {
        let assets = self.config.assets.clone();
        self.track_splat(LoadingAsset::spawn(rt, "splat", assets.splat));
        if let Some(avatar) = assets.avatar {
            self.track_avatar(LoadingAsset::spawn(rt, "avatar", avatar));
            for (name, path) in self.config.animation.clips.clone() {
                let loading = LoadingAsset::spawn(rt, format!("clip '{name}'"), path);
                self.track_clip(name, loading);
            }
        }
    }

    pub fn track_splat(&mut self, loading: LoadingAsset<SplatCloud>) {
        self.loads.splat = Some(loading);
    }

    pub fn track_avatar(&mut self, loading: LoadingAsset<Avatar>) {
        self.loads.avatar = Some(loading);
    }

    pub fn track_clip(&mut self, name: impl Into<String>, loading: LoadingAsset<AnimationClip>) {
        self.loads.clips.push((name.into(), loading));
    }

    /// Moves finished loads into the scene. Never blocks.
    pub fn poll_loads(&mut self) {
        if let Some(result) = self.loads.splat.as_mut().and_then(|l| l.poll()) {
            self.loads.splat = None;
            self.on_splat(result);
        }

        if let Some(loading) = self.loads.avatar.as_mut() {
            if let Some(percent) = loading.progress_changed().and_then(|p| p.percent()) {
                info!("Avatar loading {percent}%");
            }
            if let Some(result) = loading.poll() {
                self.loads.avatar = None;
                self.on_avatar(result);
            }
        }

        let mut settled = vec![];
        self.loads.clips.retain_mut(|(name, loading)| match loading.poll() {
            Some(result) => {
                settled.push((std::mem::take(name), result));
                false
            }
            None => true,
        });
        for (name, result) in settled {
            self.controller.animation.on_clip_settled(&name, result);
        }
    }

    fn on_splat(&mut self, result: LoadResult<SplatCloud>) {
        match result {
            LoadResult::Ready(cloud) => {
                info!("Splat loaded");
                let node = Node::new("splat", NodeContent::Splat(cloud))
                    .with_transform(Transform::IDENTITY.with_rotation(SPLAT_FLIP));
                self.splat_node = Some(self.scene.add_node(node));
                if matches!(self.bootstrap, Bootstrap::AwaitingSignal) {
                    let bounds = self.scene.world_bounds(self.splat_node);
                    self.frame_splat(Ok(bounds));
                }
            }
            LoadResult::Failed(err) => {
                let err = ViewerError::asset_load("splat", &self.config.assets.splat, &err);
                error!("{err}");
                // the poller still runs out and frames the fallback pose
                if matches!(self.bootstrap, Bootstrap::AwaitingSignal) {
                    self.bootstrap = Bootstrap::Done;
                }
            }
        }
    }

    fn on_avatar(&mut self, result: LoadResult<Avatar>) {
        match result {
            LoadResult::Ready(mut avatar) => {
                avatar.normalize_height(self.config.scene.avatar_height);
                let replaced = avatar.prepare_surfaces();
                if replaced > 0 {
                    info!("Applied the fallback material to {replaced} untextured surfaces");
                }
                let pose = AvatarPose::default();
                let node = Node::new("avatar", NodeContent::Avatar(avatar))
                    .with_transform(Avatar::placement(pose.position, pose.facing_yaw));
                self.avatar_node = Some(self.scene.add_node(node));
                self.controller.avatar = Some(pose);
                info!("Avatar loaded");
            }
            LoadResult::Failed(err) => {
                let path = self.config.assets.avatar.clone().unwrap_or_default();
                error!("{}", ViewerError::asset_load("avatar", path, &err));
            }
        }
    }

    fn frame_splat(&mut self, bounds: Result<Aabb, ViewerError>) {
        let framing = placement::auto_frame(
            &mut self.camera,
            &mut self.controller.orientation,
            bounds,
            self.config.scene.fallback_camera_position,
            self.config.scene.fallback_camera_target,
        );
        self.framing = Some(framing);
        self.bootstrap = Bootstrap::Done;
    }

    fn poll_splat_bounds(&mut self) {
        let Bootstrap::Polling(poller) = &mut self.bootstrap else {
            return;
        };
        let scene = &self.scene;
        let splat_node = self.splat_node;
        match poller.tick(*self.time.raw_delta(), || scene.world_bounds(splat_node)) {
            PollOutcome::Pending => {}
            PollOutcome::Ready(bounds) => self.frame_splat(Ok(bounds)),
            PollOutcome::GaveUp => {
                let attempts = poller.attempts();
                self.frame_splat(Err(ViewerError::AutoFrameUnavailable(format!(
                    "splat bounds still empty after {attempts} checks"
                ))));
            }
        }
    }

    /// One frame: loads, bootstrap, controller pipeline, then the avatar node is brought in line with its pose.
    pub fn frame(&mut self, command: &InputCommand) {
        self.poll_loads();
        self.poll_splat_bounds();

        let dt = self.time.delta_secs();
        self.controller.frame(command, dt, &mut self.camera);

        let Some(pose) = self.controller.avatar else {
            return;
        };
        let samples = self.controller.animation.samples();
        if let Some(node) = self.avatar_node.and_then(|id| self.scene.node_mut(id)) {
            node.transform = Avatar::placement(pose.position, pose.facing_yaw);
            if let Some(avatar) = node.as_avatar_mut() {
                avatar.blend = samples;
            }
        }
    }

    /// Advances the clock by `raw` (clamped) and runs a frame.
    pub fn step(&mut self, command: &InputCommand, raw: Duration) {
        self.time.advance(raw);
        self.frame(command);
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.camera.resize(size);
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn splat_node(&self) -> Option<NodeId> {
        self.splat_node
    }

    pub fn avatar_node(&self) -> Option<NodeId> {
        self.avatar_node
    }

    /// How the one-shot auto-frame went, `None` until it ran.
    pub fn framing(&self) -> Option<Framing> {
        self.framing
    }
}

/// The windowed application: a [`Viewer`] fed by window input and drawn by a [`Renderer`].
pub struct ViewerApp<R: Renderer> {
    pub viewer: Viewer,
    pub input: Input,
    pub renderer: R,
    /// loads run on its blocking pool
    _rt: tokio::runtime::Runtime,
}

impl<R: Renderer> ViewerApp<R> {
    pub fn new(mut viewer: Viewer, renderer: R, rt: tokio::runtime::Runtime) -> Self {
        viewer.start_loading(rt.handle());
        ViewerApp {
            viewer,
            input: Input::default(),
            renderer,
            _rt: rt,
        }
    }
}

impl<R: Renderer> AppT for ViewerApp<R> {
    fn receive_window_event(&mut self, event: &WindowEvent) {
        self.input.receive_window_event(event);
        if let WindowEvent::Resized(size) = event {
            self.viewer.resize(*size);
            self.renderer.resize(*size);
        }
    }

    fn receive_device_event(&mut self, event: &DeviceEvent) {
        self.input.receive_device_event(event);
    }

    fn look_lock_changed(&mut self, locked: bool) {
        self.input.set_look_locked(locked);
        if locked {
            info!("Look-lock on, Escape to release");
        } else {
            info!("Look-lock off, click to look around");
        }
    }

    fn update(&mut self, cb: &mut RunnerCallbacks) {
        self.viewer.time.start_frame();
        if self.input.close_requested() {
            cb.exit("window closed");
        }
        if self.input.look_lock_requested() && !self.input.look_locked() {
            cb.request_look_lock(true);
        }
        if self.input.look_lock_release_requested() && self.input.look_locked() {
            cb.request_look_lock(false);
        }

        let command = self.input.sample();
        self.viewer.frame(&command);
        if let Err(err) = self.renderer.render(&self.viewer.scene, &self.viewer.camera) {
            error!("Render failed: {err:#}");
        }
        self.input.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;
    use glam::{vec3, Vec3};
    use winit::dpi::PhysicalSize;

    use super::Viewer;
    use crate::{
        animation::{AnimationClip, IDLE, WALK},
        asset::{LoadResult, LoadingAsset},
        config::{ControlMode, SplatPollPolicy, SplatReadiness, ViewerConfig},
        input::InputCommand,
        placement::Framing,
        splat::SplatCloud,
    };

    const FRAME: Duration = Duration::from_millis(16);

    fn viewer(config: ViewerConfig) -> Viewer {
        Viewer::new(config, PhysicalSize::new(800, 600))
    }

    fn splat_ready(viewer: &mut Viewer, points: Vec<Vec3>) {
        let (sender, loading) = LoadingAsset::channel("splat");
        viewer.track_splat(loading);
        sender.finish(LoadResult::Ready(SplatCloud::new(points)));
    }

    #[test]
    fn frames_once_the_splat_signals_ready() {
        let mut viewer = viewer(ViewerConfig::default().without_avatar());
        viewer.step(&InputCommand::IDLE, FRAME);
        assert_eq!(viewer.framing(), None);
        assert_eq!(viewer.camera.position, vec3(0.0, 2.0, 10.0));

        // flipped around X, so the box ends up at y in [-4, 0]
        splat_ready(&mut viewer, vec![vec3(-5.0, 0.0, -5.0), vec3(5.0, 4.0, 5.0)]);
        viewer.step(&InputCommand::IDLE, FRAME);
        let Some(Framing::Framed { center, distance }) = viewer.framing() else {
            panic!("expected framing, got {:?}", viewer.framing());
        };
        assert!((center - vec3(0.0, -2.0, 0.0)).length() < 1e-5);
        assert!((distance - 15.0).abs() < 1e-5);
        assert!((viewer.camera.position - vec3(0.0, 4.0, 15.0)).length() < 1e-4);
    }

    #[test]
    fn failed_splat_keeps_the_start_pose() {
        let mut viewer = viewer(ViewerConfig::default().without_avatar());
        let (sender, loading) = LoadingAsset::<SplatCloud>::channel("splat");
        viewer.track_splat(loading);
        sender.finish(LoadResult::Failed(anyhow!("file not found")));
        viewer.step(&InputCommand::IDLE, FRAME);
        assert!(viewer.splat_node().is_none());
        assert_eq!(viewer.framing(), None);
        assert!(viewer.scene.is_empty());
    }

    #[test]
    fn polling_gives_up_and_uses_fallback_pose() {
        let mut config = ViewerConfig::default().without_avatar();
        config.splat_readiness = SplatReadiness::Poll;
        config.splat_poll = SplatPollPolicy {
            interval: Duration::from_millis(250),
            max_attempts: 4,
        };
        let mut viewer = viewer(config);
        for _ in 0..3 {
            viewer.step(&InputCommand::IDLE, Duration::from_millis(250));
        }
        assert_eq!(viewer.framing(), None);
        viewer.step(&InputCommand::IDLE, Duration::from_millis(250));
        assert_eq!(viewer.framing(), Some(Framing::Fallback));
        assert_eq!(viewer.camera.position, vec3(0.0, 5.0, 20.0));
    }

    #[test]
    fn polling_frames_once_bounds_appear() {
        let mut config = ViewerConfig::default().without_avatar();
        config.splat_readiness = SplatReadiness::Poll;
        let mut viewer = viewer(config);
        viewer.step(&InputCommand::IDLE, Duration::from_millis(300));
        splat_ready(&mut viewer, vec![Vec3::ZERO, Vec3::ONE]);
        viewer.step(&InputCommand::IDLE, Duration::from_millis(300));
        assert!(matches!(viewer.framing(), Some(Framing::Framed { .. })));
    }

    #[test]
    fn clips_start_after_all_loads_settle() {
        let mut viewer = viewer(ViewerConfig::new(ControlMode::ThirdPerson));
        let (idle_tx, idle) = LoadingAsset::channel("idle");
        let (walk_tx, walk) = LoadingAsset::channel("walk");
        viewer.track_clip(IDLE, idle);
        viewer.track_clip(WALK, walk);

        walk_tx.finish(LoadResult::Ready(AnimationClip::new(WALK, 1.0)));
        viewer.step(&InputCommand::IDLE, FRAME);
        assert_eq!(viewer.controller.animation.active_clip_name(), None);

        idle_tx.finish(LoadResult::<AnimationClip>::Failed(anyhow!("corrupt")));
        viewer.step(&InputCommand::IDLE, FRAME);
        assert_eq!(viewer.controller.animation.active_clip_name(), Some(WALK));
    }

    #[test]
    fn large_frame_gaps_are_clamped() {
        let mut viewer = viewer(ViewerConfig::new(ControlMode::Fly).without_avatar());
        viewer.camera.position = Vec3::ZERO;
        let command = InputCommand {
            move_axis: glam::vec2(0.0, -1.0),
            movement_held: true,
            look_locked: true,
            ..InputCommand::IDLE
        };
        viewer.step(&command, Duration::from_secs(5));
        // 6 units/s for at most 0.1s
        assert!((viewer.camera.position - vec3(0.0, 0.0, -0.6)).length() < 1e-5);
    }
}

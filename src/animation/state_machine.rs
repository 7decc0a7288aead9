use std::{collections::HashMap, time::Duration};

use log::{info, warn};
use smallvec::SmallVec;

use super::mixer::{ActionId, AnimationClip, ClipSample, Mixer};
use crate::asset::{LoadBarrier, LoadResult};

pub const IDLE: &str = "idle";
pub const WALK: &str = "walk";

/// Coarse state the machine is in, derived from the active clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimState {
    NoClips,
    Idle,
    Walk,
}

/// Picks idle or walk from whether a movement key is held and crossfades between them.
///
/// Clips arrive asynchronously in any order. Nothing plays until every expected clip has either loaded or failed.
#[derive(Debug)]
pub struct AnimationStateMachine {
    mixer: Mixer,
    clips: HashMap<String, ActionId>,
    active: Option<String>,
    barrier: LoadBarrier,
    crossfade: f32,
}

impl AnimationStateMachine {
    pub fn new(expected_clips: usize, crossfade: Duration) -> Self {
        AnimationStateMachine {
            mixer: Mixer::new(),
            clips: HashMap::new(),
            active: None,
            barrier: LoadBarrier::new(expected_clips),
            crossfade: crossfade.as_secs_f32(),
        }
    }

    /// Registers the outcome of one clip load.
    pub fn on_clip_settled(&mut self, name: &str, result: LoadResult<AnimationClip>) {
        match result {
            LoadResult::Ready(mut clip) => {
                info!("Loaded animation '{name}' ({:.2}s)", clip.duration);
                clip.name = name.to_string();
                let id = self.mixer.clip_action(clip);
                self.clips.insert(name.to_string(), id);
            }
            LoadResult::Failed(err) => {
                warn!("Failed to load animation '{name}': {err:#}");
            }
        }
        if self.barrier.settle() {
            self.start_default();
        }
    }

    fn start_default(&mut self) {
        let Some(name) = [IDLE, WALK].into_iter().find(|n| self.clips.contains_key(*n)) else {
            warn!("No animation clips available, avatar stays in its bind pose");
            return;
        };
        if let Some(action) = self.clips.get(name).and_then(|id| self.mixer.action_mut(*id)) {
            action
                .reset()
                .set_effective_weight(1.0)
                .set_effective_time_scale(1.0)
                .play();
        }
        self.active = Some(name.to_string());
    }

    /// Chooses the target clip for this frame and advances playback.
    pub fn update(&mut self, movement_held: bool, dt: f32) {
        if self.barrier.is_complete() && self.active.is_some() {
            let target = if movement_held { WALK } else { IDLE };
            self.fade_to_action(target);
        }
        self.mixer.update(dt);
    }

    /// Crossfades from the active clip to `name`.
    ///
    /// Returns `false` without touching anything when `name` is already active or was never loaded.
    pub fn fade_to_action(&mut self, name: &str) -> bool {
        if self.active.as_deref() == Some(name) {
            return false;
        }
        let Some(&next) = self.clips.get(name) else {
            return false;
        };
        let previous = self.active.as_deref().and_then(|n| self.clips.get(n)).copied();

        // only the outgoing and incoming clip may carry weight
        let stale: SmallVec<[ActionId; 4]> = self
            .mixer
            .ids()
            .filter(|id| Some(*id) != previous && *id != next)
            .collect();
        for id in stale {
            if let Some(action) = self.mixer.action_mut(id) {
                action.stop();
            }
        }

        if let Some(action) = previous.and_then(|id| self.mixer.action_mut(id)) {
            action.fade_out(self.crossfade);
        }
        if let Some(action) = self.mixer.action_mut(next) {
            action
                .reset()
                .set_effective_time_scale(1.0)
                .set_effective_weight(1.0)
                .fade_in(self.crossfade)
                .play();
        }
        self.active = Some(name.to_string());
        true
    }

    pub fn active_clip_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn state(&self) -> AnimState {
        match self.active.as_deref() {
            Some(WALK) => AnimState::Walk,
            Some(_) => AnimState::Idle,
            None => AnimState::NoClips,
        }
    }

    pub fn crossfade_in_progress(&self) -> bool {
        self.mixer.any_fading()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn loading_complete(&self) -> bool {
        self.barrier.is_complete()
    }

    /// Current blend, handed to the skeletal sampler each frame.
    pub fn samples(&self) -> SmallVec<[ClipSample; 2]> {
        self.mixer.samples()
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }
}

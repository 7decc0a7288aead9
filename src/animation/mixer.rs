use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::Lerp;

new_key_type! { pub struct ActionId; }

/// A named, looping animation. Bone tracks stay with the skeletal sampler, the mixer only needs timing.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// seconds, zero for a static pose
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        AnimationClip {
            name: name.into(),
            duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

impl Fade {
    fn factor(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        self.from.lerp(&self.to, (self.elapsed / self.duration).min(1.0))
    }

    fn done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Playback state of one clip inside the [`Mixer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClipAction {
    clip: AnimationClip,
    time: f32,
    time_scale: f32,
    weight: f32,
    fade: Option<Fade>,
    playing: bool,
}

impl ClipAction {
    fn new(clip: AnimationClip) -> Self {
        ClipAction {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            fade: None,
            playing: false,
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.playing = false;
        self.fade = None;
        self.time = 0.0;
        self
    }

    /// Rewinds to the first frame and cancels any running fade.
    pub fn reset(&mut self) -> &mut Self {
        self.time = 0.0;
        self.fade = None;
        self
    }

    pub fn fade_in(&mut self, duration: f32) -> &mut Self {
        self.fade = Some(Fade {
            from: 0.0,
            to: 1.0,
            elapsed: 0.0,
            duration,
        });
        self
    }

    /// Ramps from full weight to zero, then stops the action.
    pub fn fade_out(&mut self, duration: f32) -> &mut Self {
        self.fade = Some(Fade {
            from: 1.0,
            to: 0.0,
            elapsed: 0.0,
            duration,
        });
        self
    }

    pub fn set_effective_weight(&mut self, weight: f32) -> &mut Self {
        self.weight = weight;
        self
    }

    pub fn set_effective_time_scale(&mut self, time_scale: f32) -> &mut Self {
        self.time_scale = time_scale;
        self
    }

    /// Blend weight after fading. Zero while stopped.
    pub fn effective_weight(&self) -> f32 {
        if !self.playing {
            return 0.0;
        }
        self.weight * self.fade.map_or(1.0, |f| f.factor())
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_fading(&self) -> bool {
        self.playing && self.fade.is_some()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.time += dt * self.time_scale;
        if self.clip.duration > 0.0 {
            self.time = self.time.rem_euclid(self.clip.duration);
        }
        if let Some(fade) = &mut self.fade {
            fade.elapsed += dt;
            if fade.done() {
                let finished_out = fade.to <= 0.0;
                self.fade = None;
                if finished_out {
                    self.stop();
                }
            }
        }
    }
}

/// What a skeletal sampler needs to pose the avatar for one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSample {
    pub name: String,
    pub time: f32,
    pub weight: f32,
}

/// Owns all clip actions of one avatar and advances them together.
#[derive(Debug, Default)]
pub struct Mixer {
    actions: SlotMap<ActionId, ClipAction>,
}

impl Mixer {
    pub fn new() -> Self {
        Mixer::default()
    }

    pub fn clip_action(&mut self, clip: AnimationClip) -> ActionId {
        self.actions.insert(ClipAction::new(clip))
    }

    pub fn action(&self, id: ActionId) -> Option<&ClipAction> {
        self.actions.get(id)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut ClipAction> {
        self.actions.get_mut(id)
    }

    pub fn update(&mut self, dt: f32) {
        for (_, action) in self.actions.iter_mut() {
            action.advance(dt);
        }
    }

    pub fn any_fading(&self) -> bool {
        self.actions.values().any(|a| a.is_fading())
    }

    /// Every action with a nonzero weight.
    pub fn samples(&self) -> SmallVec<[ClipSample; 2]> {
        self.actions
            .values()
            .filter_map(|a| {
                let weight = a.effective_weight();
                (weight > 0.0).then(|| ClipSample {
                    name: a.clip.name.clone(),
                    time: a.time,
                    weight,
                })
            })
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.actions.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimationClip, Mixer};

    #[test]
    fn time_loops_over_clip_duration() {
        let mut mixer = Mixer::new();
        let id = mixer.clip_action(AnimationClip::new("walk", 1.0));
        mixer.update(0.5);
        assert_eq!(mixer.action(id).map(|a| a.time()), Some(0.0));
        if let Some(a) = mixer.action_mut(id) {
            a.play();
        }
        mixer.update(0.75);
        mixer.update(0.5);
        let time = mixer.action(id).map(|a| a.time()).unwrap_or_default();
        assert!((time - 0.25).abs() < 1e-6);
    }

    #[test]
    fn fade_out_stops_the_action() {
        let mut mixer = Mixer::new();
        let id = mixer.clip_action(AnimationClip::new("idle", 2.0));
        if let Some(a) = mixer.action_mut(id) {
            a.play().fade_out(0.4);
        }
        mixer.update(0.2);
        let weight = mixer.action(id).map(|a| a.effective_weight()).unwrap_or_default();
        assert!((weight - 0.5).abs() < 1e-6);
        mixer.update(0.2);
        let action = mixer.action(id).expect("action exists");
        assert!(!action.is_playing());
        assert_eq!(action.effective_weight(), 0.0);
    }

    #[test]
    fn time_scale_speeds_up_playback() {
        let mut mixer = Mixer::new();
        let id = mixer.clip_action(AnimationClip::new("walk", 10.0));
        if let Some(a) = mixer.action_mut(id) {
            a.set_effective_time_scale(2.0).play();
        }
        mixer.update(1.0);
        assert_eq!(mixer.action(id).map(|a| a.time()), Some(2.0));
    }
}

pub mod mixer;
pub mod state_machine;

pub use mixer::{ActionId, AnimationClip, ClipAction, ClipSample, Mixer};
pub use state_machine::{AnimState, AnimationStateMachine, IDLE, WALK};

use glam::{vec2, Vec2};
use smallvec::SmallVec;
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Everything the controllers need from the user for one frame.
///
/// `move_axis.x` strafes right, `move_axis.y` moves along +Z, so W yields `y = -1`.
/// Both are raw key intent in `[-1, 1]`, not normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputCommand {
    /// Pointer movement in pixels since the previous sample. Always zero outside look-lock.
    pub look_delta: Vec2,
    pub move_axis: Vec2,
    /// -1, 0 or 1.
    pub vertical_axis: f32,
    pub boosted: bool,
    /// Any of W/A/S/D is held, even if they cancel out.
    pub movement_held: bool,
    pub look_locked: bool,
}

impl InputCommand {
    pub const IDLE: InputCommand = InputCommand {
        look_delta: Vec2::ZERO,
        move_axis: Vec2::ZERO,
        vertical_axis: 0.0,
        boosted: false,
        movement_held: false,
        look_locked: false,
    };
}

/// Collects window and device events between frames and turns them into an [`InputCommand`].
#[derive(Debug, Default)]
pub struct Input {
    keys: KeyState,
    close_requested: bool,
    look_locked: bool,
    look_lock_requested: bool,
    look_lock_release_requested: bool,
    pointer_delta: Vec2,
}

impl Input {
    pub fn receive_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let KeyEvent {
                    physical_key: PhysicalKey::Code(key),
                    state,
                    repeat: false,
                    ..
                } = event
                {
                    self.receive_key(*key, *state);
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if !self.look_locked {
                    self.look_lock_requested = true;
                }
            }
            WindowEvent::Focused(false) => {
                self.keys.release_all();
                if self.look_locked {
                    self.look_lock_release_requested = true;
                }
            }
            _ => {}
        }
    }

    /// Raw pointer motion. Only counted while look-lock is active.
    pub fn receive_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.accumulate_pointer_delta(vec2(*dx as f32, *dy as f32));
        }
    }

    pub fn accumulate_pointer_delta(&mut self, delta: Vec2) {
        if self.look_locked {
            self.pointer_delta += delta;
        }
    }

    pub fn receive_key(&mut self, key: KeyCode, state: ElementState) {
        if key == KeyCode::Escape && state == ElementState::Pressed && self.look_locked {
            self.look_lock_release_requested = true;
        }
        self.keys.receive_element_state(key, state);
    }

    /// Set by the host once the pointer grab actually changed.
    pub fn set_look_locked(&mut self, locked: bool) {
        self.look_locked = locked;
        self.look_lock_requested = false;
        self.look_lock_release_requested = false;
        if !locked {
            self.pointer_delta = Vec2::ZERO;
        }
    }

    pub fn look_locked(&self) -> bool {
        self.look_locked
    }

    /// The user asked to enter look-lock (clicked the window) this frame.
    pub fn look_lock_requested(&self) -> bool {
        self.look_lock_requested
    }

    /// The user asked to leave look-lock (Escape or focus loss) this frame.
    pub fn look_lock_release_requested(&self) -> bool {
        self.look_lock_release_requested
    }

    /// Builds the command for this frame and resets the accumulated pointer delta.
    pub fn sample(&mut self) -> InputCommand {
        let look_delta = if self.look_locked {
            std::mem::take(&mut self.pointer_delta)
        } else {
            self.pointer_delta = Vec2::ZERO;
            Vec2::ZERO
        };
        let keys = &self.keys;
        InputCommand {
            look_delta,
            move_axis: keys.wasd_axis(),
            vertical_axis: keys.vertical_axis(),
            boosted: keys.is_pressed(KeyCode::ShiftLeft) || keys.is_pressed(KeyCode::ShiftRight),
            movement_held: [KeyCode::KeyW, KeyCode::KeyA, KeyCode::KeyS, KeyCode::KeyD]
                .iter()
                .any(|k| keys.is_pressed(*k)),
            look_locked: self.look_locked,
        }
    }

    pub fn end_frame(&mut self) {
        self.close_requested = false;
        self.look_lock_requested = false;
        self.look_lock_release_requested = false;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

}

#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pressed: SmallVec<[KeyCode; 8]>,
}

impl KeyState {
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn any_pressed(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|k| self.is_pressed(*k))
    }

    /// Strafe on x, W/S on y with W pointing to -Z.
    pub fn wasd_axis(&self) -> Vec2 {
        let mut v = Vec2::ZERO;
        if self.is_pressed(KeyCode::KeyW) {
            v.y -= 1.0;
        }
        if self.is_pressed(KeyCode::KeyS) {
            v.y += 1.0;
        }
        if self.is_pressed(KeyCode::KeyA) {
            v.x -= 1.0;
        }
        if self.is_pressed(KeyCode::KeyD) {
            v.x += 1.0;
        }
        v
    }

    /// Space/E lift, Ctrl/Q/C sink.
    pub fn vertical_axis(&self) -> f32 {
        let mut v = 0.0;
        if self.any_pressed(&[KeyCode::Space, KeyCode::KeyE]) {
            v += 1.0;
        }
        if self.any_pressed(&[
            KeyCode::ControlLeft,
            KeyCode::ControlRight,
            KeyCode::KeyQ,
            KeyCode::KeyC,
        ]) {
            v -= 1.0;
        }
        v
    }

    pub fn release_all(&mut self) {
        self.pressed.clear();
    }

    pub fn receive_element_state(&mut self, value: KeyCode, element_state: ElementState) {
        match element_state {
            ElementState::Released => self.pressed.retain(|e| *e != value),
            ElementState::Pressed => {
                if !self.pressed.contains(&value) {
                    self.pressed.push(value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::vec2;
    use winit::{
        event::{ElementState, WindowEvent},
        keyboard::KeyCode,
    };

    use super::{Input, InputCommand};

    #[test]
    fn no_input_is_the_idle_command() {
        let mut input = Input::default();
        assert_eq!(input.sample(), InputCommand::IDLE);
    }

    #[test]
    fn pointer_delta_ignored_outside_look_lock() {
        let mut input = Input::default();
        input.accumulate_pointer_delta(vec2(10.0, 4.0));
        assert_eq!(input.sample().look_delta, glam::Vec2::ZERO);
    }

    #[test]
    fn pointer_delta_accumulates_and_resets_per_sample() {
        let mut input = Input::default();
        input.set_look_locked(true);
        input.accumulate_pointer_delta(vec2(10.0, 4.0));
        input.accumulate_pointer_delta(vec2(-3.0, 1.0));
        let cmd = input.sample();
        assert_eq!(cmd.look_delta, vec2(7.0, 5.0));
        assert!(cmd.look_locked);
        assert_eq!(input.sample().look_delta, glam::Vec2::ZERO);
    }

    #[test]
    fn keys_map_to_axes() {
        let mut input = Input::default();
        input.receive_key(KeyCode::KeyW, ElementState::Pressed);
        input.receive_key(KeyCode::KeyD, ElementState::Pressed);
        input.receive_key(KeyCode::Space, ElementState::Pressed);
        input.receive_key(KeyCode::ShiftRight, ElementState::Pressed);
        let cmd = input.sample();
        assert_eq!(cmd.move_axis, vec2(1.0, -1.0));
        assert_eq!(cmd.vertical_axis, 1.0);
        assert!(cmd.boosted);
        assert!(cmd.movement_held);

        input.receive_key(KeyCode::KeyC, ElementState::Pressed);
        assert_eq!(input.sample().vertical_axis, 0.0);
    }

    #[test]
    fn opposite_keys_cancel_but_still_count_as_held() {
        let mut input = Input::default();
        input.receive_key(KeyCode::KeyW, ElementState::Pressed);
        input.receive_key(KeyCode::KeyS, ElementState::Pressed);
        let cmd = input.sample();
        assert_eq!(cmd.move_axis, glam::Vec2::ZERO);
        assert!(cmd.movement_held);
    }

    #[test]
    fn focus_loss_releases_keys_and_look_lock() {
        let mut input = Input::default();
        input.set_look_locked(true);
        input.receive_key(KeyCode::KeyW, ElementState::Pressed);
        input.receive_window_event(&WindowEvent::Focused(false));
        assert!(input.look_lock_release_requested());
        let cmd = input.sample();
        assert_eq!(cmd.move_axis, glam::Vec2::ZERO);
        assert!(!cmd.movement_held);
    }

    #[test]
    fn escape_requests_release_only_when_locked() {
        let mut input = Input::default();
        input.receive_key(KeyCode::Escape, ElementState::Pressed);
        assert!(!input.look_lock_release_requested());
        input.set_look_locked(true);
        input.receive_key(KeyCode::Escape, ElementState::Pressed);
        assert!(input.look_lock_release_requested());
        input.set_look_locked(false);
        assert!(!input.look_locked());
    }
}

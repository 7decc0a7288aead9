use std::sync::Arc;

use log::{info, warn};
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, Event, WindowEvent},
    event_loop::EventLoop,
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::config::WindowConfig;

pub trait AppT {
    fn receive_window_event(&mut self, event: &WindowEvent);

    /// Raw device input, e.g. mouse motion that keeps arriving while the cursor is grabbed.
    fn receive_device_event(&mut self, event: &DeviceEvent);

    /// Called after the runner tried to grab or release the cursor, with the resulting state.
    fn look_lock_changed(&mut self, locked: bool);

    fn update(&mut self, cb: &mut RunnerCallbacks);
}

pub struct Runner {
    event_loop: EventLoop<()>,
    window: Arc<Window>,
}

impl Runner {
    pub fn window(&self) -> Arc<Window> {
        self.window.clone()
    }

    pub fn new(config: &WindowConfig) -> anyhow::Result<Self> {
        let (window, event_loop) = create_window_and_event_loop(config)?;
        let window = Arc::new(window);

        Ok(Self { event_loop, window })
    }

    pub fn run(self, app: &mut dyn AppT) -> anyhow::Result<()> {
        let window = self.window.clone();
        self.event_loop.run(move |event, window_target| {
            match &event {
                Event::WindowEvent { window_id, event } => {
                    if *window_id != window.id() {
                        return;
                    }

                    app.receive_window_event(event);

                    if matches!(event, WindowEvent::RedrawRequested) {
                        //  this is called every frame:
                        let mut cb = RunnerCallbacks::default();
                        app.update(&mut cb);

                        if let Some(lock) = cb.look_lock {
                            let locked = set_look_lock(&window, lock);
                            app.look_lock_changed(locked);
                        }

                        if let Some(reason) = cb.exit {
                            info!("Exit: {reason}");
                            window_target.exit();
                        } else {
                            window.request_redraw()
                        }
                    }
                }
                Event::DeviceEvent { event, .. } => app.receive_device_event(event),
                _ => {}
            }
        })?;
        Ok(())
    }
}

/// Grabs and hides the cursor, or gives it back. Returns whether the cursor is grabbed afterwards.
fn set_look_lock(window: &Window, lock: bool) -> bool {
    if !lock {
        if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
            warn!("Could not release the cursor: {err}");
        }
        window.set_cursor_visible(true);
        return false;
    }
    // not every platform can lock, confining is close enough since only raw motion is read
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
        Ok(()) => {
            window.set_cursor_visible(false);
            true
        }
        Err(err) => {
            warn!("Could not grab the cursor: {err}");
            false
        }
    }
}

#[derive(Debug, Default)]
pub struct RunnerCallbacks {
    /// String is the exit reason
    exit: Option<String>,
    look_lock: Option<bool>,
}

impl RunnerCallbacks {
    pub fn exit(&mut self, s: &str) {
        self.exit = Some(s.to_owned())
    }

    /// Asks the runner to grab (`true`) or release (`false`) the cursor after this frame.
    pub fn request_look_lock(&mut self, lock: bool) {
        self.look_lock = Some(lock);
    }

    pub fn exit_reason(&self) -> Option<&str> {
        self.exit.as_deref()
    }

    pub fn look_lock_request(&self) -> Option<bool> {
        self.look_lock
    }
}

pub fn create_window_and_event_loop(config: &WindowConfig) -> anyhow::Result<(Window, EventLoop<()>)> {
    let event_loop = EventLoop::new()?;

    let size = PhysicalSize::new(config.width, config.height);
    let window = WindowBuilder::new()
        .with_visible(true)
        .with_title(&config.window_name)
        .with_inner_size(size)
        .with_resizable(true)
        .build(&event_loop)?;

    Ok((window, event_loop))
}

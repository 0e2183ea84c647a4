use std::collections::HashMap;

use glam::Vec2;

use crate::event::InputEvent;

/// Current input state for one surface.
///
/// Holds key/button state by code, the last pointer position in screen pixels,
/// and the wheel delta accumulated since the last frame.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashMap<String, bool>,
    pointer: Option<Vec2>,
    wheel: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the state.
    pub fn apply(&mut self, event: &InputEvent) {
        match event {
            InputEvent::PointerMoved { x, y } => {
                self.pointer = Some(Vec2::new(*x, *y));
            }
            InputEvent::PointerButton {
                button, pressed, ..
            } => {
                if let Some(code) = button.key_code() {
                    self.keys.insert(code.to_string(), *pressed);
                }
            }
            InputEvent::Key { code, pressed } => {
                self.keys.insert(code.clone(), *pressed);
            }
            InputEvent::Wheel { delta } => {
                self.wheel += delta;
            }
        }
        tracing::trace!(?event, "input applied");
    }

    /// Whether the key (or mirrored mouse button) is held. Unknown codes are released.
    pub fn key(&self, code: &str) -> bool {
        self.keys.get(code).copied().unwrap_or(false)
    }

    /// Last pointer position in screen pixels.
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    /// Wheel delta accumulated since the last [`end_frame`](Self::end_frame).
    pub fn wheel(&self) -> f32 {
        self.wheel
    }

    /// Reset per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.wheel = 0.0;
    }
}

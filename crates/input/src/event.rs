/// Mouse buttons the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u16),
}

impl MouseButton {
    /// Name under which the button is mirrored into the key map.
    pub fn key_code(&self) -> Option<&'static str> {
        match self {
            MouseButton::Left => Some("ClickLeft"),
            MouseButton::Middle => Some("ClickMiddle"),
            MouseButton::Right => Some("ClickRight"),
            MouseButton::Other(_) => None,
        }
    }
}

/// A platform-agnostic input event.
///
/// Pointer coordinates are screen pixels relative to the surface's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f32, y: f32 },
    PointerButton {
        button: MouseButton,
        pressed: bool,
        shift: bool,
    },
    Key { code: String, pressed: bool },
    Wheel { delta: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_standard_buttons_have_key_codes() {
        assert_eq!(MouseButton::Left.key_code(), Some("ClickLeft"));
        assert_eq!(MouseButton::Middle.key_code(), Some("ClickMiddle"));
        assert_eq!(MouseButton::Right.key_code(), Some("ClickRight"));
        assert_eq!(MouseButton::Other(4).key_code(), None);
    }

    #[test]
    fn key_event_is_constructible() {
        let ev = InputEvent::Key {
            code: "KeyW".into(),
            pressed: true,
        };
        assert!(matches!(ev, InputEvent::Key { pressed: true, .. }));
    }
}

//! `device_query` backed keyboard and pointer state.
//!
//! State reads go through `device_query`. On Linux, pointer warping, screen
//! size and cursor visibility go through an [`X11Cursor`]; elsewhere, or when
//! no X server answers, those report unsupported and the sampling loop falls
//! back to absolute pointer tracking.

use super::{InputBackend, InputError, InputSource};
use crate::mapping::input_id::PointerButton;
use device_query::{DeviceQuery, DeviceState, Keycode, MouseState};
use tracing::debug;

#[cfg(target_os = "linux")]
use super::x11_cursor::X11Cursor;
#[cfg(target_os = "linux")]
use tracing::warn;

pub struct DesktopBackend;

impl InputBackend for DesktopBackend {
    fn name(&self) -> &str {
        "device_query"
    }

    fn open(&self) -> Result<Box<dyn InputSource>, InputError> {
        debug!("Opening device_query input source");
        Ok(Box::new(DesktopInput::new()))
    }
}

pub struct DesktopInput {
    device_state: DeviceState,
    keys: Vec<Keycode>,
    mouse: Option<MouseState>,
    #[cfg(target_os = "linux")]
    cursor: Option<X11Cursor>,
}

impl DesktopInput {
    pub fn new() -> Self {
        Self {
            device_state: DeviceState::new(),
            keys: Vec::new(),
            mouse: None,
            #[cfg(target_os = "linux")]
            cursor: match X11Cursor::connect() {
                Ok(cursor) => Some(cursor),
                Err(e) => {
                    warn!("Cursor control unavailable: {}", e);
                    None
                }
            },
        }
    }

    #[cfg(target_os = "linux")]
    fn cursor(&mut self, operation: &'static str) -> Result<&mut X11Cursor, InputError> {
        self.cursor.as_mut().ok_or(InputError::Unsupported(operation))
    }

    fn mouse(&mut self) -> &MouseState {
        let device_state = &self.device_state;
        self.mouse.get_or_insert_with(|| device_state.get_mouse())
    }
}

impl InputSource for DesktopInput {
    fn refresh(&mut self) -> Result<(), InputError> {
        self.keys = self.device_state.get_keys();
        self.mouse = Some(self.device_state.get_mouse());
        Ok(())
    }

    fn is_key_pressed(&mut self, key: &str) -> Result<bool, InputError> {
        let keycode = keycode_for(key).ok_or_else(|| InputError::UnknownKey(key.to_string()))?;
        Ok(match keycode {
            KeyMatch::One(code) => self.keys.contains(&code),
            KeyMatch::Either(a, b) => self.keys.contains(&a) || self.keys.contains(&b),
        })
    }

    fn is_pointer_pressed(&mut self, button: PointerButton) -> Result<bool, InputError> {
        let index = pointer_index(button);
        Ok(self.mouse().button_pressed.get(index).copied().unwrap_or(false))
    }

    fn pointer_position(&mut self) -> Result<(i32, i32), InputError> {
        Ok(self.mouse().coords)
    }

    #[cfg(target_os = "linux")]
    fn screen_center(&mut self) -> Result<(i32, i32), InputError> {
        Ok(self.cursor("screen size query")?.screen_center())
    }

    #[cfg(target_os = "linux")]
    fn set_pointer_position(&mut self, position: (i32, i32)) -> Result<(), InputError> {
        self.cursor("pointer warping")?.warp(position)?;
        // The next read must see the warped position
        self.mouse = None;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), InputError> {
        self.cursor("cursor visibility")?.set_visible(visible)
    }

    #[cfg(not(target_os = "linux"))]
    fn screen_center(&mut self) -> Result<(i32, i32), InputError> {
        Err(InputError::Unsupported("screen size query"))
    }

    #[cfg(not(target_os = "linux"))]
    fn set_pointer_position(&mut self, _position: (i32, i32)) -> Result<(), InputError> {
        Err(InputError::Unsupported("pointer warping"))
    }

    #[cfg(not(target_os = "linux"))]
    fn set_cursor_visible(&mut self, _visible: bool) -> Result<(), InputError> {
        Err(InputError::Unsupported("cursor visibility"))
    }
}

enum KeyMatch {
    One(Keycode),
    Either(Keycode, Keycode),
}

// X11 reports middle as button 2, Windows and macOS as button 3.
#[cfg(target_os = "linux")]
fn pointer_index(button: PointerButton) -> usize {
    match button {
        PointerButton::Left => 1,
        PointerButton::Middle => 2,
        PointerButton::Right => 3,
        PointerButton::X1 => 8,
        PointerButton::X2 => 9,
    }
}

#[cfg(not(target_os = "linux"))]
fn pointer_index(button: PointerButton) -> usize {
    match button {
        PointerButton::Left => 1,
        PointerButton::Right => 2,
        PointerButton::Middle => 3,
        PointerButton::X1 => 4,
        PointerButton::X2 => 5,
    }
}

fn keycode_for(key: &str) -> Option<KeyMatch> {
    use KeyMatch::{Either, One};

    let code = match key {
        "a" => One(Keycode::A),
        "b" => One(Keycode::B),
        "c" => One(Keycode::C),
        "d" => One(Keycode::D),
        "e" => One(Keycode::E),
        "f" => One(Keycode::F),
        "g" => One(Keycode::G),
        "h" => One(Keycode::H),
        "i" => One(Keycode::I),
        "j" => One(Keycode::J),
        "k" => One(Keycode::K),
        "l" => One(Keycode::L),
        "m" => One(Keycode::M),
        "n" => One(Keycode::N),
        "o" => One(Keycode::O),
        "p" => One(Keycode::P),
        "q" => One(Keycode::Q),
        "r" => One(Keycode::R),
        "s" => One(Keycode::S),
        "t" => One(Keycode::T),
        "u" => One(Keycode::U),
        "v" => One(Keycode::V),
        "w" => One(Keycode::W),
        "x" => One(Keycode::X),
        "y" => One(Keycode::Y),
        "z" => One(Keycode::Z),
        "0" => One(Keycode::Key0),
        "1" => One(Keycode::Key1),
        "2" => One(Keycode::Key2),
        "3" => One(Keycode::Key3),
        "4" => One(Keycode::Key4),
        "5" => One(Keycode::Key5),
        "6" => One(Keycode::Key6),
        "7" => One(Keycode::Key7),
        "8" => One(Keycode::Key8),
        "9" => One(Keycode::Key9),
        "f1" => One(Keycode::F1),
        "f2" => One(Keycode::F2),
        "f3" => One(Keycode::F3),
        "f4" => One(Keycode::F4),
        "f5" => One(Keycode::F5),
        "f6" => One(Keycode::F6),
        "f7" => One(Keycode::F7),
        "f8" => One(Keycode::F8),
        "f9" => One(Keycode::F9),
        "f10" => One(Keycode::F10),
        "f11" => One(Keycode::F11),
        "f12" => One(Keycode::F12),
        "space" => One(Keycode::Space),
        "enter" => One(Keycode::Enter),
        "tab" => One(Keycode::Tab),
        "backspace" => One(Keycode::Backspace),
        "escape" | "esc" => One(Keycode::Escape),
        "up" => One(Keycode::Up),
        "down" => One(Keycode::Down),
        "left" => One(Keycode::Left),
        "right" => One(Keycode::Right),
        "home" => One(Keycode::Home),
        "end" => One(Keycode::End),
        "page up" => One(Keycode::PageUp),
        "page down" => One(Keycode::PageDown),
        "insert" => One(Keycode::Insert),
        "delete" => One(Keycode::Delete),
        "shift" => Either(Keycode::LShift, Keycode::RShift),
        "left shift" => One(Keycode::LShift),
        "right shift" => One(Keycode::RShift),
        "ctrl" => Either(Keycode::LControl, Keycode::RControl),
        "left ctrl" => One(Keycode::LControl),
        "right ctrl" => One(Keycode::RControl),
        "alt" => Either(Keycode::LAlt, Keycode::RAlt),
        "left alt" => One(Keycode::LAlt),
        "right alt" => One(Keycode::RAlt),
        "caps lock" => One(Keycode::CapsLock),
        "'" => One(Keycode::Apostrophe),
        ";" => One(Keycode::Semicolon),
        "," => One(Keycode::Comma),
        "." => One(Keycode::Dot),
        "/" => One(Keycode::Slash),
        "\\" => One(Keycode::BackSlash),
        "-" => One(Keycode::Minus),
        "=" => One(Keycode::Equal),
        "[" => One(Keycode::LeftBracket),
        "]" => One(Keycode::RightBracket),
        "`" => One(Keycode::Grave),
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::input_id::KNOWN_KEYS;

    #[test]
    fn every_known_key_has_a_keycode() {
        for key in KNOWN_KEYS {
            assert!(keycode_for(key).is_some(), "no keycode for {key}");
        }
    }
}

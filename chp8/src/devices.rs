//! IO device interface
use crate::{constants::*, display::Framebuffer};

/// Hooks to provide IO devices to the virtual machine.
///
/// The machine never blocks on a device. Waiting for a keypress is done by
/// stalling the program until `pressed_key` returns a key.
pub trait Devices {
    /// Checks immediately whether the given key is currently pressed.
    fn is_pressed(&self, key: KeyCode) -> bool;

    /// Any key that is currently pressed, lowest key first.
    fn pressed_key(&self) -> Option<KeyCode> {
        KeyCode::ALL.iter().copied().find(|key| self.is_pressed(*key))
    }

    /// Blit the display buffer to screen output.
    ///
    /// Only called when the buffer changed since the previous draw.
    fn draw(&mut self, display: &Framebuffer);

    /// Whether the output surface is still open.
    ///
    /// The machine becomes inactive once this returns false.
    fn is_open(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(try_from = "u8"))]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    #[rustfmt::skip]
    pub const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0, Self::Key1, Self::Key2, Self::Key3,
        Self::Key4, Self::Key5, Self::Key6, Self::Key7,
        Self::Key8, Self::Key9, Self::KeyA, Self::KeyB,
        Self::KeyC, Self::KeyD, Self::KeyE, Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(key_id as usize).copied().ok_or(InvalidKeyCode)
    }
}

#[derive(Debug)]
pub struct InvalidKeyCode;

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "keycode must be in range 0 <= keycode < 16")
    }
}

/// Devices without any window or keyboard attached.
///
/// Key state is set by the caller, and drawn frames are only counted.
#[derive(Debug, Default)]
pub struct Headless {
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    key_state: u16,
    frames: usize,
    closed: bool,
}

impl Headless {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.key_state |= 1 << key.as_u8();
        } else {
            self.key_state &= !(1 << key.as_u8());
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Report the output surface as closed.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Devices for Headless {
    fn is_pressed(&self, key: KeyCode) -> bool {
        self.key_state & (1 << key.as_u8()) != 0
    }

    fn draw(&mut self, _display: &Framebuffer) {
        self.frames += 1;
    }

    fn is_open(&self) -> bool {
        !self.closed
    }
}

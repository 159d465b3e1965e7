//! Raw key events.
//!
//! Listeners report every key transition as a [`KeyEvent`]: a device-local
//! keycode plus the edge that occurred. Keycodes are whatever the device's
//! driver reports (Linux `KEY_*` / `BTN_*` codes for evdev) and are not
//! translated to characters.
//!
//! ## Edge conventions
//! - **Press** is the key going down. Calibration uses it to decide *which* key
//!   was struck.
//! - **Release** is the key coming back up. Captured bindings fire on it.
//! - Autorepeat is not an edge and is dropped by the backends.

/// Which half of a press/release pair an event is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyEdge {
    Press,
    Release,
}

impl KeyEdge {
    #[inline]
    pub fn is_release(self) -> bool {
        matches!(self, KeyEdge::Release)
    }

    #[inline]
    pub fn from_release(is_release: bool) -> Self {
        if is_release {
            KeyEdge::Release
        } else {
            KeyEdge::Press
        }
    }
}

/// One key transition on one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u16,
    pub edge: KeyEdge,
}

impl KeyEvent {
    pub fn press(keycode: u16) -> Self {
        Self {
            keycode,
            edge: KeyEdge::Press,
        }
    }

    pub fn release(keycode: u16) -> Self {
        Self {
            keycode,
            edge: KeyEdge::Release,
        }
    }
}

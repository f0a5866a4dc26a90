//! Core event types shared by the input driver, the command parser, and the
//! editor loop.
//!
//! The input thread normalizes terminal events into [`UiEvent`]s and pushes
//! them over a bounded crossbeam channel; the editor loop is the single
//! consumer. Key and mouse representations are deliberately abstract so the
//! editing model never sees backend types.

use std::fmt;

/// Capacity of the main event channel. A single producer (the input thread)
/// and a single consumer keep latency low; the bound provides backpressure
/// instead of unbounded growth during event bursts.
pub const EVENT_CHANNEL_CAP: usize = 1024;

pub type EventSender = crossbeam_channel::Sender<UiEvent>;
pub type EventReceiver = crossbeam_channel::Receiver<UiEvent>;

/// Create the main event channel.
pub fn channel() -> (EventSender, EventReceiver) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAP)
}

/// Top-level event enum consumed by the editor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Key(KeyPress),
    Mouse(MouseInput),
    Resize(u16, u16),
    Quit,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Mods: u8 {
        const CTRL = 0b01;
        const ALT  = 0b10;
    }
}

/// Logical keys. Printable input arrives as `Char`; a literal tab is
/// `Char('\t')` so panes need no special casing for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
}

/// A single key press with modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub mods: Mods,
}

impl KeyPress {
    pub fn plain(c: char) -> Self {
        Self {
            key: Key::Char(c),
            mods: Mods::empty(),
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            key: Key::Char(c),
            mods: Mods::CTRL,
        }
    }

    pub fn special(key: Key) -> Self {
        Self {
            key,
            mods: Mods::empty(),
        }
    }

    pub fn is_ctrl(&self) -> bool {
        self.mods.contains(Mods::CTRL)
    }

    pub fn is_alt(&self) -> bool {
        self.mods.contains(Mods::ALT)
    }

    /// The digit value of this key, if it is a plain `'0'..='9'`.
    pub fn digit(&self) -> Option<u32> {
        match self.key {
            Key::Char(c) if self.mods.is_empty() => c.to_digit(10),
            _ => None,
        }
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ctrl() {
            f.write_str("C-")?;
        }
        if self.is_alt() {
            f.write_str("M-")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{}", c.escape_debug()),
            ref other => write!(f, "<{:?}>", other),
        }
    }
}

/// Mouse event direction, following the press/release/move/step model of the
/// event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseDir {
    /// A button was pressed.
    Press,
    /// A button was released.
    Release,
    /// The pointer moved (a drag while a button is held).
    Move,
    /// A discrete step, e.g. one wheel notch.
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseInput {
    pub dir: MouseDir,
    pub button: MouseButton,
    pub x: u16,
    pub y: u16,
}

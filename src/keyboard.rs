//! Key and modifier state machine
//!
//! Taps act on release only, never on press, so dragging a finger across
//! the keyboard does not type. Shift, Alt and Ctrl are sticky locks: each
//! release of their key flips the lock and sends the matching press or
//! release to the OS, so the receiving application sees a held modifier.

use evdev::Key;
use tracing::debug;

use crate::layout::{KeyId, Layout, LayoutPage};

/// One synthesized key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn new(key: Key, pressed: bool) -> Self {
        Self { key, pressed }
    }
}

/// Sticky modifier locks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierLocks {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

/// What a release did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Released over nothing, or over a blank cell
    Nothing,
    /// Switched between letter and symbol pages
    PageToggled,
    /// Momentary key: press immediately followed by release
    Tap(Key),
    /// A lock changed; the modifier is now held (`pressed`) or let go
    ModifierToggled { key: Key, pressed: bool },
}

impl Outcome {
    /// Key transitions to hand to the synthesized keyboard
    pub fn events(&self) -> Vec<KeyEvent> {
        match *self {
            Outcome::Nothing | Outcome::PageToggled => Vec::new(),
            Outcome::Tap(key) => vec![KeyEvent::new(key, true), KeyEvent::new(key, false)],
            Outcome::ModifierToggled { key, pressed } => vec![KeyEvent::new(key, pressed)],
        }
    }
}

/// Everything that changes while the keyboard runs.
///
/// Owned by the dispatch loop and passed by reference; nothing here is global.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    /// Letters vs symbols
    pub symbol_page: bool,
    pub locks: ModifierLocks,
    /// Key under the finger right now, target of the next release
    pub pressed: Option<KeyId>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift drives both the emitted modifier and the displayed page
    pub fn shift_active(&self) -> bool {
        self.locks.shift
    }

    pub fn page(&self) -> LayoutPage {
        LayoutPage::select(self.shift_active(), self.symbol_page)
    }

    /// Finger is down: remember what is under it
    pub fn contact(&mut self, hit: Option<KeyId>) {
        self.pressed = hit;
    }

    /// Finger lifted: act on the last key under it, then forget it
    pub fn release(&mut self, layout: &Layout) -> Outcome {
        let Some(id) = self.pressed.take() else {
            return Outcome::Nothing;
        };
        let page = self.page();
        let outcome = if id == KeyId::PAGE_TOGGLE {
            self.symbol_page = !self.symbol_page;
            Outcome::PageToggled
        } else if id.row == KeyId::LETTER_ROW {
            self.tap(layout, page, id)
        } else if id == KeyId::SHIFT {
            self.locks.shift = !self.locks.shift;
            Outcome::ModifierToggled {
                key: Key::KEY_LEFTSHIFT,
                pressed: self.locks.shift,
            }
        } else if id == KeyId::ALT {
            self.locks.alt = !self.locks.alt;
            Outcome::ModifierToggled {
                key: Key::KEY_LEFTALT,
                pressed: self.locks.alt,
            }
        } else if id == KeyId::CTRL {
            self.locks.ctrl = !self.locks.ctrl;
            Outcome::ModifierToggled {
                key: Key::KEY_RIGHTCTRL,
                pressed: self.locks.ctrl,
            }
        } else {
            self.tap(layout, page, id)
        };
        debug!(row = id.row, index = id.index, ?page, ?outcome, "Key released");
        outcome
    }

    fn tap(&self, layout: &Layout, page: LayoutPage, id: KeyId) -> Outcome {
        match layout.cell(page, id).and_then(|cell| cell.key) {
            Some(key) => Outcome::Tap(key),
            None => Outcome::Nothing,
        }
    }

    /// Locks light up while engaged; everything else while touched
    pub fn is_highlighted(&self, id: KeyId) -> bool {
        match id {
            KeyId::SHIFT => self.locks.shift,
            KeyId::ALT => self.locks.alt,
            KeyId::CTRL => self.locks.ctrl,
            _ => self.pressed == Some(id),
        }
    }
}

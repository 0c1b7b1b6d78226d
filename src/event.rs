// (C) 2025 - Enzo Lombardi

//! Normalized input event model delivered by a [`crate::backend::InputBackend`].
//!
//! A normalized tagged-union event, independent of any one backend's wire
//! representation. The ANSI backend's conversion from
//! `crossterm::event::Event` lives here since it's pure data mapping, not
//! backend I/O.

use std::fmt;

/// Modifier keys held during a `Key` or `Mouse` event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const CTRL: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    pub const META: Modifiers = Modifiers(1 << 3);

    pub const fn empty() -> Self {
        Modifiers(0)
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Modifiers) -> Modifiers {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Modifiers::SHIFT) {
            names.push("SHIFT");
        }
        if self.contains(Modifiers::CTRL) {
            names.push("CTRL");
        }
        if self.contains(Modifiers::ALT) {
            names.push("ALT");
        }
        if self.contains(Modifiers::META) {
            names.push("META");
        }
        write!(f, "{}", names.join("|"))
    }
}

/// A logical key, independent of the wire encoding that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    F(u8), // 1..=24
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Backspace,
    Tab,
    BackTab,
    Enter,
    Escape,
    /// A control character with no dedicated variant above, e.g. Ctrl+A.
    Control(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Press,
    Release,
    Move,
    Drag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Suspend,
    Continue,
    Interrupt,
}

/// The normalized event union delivered by [`crate::terminal::Terminal::poll_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Key {
        code: KeyCode,
        modifiers: Modifiers,
        text: Option<String>,
    },
    Mouse {
        x: u16,
        y: u16,
        button: MouseButton,
        kind: MouseKind,
        modifiers: Modifiers,
    },
    Resize {
        cols: u16,
        rows: u16,
    },
    Paste {
        text: String,
    },
    Signal {
        kind: SignalKind,
    },
}

impl Event {
    pub fn key(code: KeyCode, modifiers: Modifiers) -> Self {
        Event::Key { code, modifiers, text: None }
    }

    pub fn printable(ch: char, modifiers: Modifiers) -> Self {
        Event::Key {
            code: KeyCode::Char(ch),
            modifiers,
            text: Some(ch.to_string()),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Key { code, modifiers, .. } => write!(f, "Key({code:?}, {modifiers:?})"),
            Event::Mouse { x, y, button, kind, .. } => {
                write!(f, "Mouse({button:?} {kind:?} at {x},{y})")
            }
            Event::Resize { cols, rows } => write!(f, "Resize({cols}x{rows})"),
            Event::Paste { text } => write!(f, "Paste({} bytes)", text.len()),
            Event::Signal { kind } => write!(f, "Signal({kind:?})"),
        }
    }
}

/// Converts a `crossterm` event into the core's normalized [`Event`], used by
/// [`crate::backend::ansi::AnsiBackend`]. Returns `None` for crossterm events
/// the core does not surface (e.g. key-release on platforms that report it).
pub fn from_crossterm(ev: crossterm::event::Event) -> Option<Event> {
    use crossterm::event::{
        Event as CtEvent, KeyCode as CtKeyCode, KeyEventKind, MouseButton as CtMouseButton,
        MouseEventKind as CtMouseKind,
    };

    match ev {
        CtEvent::Key(key) => {
            if key.kind == KeyEventKind::Release {
                return None;
            }
            let modifiers = modifiers_from_crossterm(key.modifiers);
            let (code, text) = match key.code {
                CtKeyCode::Char(c) => (KeyCode::Char(c), Some(c.to_string())),
                CtKeyCode::F(n) => (KeyCode::F(n), None),
                CtKeyCode::Up => (KeyCode::Up, None),
                CtKeyCode::Down => (KeyCode::Down, None),
                CtKeyCode::Left => (KeyCode::Left, None),
                CtKeyCode::Right => (KeyCode::Right, None),
                CtKeyCode::Home => (KeyCode::Home, None),
                CtKeyCode::End => (KeyCode::End, None),
                CtKeyCode::PageUp => (KeyCode::PageUp, None),
                CtKeyCode::PageDown => (KeyCode::PageDown, None),
                CtKeyCode::Insert => (KeyCode::Insert, None),
                CtKeyCode::Delete => (KeyCode::Delete, None),
                CtKeyCode::Backspace => (KeyCode::Backspace, None),
                CtKeyCode::Tab => (KeyCode::Tab, None),
                CtKeyCode::BackTab => (KeyCode::BackTab, None),
                CtKeyCode::Enter => (KeyCode::Enter, None),
                CtKeyCode::Esc => (KeyCode::Escape, None),
                _ => return None,
            };
            Some(Event::Key { code, modifiers, text })
        }
        CtEvent::Mouse(m) => {
            let modifiers = modifiers_from_crossterm(m.modifiers);
            let (button, kind) = match m.kind {
                CtMouseKind::Down(CtMouseButton::Left) => (MouseButton::Left, MouseKind::Press),
                CtMouseKind::Down(CtMouseButton::Middle) => (MouseButton::Middle, MouseKind::Press),
                CtMouseKind::Down(CtMouseButton::Right) => (MouseButton::Right, MouseKind::Press),
                CtMouseKind::Up(CtMouseButton::Left) => (MouseButton::Left, MouseKind::Release),
                CtMouseKind::Up(CtMouseButton::Middle) => (MouseButton::Middle, MouseKind::Release),
                CtMouseKind::Up(CtMouseButton::Right) => (MouseButton::Right, MouseKind::Release),
                CtMouseKind::Drag(CtMouseButton::Left) => (MouseButton::Left, MouseKind::Drag),
                CtMouseKind::Drag(CtMouseButton::Middle) => (MouseButton::Middle, MouseKind::Drag),
                CtMouseKind::Drag(CtMouseButton::Right) => (MouseButton::Right, MouseKind::Drag),
                CtMouseKind::Moved => (MouseButton::None, MouseKind::Move),
                CtMouseKind::ScrollUp => (MouseButton::WheelUp, MouseKind::Press),
                CtMouseKind::ScrollDown => (MouseButton::WheelDown, MouseKind::Press),
                _ => (MouseButton::None, MouseKind::Move),
            };
            Some(Event::Mouse { x: m.column, y: m.row, button, kind, modifiers })
        }
        CtEvent::Resize(cols, rows) => Some(Event::Resize { cols, rows }),
        CtEvent::Paste(text) => Some(Event::Paste { text }),
        _ => None,
    }
}

fn modifiers_from_crossterm(m: crossterm::event::KeyModifiers) -> Modifiers {
    use crossterm::event::KeyModifiers as CtMods;
    let mut out = Modifiers::empty();
    if m.contains(CtMods::SHIFT) {
        out |= Modifiers::SHIFT;
    }
    if m.contains(CtMods::CONTROL) {
        out |= Modifiers::CTRL;
    }
    if m.contains(CtMods::ALT) {
        out |= Modifiers::ALT;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_combine() {
        let m = Modifiers::SHIFT | Modifiers::CTRL;
        assert!(m.contains(Modifiers::SHIFT));
        assert!(m.contains(Modifiers::CTRL));
        assert!(!m.contains(Modifiers::ALT));
    }

    #[test]
    fn printable_carries_text() {
        let ev = Event::printable('q', Modifiers::empty());
        match ev {
            Event::Key { code, text, .. } => {
                assert_eq!(code, KeyCode::Char('q'));
                assert_eq!(text.as_deref(), Some("q"));
            }
            _ => panic!("expected Key"),
        }
    }

    #[test]
    fn crossterm_arrow_key_converts() {
        use crossterm::event::{Event as CtEvent, KeyCode as CtKeyCode, KeyEvent};
        let ev = CtEvent::Key(KeyEvent::from(CtKeyCode::Up));
        let mapped = from_crossterm(ev).unwrap();
        assert_eq!(mapped, Event::Key { code: KeyCode::Up, modifiers: Modifiers::empty(), text: None });
    }
}

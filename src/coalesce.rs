// (C) 2025 - Enzo Lombardi

//! `EventCoalescer`: merges adjacent compatible events within a small window.
//!
//! Sits between an `InputBackend` and its consumer. Only two kinds ever
//! merge: consecutive mouse moves with the same button/modifiers collapse to
//! the most recent, and consecutive resizes collapse to the last. Nothing
//! else is ever dropped — a key press between two mouse moves breaks the run
//! and both surrounding moves are delivered untouched.
//!
//! Grounded on this crate's input-handling loop, which buffered raw bytes and
//! periodically drained them; here the buffering is of normalized events
//! rather than bytes, with an explicit latency bound so a slow consumer never
//! sees mouse-move events lag arbitrarily far behind the pointer.

use crate::event::{Event, MouseKind};
use std::time::{Duration, Instant};

/// Default merge window: events queued less than this apart are candidates
/// for coalescing (≈16 ms, one frame at 60 Hz).
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(16);

struct Pending {
    event: Event,
    queued_at: Instant,
}

/// Coalesces a stream of events fed one at a time via [`EventCoalescer::push`].
/// The queue is unbounded except for mouse-move runs, which are collapsed to
/// a single pending entry — the one case this is allowed to drop intermediate
/// events for.
pub struct EventCoalescer {
    window: Duration,
    queue: Vec<Pending>,
}

impl EventCoalescer {
    pub fn new(window: Duration) -> Self {
        Self { window, queue: Vec::new() }
    }

    pub fn with_default_window() -> Self {
        Self::new(DEFAULT_COALESCE_WINDOW)
    }

    /// Feed one event, coalescing with the tail of the queue when eligible.
    pub fn push(&mut self, event: Event, now: Instant) {
        if let Some(last) = self.queue.last_mut() {
            if Self::mergeable(&last.event, &event) && now.saturating_duration_since(last.queued_at) < self.window {
                last.event = event;
                last.queued_at = now;
                return;
            }
        }
        self.queue.push(Pending { event, queued_at: now });
    }

    /// Pops the oldest queued event, if any.
    pub fn pop(&mut self) -> Option<Event> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0).event)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether `next` is allowed to replace `prev` in place rather than
    /// queuing separately: same coalescable class with matching identity
    /// fields (button/modifiers for mouse moves; resize has none to match).
    fn mergeable(prev: &Event, next: &Event) -> bool {
        match (prev, next) {
            (
                Event::Mouse { button: pb, kind: MouseKind::Move, modifiers: pm, .. },
                Event::Mouse { button: nb, kind: MouseKind::Move, modifiers: nm, .. },
            ) => pb == nb && pm == nm,
            (Event::Resize { .. }, Event::Resize { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Modifiers, MouseButton};

    fn mouse_move(x: u16, y: u16) -> Event {
        Event::Mouse { x, y, button: MouseButton::None, kind: MouseKind::Move, modifiers: Modifiers::empty() }
    }

    #[test]
    fn consecutive_moves_collapse_to_latest() {
        let mut c = EventCoalescer::new(Duration::from_millis(16));
        let t0 = Instant::now();
        c.push(mouse_move(1, 1), t0);
        c.push(mouse_move(2, 2), t0 + Duration::from_millis(1));
        c.push(mouse_move(3, 3), t0 + Duration::from_millis(2));
        assert_eq!(c.len(), 1);
        assert_eq!(c.pop(), Some(mouse_move(3, 3)));
    }

    #[test]
    fn moves_outside_window_do_not_merge() {
        let mut c = EventCoalescer::new(Duration::from_millis(16));
        let t0 = Instant::now();
        c.push(mouse_move(1, 1), t0);
        c.push(mouse_move(2, 2), t0 + Duration::from_millis(50));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn resize_events_collapse() {
        let mut c = EventCoalescer::new(Duration::from_millis(16));
        let t0 = Instant::now();
        c.push(Event::Resize { cols: 80, rows: 24 }, t0);
        c.push(Event::Resize { cols: 100, rows: 30 }, t0 + Duration::from_millis(1));
        assert_eq!(c.len(), 1);
        assert_eq!(c.pop(), Some(Event::Resize { cols: 100, rows: 30 }));
    }

    #[test]
    fn key_event_breaks_a_move_run() {
        let mut c = EventCoalescer::new(Duration::from_millis(16));
        let t0 = Instant::now();
        c.push(mouse_move(1, 1), t0);
        c.push(
            Event::key(crate::event::KeyCode::Enter, Modifiers::empty()),
            t0 + Duration::from_millis(1),
        );
        c.push(mouse_move(2, 2), t0 + Duration::from_millis(2));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn different_buttons_do_not_merge() {
        let mut c = EventCoalescer::new(Duration::from_millis(16));
        let t0 = Instant::now();
        c.push(
            Event::Mouse { x: 1, y: 1, button: MouseButton::Left, kind: MouseKind::Drag, modifiers: Modifiers::empty() },
            t0,
        );
        c.push(
            Event::Mouse { x: 2, y: 2, button: MouseButton::Right, kind: MouseKind::Drag, modifiers: Modifiers::empty() },
            t0 + Duration::from_millis(1),
        );
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn fifo_order_preserved_for_non_coalesced_events() {
        let mut c = EventCoalescer::new(Duration::from_millis(16));
        let t0 = Instant::now();
        c.push(Event::key(crate::event::KeyCode::Tab, Modifiers::empty()), t0);
        c.push(Event::key(crate::event::KeyCode::Enter, Modifiers::empty()), t0);
        assert_eq!(c.pop().unwrap(), Event::key(crate::event::KeyCode::Tab, Modifiers::empty()));
        assert_eq!(c.pop().unwrap(), Event::key(crate::event::KeyCode::Enter, Modifiers::empty()));
    }
}

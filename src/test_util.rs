// (C) 2025 - Enzo Lombardi

//! Test utilities for applications built on this crate.
//!
//! Available only when the `test-util` feature is enabled. [`MockTerminal`]
//! wraps a [`DisplayBuffer`] directly for assertions on cell content without
//! a real terminal; [`MockBackend`]/[`MockInputBackend`] are scriptable
//! [`DisplayBackend`]/[`InputBackend`] implementations for exercising code
//! written against those traits.

use std::collections::VecDeque;
use std::time::Duration;

use crate::attr::Attr;
use crate::backend::{DisplayBackend, InputBackend};
use crate::buffer::DisplayBuffer;
use crate::capability::Capabilities;
use crate::cell::ScreenCell;
use crate::error::Result;
use crate::event::Event;

/// A mock terminal for testing rendering logic without a real backend.
///
/// ```
/// use termio_core::test_util::MockTerminal;
/// use termio_core::attr::{Attr, Color};
///
/// let mut terminal = MockTerminal::new(80, 25);
/// terminal.put_char(0, 0, "H", Attr::new(Color::WHITE, Color::BLUE));
/// assert_eq!(terminal.get_text(0, 0), Some("H".to_string()));
/// ```
pub struct MockTerminal {
    buffer: DisplayBuffer,
    cursor: Option<(u16, u16)>,
    cursor_visible: bool,
    events: VecDeque<Event>,
}

impl MockTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self { buffer: DisplayBuffer::new(width, height), cursor: None, cursor_visible: false, events: VecDeque::new() }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.buffer.width(), self.buffer.height())
    }

    pub fn put_char(&mut self, x: i32, y: i32, cluster: &str, attr: Attr) {
        self.buffer.put_char(x, y, cluster, attr);
    }

    pub fn put_text(&mut self, x: i32, y: i32, text: &str, attr: Attr) {
        self.buffer.put_text(x, y, text, attr);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, cluster: &str, attr: Attr) {
        self.buffer.fill_rect(x, y, w, h, cluster, attr);
    }

    /// Reads back the grapheme cluster at `(x, y)` from the back buffer
    /// (the pending frame, not yet "flushed" to a terminal).
    pub fn get_text(&self, x: u16, y: u16) -> Option<String> {
        if x >= self.buffer.width() || y >= self.buffer.height() {
            return None;
        }
        Some(self.buffer.back_cell(x, y).text().to_string())
    }

    pub fn get_cell(&self, x: u16, y: u16) -> Option<ScreenCell> {
        if x >= self.buffer.width() || y >= self.buffer.height() {
            return None;
        }
        Some(self.buffer.back_cell(x, y))
    }

    /// Returns one row's text, ignoring trailing-marker cells of wide pairs.
    pub fn get_row(&self, y: u16) -> Option<String> {
        if y >= self.buffer.height() {
            return None;
        }
        Some(
            self.buffer
                .back_row(y)
                .iter()
                .filter(|cell| !cell.is_trailing_marker())
                .map(ScreenCell::text)
                .collect(),
        )
    }

    pub fn set_cursor(&mut self, x: u16, y: u16) {
        self.cursor = Some((x, y));
    }

    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    pub fn show_cursor(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn buffer_mut(&mut self) -> &mut DisplayBuffer {
        &mut self.buffer
    }

    /// Queues an event for [`Self::poll_event`] to return later, to simulate
    /// input without a real backend.
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn poll_event(&mut self, _deadline: Duration) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

/// A scriptable [`DisplayBackend`] that records calls instead of touching a
/// real terminal. Set `fail_next_flush` to exercise
/// [`crate::recovery::ErrorRecovery`] retry/escalation paths.
#[derive(Default)]
pub struct MockBackend {
    pub init_calls: u32,
    pub flush_calls: u32,
    pub shutdown_calls: u32,
    pub last_capabilities: Option<Capabilities>,
    pub size: (u16, u16),
    pub fail_next_flush: bool,
}

impl MockBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self { size: (width, height), ..Self::default() }
    }
}

impl DisplayBackend for MockBackend {
    fn init(&mut self, capabilities: &Capabilities) -> Result<()> {
        self.init_calls += 1;
        self.last_capabilities = Some(capabilities.clone());
        Ok(())
    }

    fn flush(&mut self, buffer: &mut DisplayBuffer) -> Result<()> {
        if self.fail_next_flush {
            self.fail_next_flush = false;
            return Err(crate::error::Error::transient_io(std::io::Error::from(std::io::ErrorKind::Interrupted)));
        }
        self.flush_calls += 1;
        for (y, &(s, e)) in buffer.damage_snapshot().iter().enumerate() {
            if s < e {
                buffer.commit_run(y as u16, s, e);
            }
        }
        Ok(())
    }

    fn set_cursor(&mut self, _x: u16, _y: u16, _visible: bool) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.shutdown_calls += 1;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(self.size)
    }
}

/// A scriptable [`InputBackend`] backed by a pre-loaded event queue.
#[derive(Default)]
pub struct MockInputBackend {
    queue: VecDeque<Event>,
}

impl MockInputBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self { queue: events.into_iter().collect() }
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }
}

impl InputBackend for MockInputBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn poll(&mut self, _deadline: Duration) -> Result<Option<Event>> {
        Ok(self.queue.pop_front())
    }

    fn peek(&self) -> bool {
        !self.queue.is_empty()
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

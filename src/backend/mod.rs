// (C) 2025 - Enzo Lombardi

//! Backend traits for terminal I/O abstraction.
//!
//! Splits the single `Backend` trait this crate previously used into the two
//! contracts the core actually has: output (`DisplayBackend`, reconciling a
//! [`crate::buffer::DisplayBuffer`] against the terminal) and input
//! (`InputBackend`, feeding raw bytes to an [`crate::parser::EscapeParser`]
//! and surfacing normalized events). A `PlatformFactory` wires a pair of
//! them, sharing one [`crate::cleanup::TerminalCleanup`] scope, per variant:
//! ANSI (crossterm, cross-platform), termios-raw (Unix, direct fd I/O), and
//! curses-fallback (conservative, minimal-capability).

pub mod ansi;
pub mod curses_fallback;
pub mod factory;
pub mod termios_raw;

use crate::buffer::DisplayBuffer;
use crate::capability::Capabilities;
use crate::error::Result;
use crate::event::Event;
use std::time::Duration;

/// Realizes the output contract against a real terminal: reconciles a
/// double-buffered grid's damage into the minimal escape-sequence stream.
pub trait DisplayBackend: Send {
    /// Enters alternate screen/raw mode as capabilities allow, registers
    /// undo actions with the shared cleanup scope, and clears the screen.
    fn init(&mut self, capabilities: &Capabilities) -> Result<()>;

    /// Reconciles `buffer`'s `back` grid into the terminal and into `front`.
    fn flush(&mut self, buffer: &mut DisplayBuffer) -> Result<()>;

    fn set_cursor(&mut self, x: u16, y: u16, visible: bool) -> Result<()>;

    /// Idempotent inverse of `init`.
    fn shutdown(&mut self) -> Result<()>;

    fn size(&self) -> Result<(u16, u16)>;

    fn suspend(&mut self) -> Result<()> {
        self.shutdown()
    }

    fn resume(&mut self, capabilities: &Capabilities) -> Result<()> {
        self.init(capabilities)
    }

    fn bell(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Realizes the input contract: feeds raw bytes to an `EscapeParser` and
/// surfaces the normalized, coalesced events.
pub trait InputBackend: Send {
    fn init(&mut self) -> Result<()>;

    /// Waits up to `deadline` for the next event. `Ok(None)` on timeout.
    fn poll(&mut self, deadline: Duration) -> Result<Option<Event>>;

    /// Whether an event is already queued without blocking.
    fn peek(&self) -> bool;

    fn shutdown(&mut self) -> Result<()>;
}

// (C) 2025 - Enzo Lombardi

//! `CursesFallbackBackend`: the conservative, minimum-capability backend.
//!
//! Selected when [`crate::capability::CapabilityProbe`] can't confirm
//! anything beyond a bare ANSI terminal — no alternate screen, no mouse, no
//! bracketed paste, and color clamped to 16 entries regardless of what the
//! negotiated [`crate::capability::Capabilities`] says, the way a curses
//! `COLORS == 8`/`has_colors() == FALSE` terminal forces a caller down to a
//! handful of color pairs (see `yacurses`'s `ColorPair`/`ColorID` model in
//! the retrieval pack). Raw mode and polling still go through `crossterm`
//! since it's already the crate's cross-platform dependency for that; what's
//! disabled here is everything `crossterm` would otherwise *negotiate on*.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{cursor, execute, terminal};

use super::{DisplayBackend, InputBackend};
use crate::attr::{Attr, ColorDepth};
use crate::buffer::DisplayBuffer;
use crate::capability::Capabilities;
use crate::cleanup::{TerminalCleanup, UndoAction};
use crate::error::{Error, Result};
use crate::event::{from_crossterm, Event};

pub struct CursesFallbackBackend {
    cleanup: TerminalCleanup,
    last_attr: Option<Attr>,
    initialized: bool,
}

impl CursesFallbackBackend {
    pub fn new() -> Self {
        Self { cleanup: TerminalCleanup::new(), last_attr: None, initialized: false }
    }
}

impl Default for CursesFallbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for CursesFallbackBackend {
    fn init(&mut self, _capabilities: &Capabilities) -> Result<()> {
        terminal::enable_raw_mode().map_err(|e| Error::terminal_init(e.to_string()))?;
        self.cleanup.register(UndoAction::ResetSgr);
        TerminalCleanup::install_handlers();

        let mut out = io::stdout();
        execute!(out, cursor::Hide)?;
        self.cleanup.register(UndoAction::ShowCursor);
        out.write_all(b"\x1b[2J\x1b[H")?;
        out.flush()?;

        self.last_attr = None;
        self.initialized = true;
        Ok(())
    }

    fn flush(&mut self, buffer: &mut DisplayBuffer) -> Result<()> {
        if !buffer.fps_limiter().should_flush(Instant::now()) {
            return Ok(());
        }
        let snapshot = buffer.damage_snapshot();

        let mut out = Vec::new();
        for (y, &(s, e)) in snapshot.iter().enumerate() {
            let y = y as u16;
            if s >= e {
                continue;
            }
            out.extend(format!("\x1b[{};{}H", y + 1, s + 1).into_bytes());
            for x in s..e {
                let cell = buffer.back_row(y)[x as usize];
                if cell.is_trailing_marker() {
                    continue;
                }
                let attr = Attr {
                    fg: cell.attr.fg.downgrade_to(ColorDepth::Indexed16),
                    bg: cell.attr.bg.downgrade_to(ColorDepth::Indexed16),
                    style: cell.attr.style,
                };
                if self.last_attr != Some(attr) {
                    out.push(0x1B);
                    out.push(b'[');
                    out.extend(attr.to_sgr(ColorDepth::Indexed16).into_bytes());
                    out.push(b'm');
                    self.last_attr = Some(attr);
                }
                out.extend_from_slice(cell.text().as_bytes());
            }
            buffer.commit_run(y, s, e);
        }

        if !out.is_empty() {
            let mut stdout = io::stdout();
            stdout.write_all(&out)?;
            stdout.flush()?;
        }
        buffer.fps_limiter_mut().record_flush(Instant::now());
        Ok(())
    }

    fn set_cursor(&mut self, x: u16, y: u16, visible: bool) -> Result<()> {
        let mut out = io::stdout();
        if visible {
            execute!(out, cursor::MoveTo(x, y), cursor::Show)?;
        } else {
            execute!(out, cursor::Hide)?;
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.cleanup.shutdown();
        terminal::disable_raw_mode().map_err(|e| Error::terminal_init(e.to_string()))?;
        self.initialized = false;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        terminal::size().map_err(Error::from)
    }
}

/// Input half: same `crossterm` event source as [`super::ansi::AnsiInputBackend`]
/// but without mouse capture ever enabled, so no mouse events are generated
/// regardless of what the terminal reports.
pub struct CursesFallbackInputBackend;

impl CursesFallbackInputBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CursesFallbackInputBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for CursesFallbackInputBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn poll(&mut self, deadline: Duration) -> Result<Option<Event>> {
        if crossterm::event::poll(deadline)? {
            let ev = crossterm::event::read()?;
            if matches!(ev, crossterm::event::Event::Mouse(_)) {
                return Ok(None);
            }
            return Ok(from_crossterm(ev));
        }
        Ok(None)
    }

    fn peek(&self) -> bool {
        false
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

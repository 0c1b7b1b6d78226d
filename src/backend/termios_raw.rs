// (C) 2025 - Enzo Lombardi

//! `TermiosRawBackend`: direct-fd Unix backend, no `crossterm` in the loop.
//!
//! Opens `/dev/tty` directly and puts it in raw mode with `nix`'s `termios`
//! bindings, the way `rustty`'s `Terminal::new` does. Unlike [`super::ansi`],
//! this backend owns the byte stream end to end: output is written straight
//! to the fd, and input bytes are read off it and fed through
//! [`crate::parser::EscapeParser`] rather than handed to a library event
//! reader. A `SIGWINCH` handler mirrors `rustty`'s approach (`rustty` sets a
//! bare flag rather than synthesizing an event in-handler, since signal
//! handlers can't safely allocate or push through a queue) and `poll`
//! synthesizes the `Resize` event on the next call after the flag trips.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{self, LocalFlags, SetArg};

use super::{DisplayBackend, InputBackend};
use crate::attr::Attr;
use crate::buffer::DisplayBuffer;
use crate::capability::Capabilities;
use crate::cleanup::{TerminalCleanup, UndoAction};
use crate::cursor::CursorPathfinder;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::parser::EscapeParser;

static WINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn winch_handler(_: i32) {
    WINCH_RECEIVED.store(true, Ordering::SeqCst);
}

fn install_winch_handler() -> Result<()> {
    let action = SigAction::new(SigHandler::Handler(winch_handler), SaFlags::empty(), SigSet::empty());
    // SAFETY: `winch_handler` only performs an atomic store, which is async-signal-safe.
    unsafe { signal::sigaction(Signal::SIGWINCH, &action) }
        .map_err(|e| Error::terminal_init(format!("sigaction(SIGWINCH) failed: {e}")))?;
    Ok(())
}

pub struct TermiosRawBackend {
    tty: Option<File>,
    capabilities: Capabilities,
    cleanup: TerminalCleanup,
    last_attr: Option<Attr>,
    cursor_pos: Option<(u16, u16)>,
    initialized: bool,
}

impl TermiosRawBackend {
    pub fn new() -> Self {
        Self {
            tty: None,
            capabilities: Capabilities::default(),
            cleanup: TerminalCleanup::new(),
            last_attr: None,
            cursor_pos: None,
            initialized: false,
        }
    }

    fn tty(&mut self) -> Result<&mut File> {
        self.tty.as_mut().ok_or_else(|| Error::not_a_terminal())
    }
}

impl Default for TermiosRawBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for TermiosRawBackend {
    fn init(&mut self, capabilities: &Capabilities) -> Result<()> {
        self.capabilities = capabilities.clone();

        let tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;

        let orig = termios::tcgetattr(tty.as_fd()).map_err(|e| Error::terminal_init(e.to_string()))?;
        self.cleanup.save_termios(orig.clone());

        let mut raw = orig;
        termios::cfmakeraw(&mut raw);
        raw.local_flags.remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG);
        termios::tcsetattr(tty.as_fd(), SetArg::TCSANOW, &raw)
            .map_err(|e| Error::terminal_init(e.to_string()))?;

        let mut tty = tty;
        tty.write_all(b"\x1b[?1049h\x1b[?25l")?;
        self.cleanup.register(UndoAction::LeaveAlternateScreen);
        self.cleanup.register(UndoAction::ShowCursor);
        self.cleanup.register(UndoAction::ResetSgr);

        if capabilities.mouse != crate::capability::MouseSupport::None {
            tty.write_all(b"\x1b[?1000h\x1b[?1006h")?;
            self.cleanup.register(UndoAction::DisableMouse);
        }
        if capabilities.bracketed_paste {
            tty.write_all(b"\x1b[?2004h")?;
            self.cleanup.register(UndoAction::DisableBracketedPaste);
        }

        install_winch_handler()?;
        TerminalCleanup::install_handlers();

        tty.write_all(b"\x1b[2J\x1b[H")?;
        tty.flush()?;

        self.tty = Some(tty);
        self.last_attr = None;
        self.cursor_pos = None;
        self.initialized = true;
        Ok(())
    }

    fn flush(&mut self, buffer: &mut DisplayBuffer) -> Result<()> {
        if !buffer.fps_limiter().should_flush(Instant::now()) {
            return Ok(());
        }
        let snapshot = buffer.damage_snapshot();

        let depth = self.capabilities.color_depth;
        let mut out = Vec::new();
        for (y, &(s, e)) in snapshot.iter().enumerate() {
            let y = y as u16;
            if s >= e {
                continue;
            }
            let front = buffer.front_row(y).to_vec();
            let back = buffer.back_row(y).to_vec();
            let diffs: Vec<u16> = (s..e).filter(|&x| back[x as usize] != front[x as usize]).collect();
            for (run_start, run_end) in merge_runs(&diffs) {
                for x in run_start..run_end {
                    let cell = back[x as usize];
                    if cell.is_trailing_marker() {
                        continue;
                    }
                    if self.last_attr != Some(cell.attr) {
                        out.push(0x1B);
                        out.push(b'[');
                        out.extend(cell.attr.to_sgr(depth).into_bytes());
                        out.push(b'm');
                        self.last_attr = Some(cell.attr);
                    }
                    let mv = match self.cursor_pos {
                        None => crate::cursor::CursorMove::Absolute { x, y },
                        Some(from) => {
                            let row_between = CursorPathfinder::clean_span(&front, &back, self.last_attr.unwrap_or_default());
                            CursorPathfinder::path(from, (x, y), self.last_attr.unwrap_or_default(), row_between)
                        }
                    };
                    out.extend(CursorPathfinder::render(mv, self.last_attr.unwrap_or_default()));
                    out.extend_from_slice(cell.text().as_bytes());
                    self.cursor_pos = Some((x + cell.width().max(1) as u16, y));
                }
                buffer.commit_run(y, run_start, run_end);
            }
        }

        if !out.is_empty() {
            let tty = self.tty()?;
            tty.write_all(&out)?;
            tty.flush()?;
        }
        buffer.fps_limiter_mut().record_flush(Instant::now());
        Ok(())
    }

    fn set_cursor(&mut self, x: u16, y: u16, visible: bool) -> Result<()> {
        let seq = if visible {
            format!("\x1b[{};{}H\x1b[?25h", y + 1, x + 1)
        } else {
            "\x1b[?25l".to_string()
        };
        self.tty()?.write_all(seq.as_bytes())?;
        self.cursor_pos = Some((x, y));
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.cleanup.shutdown();
        self.tty = None;
        self.initialized = false;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        crossterm_size_fallback()
    }
}

/// `nix` 0.29 has no safe `TIOCGWINSZ` wrapper without pulling in `libc`
/// directly, so size queries reuse `crossterm`'s (already a dependency for
/// [`super::ansi`]) — it only reads, it doesn't touch raw-mode state.
fn crossterm_size_fallback() -> Result<(u16, u16)> {
    crossterm::terminal::size().map_err(Error::from)
}

fn merge_runs(diffs: &[u16]) -> Vec<(u16, u16)> {
    const GAP_ABSORPTION_THRESHOLD: u16 = 6;
    let mut runs = Vec::new();
    let mut iter = diffs.iter().copied();
    if let Some(first) = iter.next() {
        let mut start = first;
        let mut end = first + 1;
        for x in iter {
            if x - end <= GAP_ABSORPTION_THRESHOLD {
                end = x + 1;
            } else {
                runs.push((start, end));
                start = x;
                end = x + 1;
            }
        }
        runs.push((start, end));
    }
    runs
}

pub struct TermiosRawInputBackend {
    tty: Option<File>,
    parser: EscapeParser,
    coalescer: crate::coalesce::EventCoalescer,
    winch_pending: bool,
}

impl TermiosRawInputBackend {
    pub fn new() -> Self {
        Self {
            tty: None,
            parser: EscapeParser::new(Duration::from_millis(50)),
            coalescer: crate::coalesce::EventCoalescer::with_default_window(),
            winch_pending: false,
        }
    }
}

impl Default for TermiosRawInputBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for TermiosRawInputBackend {
    fn init(&mut self) -> Result<()> {
        self.tty = Some(OpenOptions::new().read(true).write(true).open("/dev/tty")?);
        Ok(())
    }

    fn poll(&mut self, deadline: Duration) -> Result<Option<Event>> {
        if let Some(ev) = self.coalescer.pop() {
            return Ok(Some(ev));
        }

        if WINCH_RECEIVED.swap(false, Ordering::SeqCst) {
            self.winch_pending = true;
        }
        if self.winch_pending {
            self.winch_pending = false;
            let (cols, rows) = crossterm_size_fallback()?;
            return Ok(Some(Event::Resize { cols, rows }));
        }

        let tty = self.tty.as_ref().ok_or_else(Error::not_a_terminal)?;
        let fd = tty.as_raw_fd();
        let mut pollfd = [PollFd::new(
            // SAFETY: `fd` is owned by `self.tty` and outlives this poll call.
            unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) },
            PollFlags::POLLIN,
        )];
        let timeout = PollTimeout::try_from(deadline.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(PollTimeout::MAX);
        let n = poll(&mut pollfd, timeout)
            .map_err(|errno| Error::from(io::Error::from_raw_os_error(errno as i32)))?;

        if WINCH_RECEIVED.swap(false, Ordering::SeqCst) {
            self.winch_pending = true;
        }

        if n > 0 {
            let mut buf = [0u8; 256];
            let read = self.tty.as_mut().ok_or_else(Error::not_a_terminal)?.read(&mut buf)?;
            let now = Instant::now();
            for &byte in &buf[..read] {
                for ev in self.parser.feed(byte, now) {
                    self.coalescer.push(ev, now);
                }
            }
        } else if let Some(ev) = self.parser.check_timeout(Instant::now()) {
            self.coalescer.push(ev, Instant::now());
        }

        Ok(self.coalescer.pop())
    }

    fn peek(&self) -> bool {
        !self.coalescer.is_empty() || WINCH_RECEIVED.load(Ordering::SeqCst) || self.winch_pending
    }

    fn shutdown(&mut self) -> Result<()> {
        self.tty = None;
        Ok(())
    }
}

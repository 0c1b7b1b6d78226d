// (C) 2025 - Enzo Lombardi

//! `TerminalCleanup`: guaranteed restoration of terminal modes.
//!
//! Registers a LIFO stack of undo actions as a backend's `init()` enables raw
//! mode, alternate screen, mouse, and bracketed paste. The stack runs on
//! normal shutdown, on an uncaught panic (via a panic hook), and on the
//! fatal signals `SIGINT`/`SIGTERM`/`SIGHUP`/`SIGQUIT` (via a signal
//! handler). A single atomic flag makes all three paths idempotent: whichever
//! gets there first drains the stack, the rest are no-ops — this is what
//! makes re-entry from a signal handler after a partially-run shutdown safe.
//!
//! Grounded on the rustty `Terminal`'s `Drop`-based termios restore plus its
//! `SIGWINCH_STATUS`-style atomic-flag pattern for signal delivery, and on
//! this crate's own prior `Terminal::shutdown`/`Drop` pair — generalized here
//! from a single Drop impl into a LIFO action stack shared with signal and
//! panic paths, since a lone Drop impl only guarantees cleanup on the happy
//! path.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One reversible terminal-mode change, undone in LIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoAction {
    RestoreTermios,
    LeaveAlternateScreen,
    ShowCursor,
    ResetSgr,
    DisableMouse,
    DisableBracketedPaste,
    DisableFocusEvents,
}

impl UndoAction {
    /// Raw bytes to write to restore this mode, or `None` for
    /// `RestoreTermios`, which is handled out-of-band via the saved termios
    /// struct rather than an escape sequence.
    fn bytes(self) -> Option<&'static [u8]> {
        match self {
            UndoAction::RestoreTermios => None,
            UndoAction::LeaveAlternateScreen => Some(b"\x1b[?1049l"),
            UndoAction::ShowCursor => Some(b"\x1b[?25h"),
            UndoAction::ResetSgr => Some(b"\x1b[0m"),
            UndoAction::DisableMouse => Some(b"\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l"),
            UndoAction::DisableBracketedPaste => Some(b"\x1b[?2004l"),
            UndoAction::DisableFocusEvents => Some(b"\x1b[?1004l"),
        }
    }
}

static CLEANUP_DONE: AtomicBool = AtomicBool::new(false);
static GLOBAL_STACK: Mutex<Vec<UndoAction>> = Mutex::new(Vec::new());
static HANDLERS_INSTALLED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<nix::sys::termios::Termios>> = Mutex::new(None);

/// Owned by a `Backend`; registers undo actions as it enables terminal
/// modes and runs them exactly once.
#[derive(Debug, Default)]
pub struct TerminalCleanup {
    local_stack: Vec<UndoAction>,
}

impl TerminalCleanup {
    pub fn new() -> Self {
        CLEANUP_DONE.store(false, Ordering::SeqCst);
        Self { local_stack: Vec::new() }
    }

    /// Push an undo action onto this scope's stack, mirroring it into the
    /// process-global stack the signal handler and panic hook read from.
    pub fn register(&mut self, action: UndoAction) {
        self.local_stack.push(action);
        if let Ok(mut g) = GLOBAL_STACK.lock() {
            g.push(action);
        }
    }

    #[cfg(unix)]
    pub fn save_termios(&mut self, termios: nix::sys::termios::Termios) {
        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = Some(termios);
        }
        self.register(UndoAction::RestoreTermios);
    }

    /// Install the panic hook and fatal-signal handlers. Idempotent; safe to
    /// call from every backend's `init()`, only the first call takes effect.
    pub fn install_handlers() {
        if HANDLERS_INSTALLED.swap(true, Ordering::SeqCst) {
            return;
        }

        let previous_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            log::error!("panicking, restoring terminal modes before unwinding: {info}");
            run_cleanup();
            previous_hook(info);
        }));

        #[cfg(unix)]
        install_signal_handlers();

        log::debug!("cleanup panic hook and signal handlers installed");
    }

    /// Drain this scope's undo stack in LIFO order. A no-op if cleanup has
    /// already run via a signal handler or panic hook.
    pub fn shutdown(&mut self) {
        if CLEANUP_DONE.swap(true, Ordering::SeqCst) {
            self.local_stack.clear();
            if let Ok(mut g) = GLOBAL_STACK.lock() {
                g.clear();
            }
            return;
        }
        run_undo_stack(&mut self.local_stack);
        if let Ok(mut g) = GLOBAL_STACK.lock() {
            g.clear();
        }
    }

    pub fn is_done(&self) -> bool {
        CLEANUP_DONE.load(Ordering::SeqCst)
    }
}

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_undo_stack(stack: &mut Vec<UndoAction>) {
    let mut out = std::io::stdout();
    while let Some(action) = stack.pop() {
        match action {
            UndoAction::RestoreTermios => {
                #[cfg(unix)]
                restore_termios();
            }
            _ => {
                if let Some(bytes) = action.bytes() {
                    let _ = out.write_all(bytes);
                }
            }
        }
    }
    let _ = out.flush();
}

#[cfg(unix)]
fn restore_termios() {
    use nix::sys::termios;
    use std::os::fd::AsFd;
    if let Ok(guard) = SAVED_TERMIOS.lock() {
        if let Some(ref termios) = *guard {
            let stdin = std::io::stdin();
            let _ = termios::tcsetattr(stdin.as_fd(), termios::SetArg::TCSANOW, termios);
        }
    }
}

/// Called from the panic hook and the signal handler. Runs the process-wide
/// mirror of every live `TerminalCleanup` scope's undo stack; guarded by the
/// same flag `shutdown()` uses so it fires exactly once across all three paths.
fn run_cleanup() {
    if CLEANUP_DONE.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Ok(mut g) = GLOBAL_STACK.lock() {
        run_undo_stack(&mut g);
    }
}

#[cfg(unix)]
extern "C" fn handle_fatal_signal(signum: std::ffi::c_int) {
    log::warn!("fatal signal {signum} received, restoring terminal modes");
    run_cleanup();
    // Re-raise with the default disposition so the process exits with the
    // conventional 128+signum status instead of silently swallowing it.
    // SAFETY: `libc_reraise_default` only calls `sigaction`/`raise`, both
    // async-signal-safe, and is only ever reached from a signal handler.
    unsafe {
        libc_reraise_default(signum);
    }
}

#[cfg(unix)]
unsafe fn libc_reraise_default(signum: std::ffi::c_int) {
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
    if let Ok(sig) = Signal::try_from(signum) {
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        // SAFETY: `sigaction`/`raise` are async-signal-safe; no heap access.
        unsafe {
            let _ = signal::sigaction(sig, &default);
            let _ = signal::raise(sig);
        }
    }
}

#[cfg(unix)]
fn install_signal_handlers() {
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
    let action = SigAction::new(
        SigHandler::Handler(handle_fatal_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGQUIT] {
        // SAFETY: `handle_fatal_signal` only performs atomic stores and a
        // mutex-guarded undo-stack drain, both async-signal-safe.
        unsafe {
            let _ = signal::sigaction(sig, &action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_runs_actions_in_lifo_order() {
        let mut cleanup = TerminalCleanup::new();
        cleanup.register(UndoAction::DisableMouse);
        cleanup.register(UndoAction::LeaveAlternateScreen);
        cleanup.register(UndoAction::ShowCursor);
        cleanup.shutdown();
        assert!(cleanup.is_done());
        assert!(cleanup.local_stack.is_empty());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut cleanup = TerminalCleanup::new();
        cleanup.register(UndoAction::ResetSgr);
        cleanup.shutdown();
        cleanup.shutdown(); // must not panic or double-run
        assert!(cleanup.is_done());
    }
}

//! `TerminalCleanup`'s guarantee: the undo stack runs exactly once per
//! lifetime, whether triggered by an explicit `shutdown()` call or by the
//! value simply going out of scope.

use termio_core::cleanup::{TerminalCleanup, UndoAction};

#[test]
fn explicit_shutdown_marks_done_and_drains_the_stack() {
    let mut cleanup = TerminalCleanup::new();
    cleanup.register(UndoAction::DisableMouse);
    cleanup.register(UndoAction::LeaveAlternateScreen);
    cleanup.register(UndoAction::ShowCursor);
    cleanup.register(UndoAction::ResetSgr);
    cleanup.shutdown();
    assert!(cleanup.is_done());
}

#[test]
fn dropping_without_an_explicit_shutdown_still_runs_cleanup() {
    {
        let mut cleanup = TerminalCleanup::new();
        cleanup.register(UndoAction::DisableBracketedPaste);
        // Falls out of scope here without calling shutdown() — Drop must
        // still run the undo stack exactly once.
    }
    // A fresh scope resets the process-wide "done" flag, confirming the
    // prior scope didn't leave it in some half-run state that would wedge
    // every later `TerminalCleanup` instance.
    let cleanup = TerminalCleanup::new();
    assert!(!cleanup.is_done());
}

#[test]
fn repeated_shutdown_calls_never_panic() {
    let mut cleanup = TerminalCleanup::new();
    cleanup.register(UndoAction::ResetSgr);
    cleanup.shutdown();
    cleanup.shutdown();
    cleanup.shutdown();
    assert!(cleanup.is_done());
}

// (C) 2025 - Enzo Lombardi

//! Error types for the terminal I/O core.
//!
//! This module provides the main error type used throughout the crate, with
//! backtrace capture and a taxonomy that lets callers and [`crate::recovery`]
//! distinguish transient failures from fatal ones.

use std::backtrace::Backtrace;
use std::fmt::{Display, Formatter};

/// Error type for terminal I/O core operations.
///
/// Wraps an [`ErrorKind`] with a captured backtrace for debugging.
///
/// ```rust,no_run
/// use termio_core::error::Result;
///
/// fn init_terminal() -> Result<()> {
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    backtrace: Backtrace,
}

/// The specific kind of error that occurred.
///
/// This taxonomy matches the propagation rules used by [`crate::recovery::ErrorRecovery`]:
/// `TransientIo` is retried, `CapabilityMissing` triggers a silent downgrade,
/// `FatalIo` escalates to the next backend in the fallback chain, and the rest
/// are reported directly to the caller.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// stdin or stdout is not a TTY; a backend that requires raw mode refuses to init.
    NotATerminal,

    /// A requested capability (e.g. rgb24) is unsupported; the core downgraded silently.
    CapabilityMissing(String),

    /// Short write, `EINTR`, or `EAGAIN`; safe to retry.
    TransientIo(std::io::Error),

    /// Unrecoverable read/write failure; the backend has shut down.
    FatalIo(std::io::Error),

    /// A malformed or over-long escape sequence was discarded.
    ParseOverflow(String),

    /// Requested `(cols, rows)` was zero or exceeded implementation bounds.
    ResizeOutOfRange { cols: u32, rows: u32 },

    /// Generic I/O failure not otherwise classified.
    Io(std::io::Error),

    /// Terminal initialization failed for a reason not covered above.
    TerminalInit(String),

    /// Invalid input provided by the caller.
    InvalidInput(String),

    /// Parse error unrelated to escape-sequence parsing (e.g. ANSI-art ingestion).
    Parse(String),
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub fn not_a_terminal() -> Self {
        Self::new(ErrorKind::NotATerminal)
    }

    pub fn capability_missing(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapabilityMissing(msg.into()))
    }

    pub fn transient_io(source: std::io::Error) -> Self {
        Self::new(ErrorKind::TransientIo(source))
    }

    pub fn fatal_io(source: std::io::Error) -> Self {
        Self::new(ErrorKind::FatalIo(source))
    }

    pub fn parse_overflow(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseOverflow(msg.into()))
    }

    pub fn resize_out_of_range(cols: u32, rows: u32) -> Self {
        Self::new(ErrorKind::ResizeOutOfRange { cols, rows })
    }

    pub(crate) fn terminal_init(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TerminalInit(msg.into()))
    }

    #[allow(dead_code, reason = "kept for parity with invalid-input call sites added during development")]
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput(msg.into()))
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse(msg.into()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Transient failures are retried by [`crate::recovery::ErrorRecovery`]; all
    /// others classify as fatal for the purpose of the retry/backoff loop.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::TransientIo(_))
    }

    pub fn is_capability_missing(&self) -> bool {
        matches!(self.kind, ErrorKind::CapabilityMissing(_))
    }

    pub fn is_fatal_io(&self) -> bool {
        matches!(self.kind, ErrorKind::FatalIo(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::NotATerminal => write!(f, "stdin/stdout is not a terminal")?,
            ErrorKind::CapabilityMissing(msg) => write!(f, "capability unavailable: {msg}")?,
            ErrorKind::TransientIo(e) => write!(f, "transient I/O error: {e}")?,
            ErrorKind::FatalIo(e) => write!(f, "fatal I/O error: {e}")?,
            ErrorKind::ParseOverflow(msg) => write!(f, "escape sequence discarded: {msg}")?,
            ErrorKind::ResizeOutOfRange { cols, rows } => {
                write!(f, "resize out of range: {cols}x{rows}")?
            }
            ErrorKind::Io(e) => write!(f, "I/O error: {e}")?,
            ErrorKind::TerminalInit(msg) => write!(f, "terminal initialization failed: {msg}")?,
            ErrorKind::InvalidInput(msg) => write!(f, "invalid input: {msg}")?,
            ErrorKind::Parse(msg) => write!(f, "parse error: {msg}")?,
        }

        if self.backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            write!(f, "\n\nBacktrace:\n{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::TransientIo(e) | ErrorKind::FatalIo(e) | ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;
        match e.kind() {
            IoKind::Interrupted | IoKind::WouldBlock => Self::new(ErrorKind::TransientIo(e)),
            _ => Self::new(ErrorKind::Io(e)),
        }
    }
}

/// Result type for terminal I/O core operations.
pub type Result<T> = std::result::Result<T, Error>;

// (C) 2025 - Enzo Lombardi

//! Terminal capability detection and backend scoring.
//!
//! Consults environment overrides first, then OS-level hints and TTY-ness,
//! in priority order. A live DA1 device-attribute query is deliberately not
//! sent here — doing so safely requires write access to the live terminal
//! and a bounded-timeout read loop, which belongs to a backend's `init`, not
//! to this pure probe. [`Capabilities::terminal_id`] starts out as this
//! probe's `TERM` reading; [`crate::backend::ansi::AnsiBackend::init`] sends
//! a `CSI c` query on Unix and overwrites it with the raw response if one
//! arrives within the timeout. `TermiosRawBackend` and `CursesFallbackBackend`
//! don't perform this query and leave `terminal_id` at the probe's value.

use crate::attr::ColorDepth;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MouseSupport {
    None,
    X10,
    X11,
    Sgr,
}

/// What a terminal supports, as understood at startup.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub color_depth: ColorDepth,
    pub mouse: MouseSupport,
    pub bracketed_paste: bool,
    pub utf8: bool,
    pub alt_screen: bool,
    pub title: bool,
    pub cursor_shapes: bool,
    pub terminal_id: String,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            color_depth: ColorDepth::Indexed16,
            mouse: MouseSupport::None,
            bracketed_paste: false,
            utf8: false,
            alt_screen: false,
            title: false,
            cursor_shapes: false,
            terminal_id: String::new(),
        }
    }
}

/// Backend kind a [`crate::backend::factory::PlatformFactory`] can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ansi,
    TermiosRaw,
    CursesFallback,
}

impl BackendKind {
    /// Escalation order on fatal failure: ANSI -> termios-raw
    /// -> curses-fallback -> bail.
    pub fn fallback_chain() -> [BackendKind; 3] {
        [BackendKind::Ansi, BackendKind::TermiosRaw, BackendKind::CursesFallback]
    }

    pub fn next_fallback(self) -> Option<BackendKind> {
        match self {
            BackendKind::Ansi => Some(BackendKind::TermiosRaw),
            BackendKind::TermiosRaw => Some(BackendKind::CursesFallback),
            BackendKind::CursesFallback => None,
        }
    }
}

/// Pure detector: reads environment and TTY-ness, never writes to the
/// terminal. `AnsiBackend::init` performs the live DA1 query itself and
/// folds the result into the `Capabilities` this probe produced.
pub struct CapabilityProbe {
    stdin_is_tty: bool,
    stdout_is_tty: bool,
}

impl CapabilityProbe {
    pub fn new(stdin_is_tty: bool, stdout_is_tty: bool) -> Self {
        Self {
            stdin_is_tty,
            stdout_is_tty,
        }
    }

    #[cfg(unix)]
    pub fn detect_tty() -> Self {
        use nix::unistd::isatty;
        use std::os::unix::io::AsRawFd;
        Self::new(
            isatty(std::io::stdin().as_raw_fd()).unwrap_or(false),
            isatty(std::io::stdout().as_raw_fd()).unwrap_or(false),
        )
    }

    #[cfg(not(unix))]
    pub fn detect_tty() -> Self {
        Self::new(true, true)
    }

    pub fn is_terminal(&self) -> bool {
        self.stdin_is_tty && self.stdout_is_tty
    }

    /// Probe capabilities from environment overrides and OS hints, per
    /// the priority order above (minus the live DA1 query, which
    /// `AnsiBackend::init` performs when it's the selected backend).
    pub fn probe(&self) -> Capabilities {
        let mut caps = Capabilities::default();

        if !self.is_terminal() {
            return caps;
        }

        caps.alt_screen = true;
        caps.title = true;
        caps.mouse = MouseSupport::Sgr;
        caps.bracketed_paste = true;
        caps.cursor_shapes = true;

        caps.utf8 = detect_utf8_locale();

        let term = env::var("TERM").unwrap_or_default();
        let colorterm = env::var("COLORTERM").unwrap_or_default();

        caps.color_depth = if env::var("NO_COLOR").is_ok() {
            ColorDepth::Mono
        } else if colorterm == "truecolor" || colorterm == "24bit" {
            ColorDepth::Rgb24
        } else if term.ends_with("-256color") || term.contains("256color") {
            ColorDepth::Indexed256
        } else if term == "dumb" || term.is_empty() {
            ColorDepth::Mono
        } else {
            ColorDepth::Indexed16
        };

        if env::var("WSL_DISTRO_NAME").is_ok() || env::var("WSL_INTEROP").is_ok() {
            // WSL's console historically lagged on SGR truecolor in some
            // terminal hosts; conservatively cap at 256 unless COLORTERM says otherwise.
            if colorterm != "truecolor" && colorterm != "24bit" {
                caps.color_depth = caps.color_depth.min(ColorDepth::Indexed256);
            }
        }

        caps.terminal_id = term;
        caps
    }

    /// `COLUMNS`/`LINES`, consulted only as a startup hint before the first
    /// live size query — not re-checked afterward, since a live resize
    /// event is the source of truth once the terminal is up. `None` if
    /// either is unset, unparseable, or zero.
    pub fn size_hint() -> Option<(u16, u16)> {
        Self::parse_size_hint(env::var("COLUMNS").ok(), env::var("LINES").ok())
    }

    fn parse_size_hint(cols: Option<String>, lines: Option<String>) -> Option<(u16, u16)> {
        let cols: u16 = cols?.parse().ok()?;
        let lines: u16 = lines?.parse().ok()?;
        if cols == 0 || lines == 0 {
            return None;
        }
        Some((cols, lines))
    }

    /// Explicit backend override from `TERMIO_BACKEND`, naming a preferred
    /// backend: `ansi | termios | curses | auto`.
    pub fn backend_override() -> Option<BackendKind> {
        match env::var("TERMIO_BACKEND").ok()?.as_str() {
            "ansi" => Some(BackendKind::Ansi),
            "termios" => Some(BackendKind::TermiosRaw),
            "curses" => Some(BackendKind::CursesFallback),
            _ => None,
        }
    }

    /// Score a candidate backend for this environment's capabilities, per
    /// `color_depth*w_color + mouse*w_mouse + paste*w_paste - init_cost`.
    pub fn score(caps: &Capabilities, candidate: BackendKind) -> i32 {
        const W_COLOR: i32 = 10;
        const W_MOUSE: i32 = 5;
        const W_PASTE: i32 = 2;

        let color_score = match caps.color_depth {
            ColorDepth::Mono => 0,
            ColorDepth::Indexed16 => 1,
            ColorDepth::Indexed256 => 2,
            ColorDepth::Rgb24 => 3,
        };
        let mouse_score = match caps.mouse {
            MouseSupport::None => 0,
            MouseSupport::X10 => 1,
            MouseSupport::X11 => 2,
            MouseSupport::Sgr => 3,
        };
        let paste_score = i32::from(caps.bracketed_paste);

        let base = color_score * W_COLOR + mouse_score * W_MOUSE + paste_score * W_PASTE;

        let init_cost = match candidate {
            BackendKind::Ansi => 2,
            BackendKind::TermiosRaw => 3,
            BackendKind::CursesFallback => 5,
        };

        // ANSI is preferred on a tie; give it a small edge so the scoring
        // naturally favors it on modern TTYs.
        let preference_bonus = match candidate {
            BackendKind::Ansi => 1,
            BackendKind::TermiosRaw => 0,
            BackendKind::CursesFallback => 0,
        };

        base + preference_bonus - init_cost
    }
}

fn detect_utf8_locale() -> bool {
    for var in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(v) = env::var(var) {
            let lower = v.to_lowercase();
            if lower.contains("utf-8") || lower.contains("utf8") {
                return true;
            }
            if !v.is_empty() {
                return false;
            }
        }
    }
    true
}

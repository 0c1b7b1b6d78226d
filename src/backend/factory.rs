// (C) 2025 - Enzo Lombardi

//! `PlatformFactory`: picks and wires a display/input backend pair.
//!
//! Generalizes this crate's prior `Terminal::new`, which always constructed
//! a `CrosstermBackend` directly, into a selection step: probe capabilities,
//! honor an explicit override, otherwise score the fallback chain and take
//! the best-scoring candidate, then construct both halves of that backend.

use crate::capability::{BackendKind, CapabilityProbe, Capabilities};
use crate::error::{Error, Result};

use super::ansi::{AnsiBackend, AnsiInputBackend};
use super::curses_fallback::{CursesFallbackBackend, CursesFallbackInputBackend};
use super::termios_raw::{TermiosRawBackend, TermiosRawInputBackend};
use super::{DisplayBackend, InputBackend};

/// A selected, constructed-but-uninitialized backend pair plus the
/// capabilities that drove the selection.
pub struct PlatformFactory {
    pub display: Box<dyn DisplayBackend>,
    pub input: Box<dyn InputBackend>,
    pub capabilities: Capabilities,
    pub kind: BackendKind,
}

impl PlatformFactory {
    /// Probes the environment and selects the highest-scoring backend not
    /// already tried, consulting `TERMIO_BACKEND` first.
    pub fn detect() -> Result<Self> {
        let probe = CapabilityProbe::detect_tty();
        if !probe.is_terminal() {
            return Err(Error::not_a_terminal());
        }
        let capabilities = probe.probe();

        let kind = CapabilityProbe::backend_override().unwrap_or_else(|| {
            BackendKind::fallback_chain()
                .into_iter()
                .max_by_key(|&candidate| CapabilityProbe::score(&capabilities, candidate))
                .unwrap_or(BackendKind::CursesFallback)
        });

        Ok(Self::build(kind, capabilities))
    }

    /// Builds a specific backend pair without probing, e.g. when retrying
    /// after [`crate::recovery::ErrorRecovery::classify`] returns
    /// `Escalate(Some(kind))`.
    pub fn build(kind: BackendKind, capabilities: Capabilities) -> Self {
        let (display, input): (Box<dyn DisplayBackend>, Box<dyn InputBackend>) = match kind {
            BackendKind::Ansi => (Box::new(AnsiBackend::new()), Box::new(AnsiInputBackend::new())),
            BackendKind::TermiosRaw => {
                (Box::new(TermiosRawBackend::new()), Box::new(TermiosRawInputBackend::new()))
            }
            BackendKind::CursesFallback => {
                (Box::new(CursesFallbackBackend::new()), Box::new(CursesFallbackInputBackend::new()))
            }
        };
        Self { display, input, capabilities, kind }
    }

    /// Rebuilds this factory as the next backend in the fallback chain,
    /// carrying the same capabilities forward. `None` once the chain is
    /// exhausted.
    pub fn downgrade(self) -> Option<Self> {
        let next = self.kind.next_fallback()?;
        Some(Self::build(next, self.capabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::ColorDepth;
    use crate::capability::MouseSupport;

    #[test]
    fn build_selects_matching_backend_kind() {
        let caps = Capabilities::default();
        let factory = PlatformFactory::build(BackendKind::CursesFallback, caps);
        assert_eq!(factory.kind, BackendKind::CursesFallback);
    }

    #[test]
    fn downgrade_walks_the_fallback_chain() {
        let caps = Capabilities { color_depth: ColorDepth::Rgb24, mouse: MouseSupport::Sgr, ..Capabilities::default() };
        let factory = PlatformFactory::build(BackendKind::Ansi, caps);
        let factory = factory.downgrade().expect("ansi falls back to termios-raw");
        assert_eq!(factory.kind, BackendKind::TermiosRaw);
        let factory = factory.downgrade().expect("termios-raw falls back to curses");
        assert_eq!(factory.kind, BackendKind::CursesFallback);
        assert!(factory.downgrade().is_none());
    }
}

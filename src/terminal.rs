// (C) 2025 - Enzo Lombardi

//! [`Terminal`]: the facade tying buffer, backend, and recovery together.
//!
//! Generalizes this crate's prior `Terminal` (which owned a single `Backend`
//! trait object directly) into a thin driver over [`DisplayBuffer`] plus a
//! [`PlatformFactory`]-selected backend pair, with [`ErrorRecovery`] sitting
//! between a failed I/O call and the decision to retry, downgrade, or bail.

use std::time::Duration;

use crate::backend::factory::PlatformFactory;
use crate::backend::{DisplayBackend, InputBackend};
use crate::buffer::DisplayBuffer;
use crate::capability::Capabilities;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::recovery::{ErrorRecovery, RecoveryAction};

/// Owns the buffer, the active backend pair, and the recovery policy that
/// decides what to do when a backend call fails.
pub struct Terminal {
    display: Box<dyn DisplayBackend>,
    input: Box<dyn InputBackend>,
    buffer: DisplayBuffer,
    capabilities: Capabilities,
    recovery: ErrorRecovery,
}

impl Terminal {
    /// Probes the environment, selects a backend, and initializes it.
    pub fn init() -> Result<Self> {
        let factory = PlatformFactory::detect()?;
        Self::with_factory(factory)
    }

    /// Initializes with an already-selected backend pair, e.g. for tests
    /// that build a [`PlatformFactory`] directly against a forced
    /// [`crate::capability::BackendKind`].
    pub fn with_factory(mut factory: PlatformFactory) -> Result<Self> {
        factory.display.init(&factory.capabilities)?;
        factory.input.init()?;
        let (width, height) = match crate::capability::CapabilityProbe::size_hint() {
            Some(size) => size,
            None => factory.display.size()?,
        };
        let recovery = ErrorRecovery::new(factory.kind);
        Ok(Self {
            display: factory.display,
            input: factory.input,
            buffer: DisplayBuffer::new(width, height),
            capabilities: factory.capabilities,
            recovery,
        })
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn buffer_mut(&mut self) -> &mut DisplayBuffer {
        &mut self.buffer
    }

    pub fn size(&self) -> (u16, u16) {
        (self.buffer.width(), self.buffer.height())
    }

    /// Reconciles pending damage to the terminal, escalating through
    /// [`ErrorRecovery`] on failure rather than propagating the first error.
    pub fn flush(&mut self) -> Result<()> {
        match self.display.flush(&mut self.buffer) {
            Ok(()) => {
                self.recovery.record_success();
                Ok(())
            }
            Err(err) => self.handle_failure(err),
        }
    }

    pub fn set_cursor(&mut self, x: u16, y: u16, visible: bool) -> Result<()> {
        self.display.set_cursor(x, y, visible)
    }

    pub fn bell(&mut self) -> Result<()> {
        self.display.bell()
    }

    /// Briefly inverts every cell's colors as a visual bell, bypassing the
    /// FPS limiter for both flushes so the flash is never silently dropped
    /// or delayed by frame pacing.
    pub fn flash(&mut self) -> Result<()> {
        self.buffer.invert_all();
        self.flush_now()?;
        std::thread::sleep(Duration::from_millis(50));
        self.buffer.invert_all();
        self.flush_now()
    }

    fn flush_now(&mut self) -> Result<()> {
        let saved = std::mem::replace(self.buffer.fps_limiter_mut(), crate::fps::FpsLimiter::unlimited());
        let result = self.display.flush(&mut self.buffer);
        *self.buffer.fps_limiter_mut() = saved;
        result
    }

    /// Waits up to `deadline` for the next input event, synthesizing a
    /// `Resize` and growing the buffer when the terminal's reported size
    /// no longer matches what's tracked.
    pub fn poll_event(&mut self, deadline: Duration) -> Result<Option<Event>> {
        let event = self.input.poll(deadline)?;
        if let Some(Event::Resize { cols, rows }) = event {
            self.buffer.resize(cols, rows);
        }
        Ok(event)
    }

    pub fn suspend(&mut self) -> Result<()> {
        self.display.suspend()?;
        self.input.shutdown()
    }

    pub fn resume(&mut self) -> Result<()> {
        self.display.resume(&self.capabilities)?;
        self.input.init()?;
        self.buffer.clear(crate::attr::Attr::default());
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.input.shutdown()?;
        self.display.shutdown()
    }

    /// Classifies a failed backend call and acts on the verdict: sleeps and
    /// retries, drops a capability and retries immediately, re-inits the
    /// next backend in the fallback chain, or gives up by propagating the
    /// original error.
    fn handle_failure(&mut self, err: Error) -> Result<()> {
        match self.recovery.classify(&err) {
            RecoveryAction::RetryAfter(delay) => {
                std::thread::sleep(delay);
                self.display.flush(&mut self.buffer)
            }
            RecoveryAction::Downgrade => {
                self.capabilities.color_depth = match self.capabilities.color_depth {
                    crate::attr::ColorDepth::Rgb24 => crate::attr::ColorDepth::Indexed256,
                    crate::attr::ColorDepth::Indexed256 => crate::attr::ColorDepth::Indexed16,
                    _ => crate::attr::ColorDepth::Mono,
                };
                self.buffer.clear(crate::attr::Attr::default());
                self.display.flush(&mut self.buffer)
            }
            RecoveryAction::Escalate(Some(kind)) => {
                let mut factory = PlatformFactory::build(kind, self.capabilities.clone());
                let _ = self.display.shutdown();
                factory.display.init(&factory.capabilities)?;
                factory.input.init()?;
                self.display = factory.display;
                self.input = factory.input;
                self.buffer.clear(crate::attr::Attr::default());
                Ok(())
            }
            RecoveryAction::Escalate(None) | RecoveryAction::GiveUp => Err(err),
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

// (C) 2025 - Enzo Lombardi

//! `ErrorRecovery`: retry policy, fallback escalation, I/O error classification.
//!
//! Classifies failures using [`crate::error::Error`]'s own `is_transient` /
//! `is_capability_missing` / `is_fatal_io` predicates, then decides what a
//! caller should do next: retry after a backoff, downgrade a capability and
//! continue, or escalate to the next backend in
//! [`crate::capability::BackendKind::fallback_chain`].

use crate::capability::BackendKind;
use crate::error::Error;
use std::time::Duration;

/// What the caller should do after a failed operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Retry the same operation after waiting this long.
    RetryAfter(Duration),
    /// Drop to a lower capability (e.g. rgb24 -> 256) and retry immediately.
    Downgrade,
    /// Give up on the current backend and re-init with the next one.
    Escalate(Option<BackendKind>),
    /// Not recoverable; propagate to the application.
    GiveUp,
}

/// Exponential backoff with a ceiling, escalating to the next backend after
/// `max_attempts` consecutive failures on the current one.
pub struct ErrorRecovery {
    current: BackendKind,
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ErrorRecovery {
    pub fn new(current: BackendKind) -> Self {
        Self {
            current,
            attempts: 0,
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(2),
        }
    }

    pub fn with_policy(current: BackendKind, max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { current, attempts: 0, max_attempts, base_delay, max_delay }
    }

    pub fn current_backend(&self) -> BackendKind {
        self.current
    }

    /// Reset the attempt counter after an operation finally succeeds.
    pub fn record_success(&mut self) {
        self.attempts = 0;
    }

    /// Classify `err` and decide the next action, advancing internal retry
    /// state. Escalating resets the attempt counter against the new backend.
    pub fn classify(&mut self, err: &Error) -> RecoveryAction {
        if err.is_capability_missing() {
            log::warn!("backend reported missing capability, downgrading: {err}");
            return RecoveryAction::Downgrade;
        }

        if err.is_transient() {
            self.attempts += 1;
            if self.attempts > self.max_attempts {
                return self.escalate(err);
            }
            let delay = self.backoff_delay();
            log::debug!("transient I/O error, retrying in {delay:?}: {err}");
            return RecoveryAction::RetryAfter(delay);
        }

        if err.is_fatal_io() {
            return self.escalate(err);
        }

        log::error!("unrecoverable error: {err}");
        RecoveryAction::GiveUp
    }

    fn escalate(&mut self, err: &Error) -> RecoveryAction {
        self.attempts = 0;
        match self.current.next_fallback() {
            Some(next) => {
                log::warn!("escalating from {:?} to {next:?} after: {err}", self.current);
                self.current = next;
                RecoveryAction::Escalate(Some(next))
            }
            None => {
                log::error!("fallback chain exhausted after: {err}");
                RecoveryAction::Escalate(None)
            }
        }
    }

    fn backoff_delay(&self) -> Duration {
        let exp = self.attempts.min(16);
        let scaled = self.base_delay.saturating_mul(1u32 << exp.min(20));
        scaled.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn transient_retries_with_growing_backoff() {
        let mut recovery = ErrorRecovery::new(BackendKind::Ansi);
        let err = Error::transient_io(io::Error::from(io::ErrorKind::Interrupted));
        let first = recovery.classify(&err);
        let second = recovery.classify(&err);
        match (first, second) {
            (RecoveryAction::RetryAfter(d1), RecoveryAction::RetryAfter(d2)) => assert!(d2 >= d1),
            other => panic!("expected two retries, got {other:?}"),
        }
    }

    #[test]
    fn capability_missing_downgrades() {
        let mut recovery = ErrorRecovery::new(BackendKind::Ansi);
        let err = Error::capability_missing("rgb24 unsupported");
        assert_eq!(recovery.classify(&err), RecoveryAction::Downgrade);
    }

    #[test]
    fn fatal_io_escalates_to_next_backend() {
        let mut recovery = ErrorRecovery::new(BackendKind::Ansi);
        let err = Error::fatal_io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(
            recovery.classify(&err),
            RecoveryAction::Escalate(Some(BackendKind::TermiosRaw))
        );
        assert_eq!(recovery.current_backend(), BackendKind::TermiosRaw);
    }

    #[test]
    fn escalation_past_last_backend_gives_up() {
        let mut recovery = ErrorRecovery::new(BackendKind::CursesFallback);
        let err = Error::fatal_io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(recovery.classify(&err), RecoveryAction::Escalate(None));
    }

    #[test]
    fn repeated_transient_failures_eventually_escalate() {
        let mut recovery =
            ErrorRecovery::with_policy(BackendKind::Ansi, 2, Duration::from_millis(1), Duration::from_millis(100));
        let err = Error::transient_io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(matches!(recovery.classify(&err), RecoveryAction::RetryAfter(_)));
        assert!(matches!(recovery.classify(&err), RecoveryAction::RetryAfter(_)));
        assert_eq!(
            recovery.classify(&err),
            RecoveryAction::Escalate(Some(BackendKind::TermiosRaw))
        );
    }

    #[test]
    fn success_resets_attempt_counter() {
        let mut recovery =
            ErrorRecovery::with_policy(BackendKind::Ansi, 1, Duration::from_millis(1), Duration::from_millis(100));
        let err = Error::transient_io(io::Error::from(io::ErrorKind::WouldBlock));
        let _ = recovery.classify(&err);
        recovery.record_success();
        assert!(matches!(recovery.classify(&err), RecoveryAction::RetryAfter(_)));
    }
}

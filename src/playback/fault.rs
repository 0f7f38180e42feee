//! Consecutive playback failure tracking.
//!
//! The monitor decides, per failure, whether to skip ahead after a short
//! delay or stop for good. The fault budget is
//! `max(multiplier × playlist length, floor)`; reaching it halts automatic
//! recovery until the user plays something by hand.

use tracing::{info, warn};

use crate::types::SessionConfig;

/// How a player error code is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    /// The content owner blocks embedded playback
    Restriction,
    /// Any other failure
    Generic,
}

/// What to do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDecision {
    /// Show a transient message and advance after the delay
    SkipAfterDelay { kind: PlaybackErrorKind },
    /// The only entry is restricted; stop
    NotEmbeddable,
    /// The only entry failed; stop
    Unplayable,
    /// Fault budget exhausted; stop
    TooManyErrors { failures: u32, budget: u32 },
}

impl FaultDecision {
    /// Returns true if the decision ends automatic recovery.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FaultDecision::SkipAfterDelay { .. })
    }
}

/// Fault budget and error classification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultPolicy {
    multiplier: u32,
    floor: u32,
    restriction_codes: Vec<i32>,
}

impl FaultPolicy {
    pub fn new(multiplier: u32, floor: u32, restriction_codes: Vec<i32>) -> Self {
        Self {
            multiplier,
            floor,
            restriction_codes,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.fault_budget_multiplier,
            config.fault_budget_floor,
            config.restriction_codes.clone(),
        )
    }

    /// Maximum consecutive failures tolerated for a playlist of `len` entries.
    pub fn budget(&self, len: usize) -> u32 {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.multiplier.saturating_mul(len).max(self.floor)
    }

    pub fn classify(&self, code: i32) -> PlaybackErrorKind {
        if self.restriction_codes.contains(&code) {
            PlaybackErrorKind::Restriction
        } else {
            PlaybackErrorKind::Generic
        }
    }
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Tracks consecutive failures for the current playback session.
#[derive(Debug, Clone, Default)]
pub struct FaultMonitor {
    policy: FaultPolicy,
    consecutive_failures: u32,
    halted: bool,
}

impl FaultMonitor {
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            halted: false,
        }
    }

    /// Records a failure and decides how to react.
    pub fn record_failure(&mut self, code: i32, playlist_len: usize) -> FaultDecision {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let budget = self.policy.budget(playlist_len);

        let decision = if self.consecutive_failures >= budget {
            FaultDecision::TooManyErrors {
                failures: self.consecutive_failures,
                budget,
            }
        } else {
            let kind = self.policy.classify(code);
            match (kind, playlist_len > 1) {
                (_, true) => FaultDecision::SkipAfterDelay { kind },
                (PlaybackErrorKind::Restriction, false) => FaultDecision::NotEmbeddable,
                (PlaybackErrorKind::Generic, false) => FaultDecision::Unplayable,
            }
        };

        if decision.is_terminal() {
            self.halted = true;
            warn!(
                code,
                failures = self.consecutive_failures,
                budget,
                ?decision,
                "Playback halted"
            );
        } else {
            info!(
                code,
                failures = self.consecutive_failures,
                budget,
                "Playback error, skipping"
            );
        }
        decision
    }

    /// Clears the failure count after a confirmed start.
    ///
    /// A confirmed start also ends a halt. Returns true if it did.
    pub fn confirm_started(&mut self) -> bool {
        self.consecutive_failures = 0;
        let recovered = std::mem::take(&mut self.halted);
        if recovered {
            info!("Playback recovered from halt");
        }
        recovered
    }

    /// Clears the failure count and the halted flag after a manual action.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.halted = false;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns true while in the terminal error state.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn policy(&self) -> &FaultPolicy {
        &self.policy
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RESTRICTED: i32 = 150;
    const GENERIC: i32 = 5;

    mod policy_tests {
        use super::*;

        #[test]
        fn test_budget_floor() {
            let policy = FaultPolicy::default();
            assert_eq!(policy.budget(0), 5);
            assert_eq!(policy.budget(1), 5);
            assert_eq!(policy.budget(2), 5);
            assert_eq!(policy.budget(3), 6);
            assert_eq!(policy.budget(4), 8);
        }

        #[test]
        fn test_budget_custom_constants() {
            let policy = FaultPolicy::new(3, 2, vec![]);
            assert_eq!(policy.budget(0), 2);
            assert_eq!(policy.budget(4), 12);
        }

        #[test]
        fn test_classify() {
            let policy = FaultPolicy::default();
            assert_eq!(policy.classify(101), PlaybackErrorKind::Restriction);
            assert_eq!(policy.classify(150), PlaybackErrorKind::Restriction);
            assert_eq!(policy.classify(2), PlaybackErrorKind::Generic);
            assert_eq!(policy.classify(100), PlaybackErrorKind::Generic);
        }
    }

    mod monitor_tests {
        use super::*;

        #[test]
        fn test_single_entry_restriction_is_terminal() {
            let mut monitor = FaultMonitor::default();
            let decision = monitor.record_failure(RESTRICTED, 1);
            assert_eq!(decision, FaultDecision::NotEmbeddable);
            assert!(monitor.is_halted());
        }

        #[test]
        fn test_single_entry_generic_is_terminal() {
            let mut monitor = FaultMonitor::default();
            assert_eq!(monitor.record_failure(GENERIC, 1), FaultDecision::Unplayable);
            assert!(monitor.is_halted());
        }

        #[test]
        fn test_multi_entry_skips() {
            let mut monitor = FaultMonitor::default();
            assert_eq!(
                monitor.record_failure(RESTRICTED, 3),
                FaultDecision::SkipAfterDelay {
                    kind: PlaybackErrorKind::Restriction
                }
            );
            assert_eq!(
                monitor.record_failure(GENERIC, 3),
                FaultDecision::SkipAfterDelay {
                    kind: PlaybackErrorKind::Generic
                }
            );
            assert!(!monitor.is_halted());
            assert_eq!(monitor.consecutive_failures(), 2);
        }

        #[test]
        fn test_budget_exhaustion_with_four_entries() {
            let mut monitor = FaultMonitor::default();
            for _ in 0..7 {
                assert!(!monitor.record_failure(GENERIC, 4).is_terminal());
            }
            assert_eq!(
                monitor.record_failure(RESTRICTED, 4),
                FaultDecision::TooManyErrors {
                    failures: 8,
                    budget: 8
                }
            );
            assert!(monitor.is_halted());
        }

        #[test]
        fn test_confirm_started_resets_count() {
            let mut monitor = FaultMonitor::default();
            monitor.record_failure(GENERIC, 4);
            monitor.record_failure(GENERIC, 4);
            assert!(!monitor.confirm_started());
            assert_eq!(monitor.consecutive_failures(), 0);
        }

        #[test]
        fn test_confirm_started_ends_halt() {
            let mut monitor = FaultMonitor::default();
            monitor.record_failure(RESTRICTED, 1);
            assert!(monitor.is_halted());

            assert!(monitor.confirm_started());
            assert!(!monitor.is_halted());
            assert_eq!(monitor.consecutive_failures(), 0);
        }

        #[test]
        fn test_reset_clears_halt() {
            let mut monitor = FaultMonitor::default();
            monitor.record_failure(GENERIC, 1);
            assert!(monitor.is_halted());

            monitor.reset();
            assert!(!monitor.is_halted());
            assert_eq!(monitor.consecutive_failures(), 0);
        }
    }
}

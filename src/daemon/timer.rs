//! Sleep countdown and sleep mode.
//!
//! This module provides:
//! - `CountdownTimer`: one-second resolution countdown that expires once per run
//! - `SleepModeGate`: the night-clock mode entered on expiry
//!
//! Neither type owns a clock; ticks are fed in by the session driver.

use tracing::{debug, info};

use crate::types::CountdownState;

// ============================================================================
// CountdownTick
// ============================================================================

/// Result of feeding one tick to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Still counting
    Running {
        /// Remaining seconds
        remaining_seconds: u32,
    },
    /// This tick reached zero
    Expired,
    /// The countdown was not running; tick ignored
    Idle,
}

// ============================================================================
// CountdownTimer
// ============================================================================

/// Sleep countdown.
#[derive(Debug, Clone, Default)]
pub struct CountdownTimer {
    state: CountdownState,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the countdown, replacing any run in progress.
    pub fn start(&mut self, minutes: u32) {
        self.state.start(minutes);
        info!(minutes, "Countdown started");
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> CountdownTick {
        if !self.state.is_running {
            debug!("Countdown tick while idle");
            return CountdownTick::Idle;
        }
        if self.state.tick() {
            info!("Countdown expired");
            CountdownTick::Expired
        } else {
            CountdownTick::Running {
                remaining_seconds: self.state.remaining_seconds,
            }
        }
    }

    /// Stops the countdown without expiring it. Returns true if it was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.state.is_running;
        self.state.cancel();
        if was_running {
            info!("Countdown cancelled");
        }
        was_running
    }

    /// Puts back a previously captured state.
    pub(crate) fn restore(&mut self, state: CountdownState) {
        self.state = state;
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }
}

// ============================================================================
// SleepModeGate
// ============================================================================

/// Night-clock mode. Entered on countdown expiry, left on wake or manual play.
#[derive(Debug, Clone, Default)]
pub struct SleepModeGate {
    sleeping: bool,
    clock: Option<String>,
}

impl SleepModeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters sleep mode. Returns true if the mode changed.
    pub fn enter(&mut self) -> bool {
        if self.sleeping {
            return false;
        }
        self.sleeping = true;
        info!("Entering sleep mode");
        true
    }

    /// Leaves sleep mode. Returns true if the mode changed.
    pub fn wake(&mut self) -> bool {
        if !self.sleeping {
            return false;
        }
        self.sleeping = false;
        self.clock = None;
        info!("Leaving sleep mode");
        true
    }

    /// Updates the clock text shown while sleeping. Ignored when awake.
    pub fn set_clock(&mut self, text: impl Into<String>) {
        if self.sleeping {
            self.clock = Some(text.into());
        }
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn clock(&self) -> Option<&str> {
        self.clock.as_deref()
    }
}

/// Formats the local wall-clock time for the night clock.
pub fn clock_text() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // CountdownTimer Tests
    // ------------------------------------------------------------------------

    mod countdown_timer_tests {
        use super::*;

        #[test]
        fn test_new_timer_is_idle() {
            let mut timer = CountdownTimer::new();
            assert!(!timer.is_running());
            assert_eq!(timer.tick(), CountdownTick::Idle);
        }

        #[test]
        fn test_one_minute_run() {
            let mut timer = CountdownTimer::new();
            timer.start(1);

            let mut expired = 0;
            for _ in 0..60 {
                if timer.tick() == CountdownTick::Expired {
                    expired += 1;
                }
            }

            assert_eq!(expired, 1);
            assert!(!timer.is_running());
            assert_eq!(timer.remaining_seconds(), 0);
            assert_eq!(timer.tick(), CountdownTick::Idle);
        }

        #[test]
        fn test_tick_reports_remaining() {
            let mut timer = CountdownTimer::new();
            timer.start(2);
            assert_eq!(
                timer.tick(),
                CountdownTick::Running {
                    remaining_seconds: 119
                }
            );
        }

        #[test]
        fn test_cancel_before_expiry() {
            let mut timer = CountdownTimer::new();
            timer.start(5);
            timer.tick();

            assert!(timer.cancel());
            assert!(!timer.is_running());
            assert_eq!(timer.remaining_seconds(), 0);

            for _ in 0..300 {
                assert_eq!(timer.tick(), CountdownTick::Idle);
            }
        }

        #[test]
        fn test_cancel_when_idle() {
            let mut timer = CountdownTimer::new();
            assert!(!timer.cancel());
        }

        #[test]
        fn test_restart_replaces_run() {
            let mut timer = CountdownTimer::new();
            timer.start(5);
            for _ in 0..10 {
                timer.tick();
            }
            timer.start(1);
            assert_eq!(timer.remaining_seconds(), 60);
            assert_eq!(timer.state().initial_seconds, 60);
        }

        #[test]
        fn test_restore() {
            let mut timer = CountdownTimer::new();
            timer.start(3);
            let saved = timer.state();
            timer.cancel();
            timer.restore(saved);
            assert!(timer.is_running());
            assert_eq!(timer.remaining_seconds(), 180);
        }
    }

    // ------------------------------------------------------------------------
    // SleepModeGate Tests
    // ------------------------------------------------------------------------

    mod sleep_mode_gate_tests {
        use super::*;

        #[test]
        fn test_enter_and_wake() {
            let mut gate = SleepModeGate::new();
            assert!(!gate.is_sleeping());

            assert!(gate.enter());
            assert!(!gate.enter());
            assert!(gate.is_sleeping());

            assert!(gate.wake());
            assert!(!gate.wake());
            assert!(!gate.is_sleeping());
        }

        #[test]
        fn test_clock_only_while_sleeping() {
            let mut gate = SleepModeGate::new();
            gate.set_clock("23:15");
            assert!(gate.clock().is_none());

            gate.enter();
            gate.set_clock("23:15");
            assert_eq!(gate.clock(), Some("23:15"));

            gate.wake();
            assert!(gate.clock().is_none());
        }

        #[test]
        fn test_clock_text_format() {
            let text = clock_text();
            assert_eq!(text.len(), 5);
            assert_eq!(&text[2..3], ":");
        }
    }
}

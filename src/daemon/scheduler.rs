//! Scoped timing resources.
//!
//! The daemon runs three timers: the countdown ticker, the night-clock ticker
//! and the one-shot auto-skip delay. Each is a [`ScopedTimer`]: arming it aborts
//! the previous task of the same kind, and every signal carries the generation
//! it was armed with so signals already queued from a cancelled run are dropped.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::debug;

/// Tick period shared by the countdown and the night clock.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Which timer a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Sleep countdown ticker
    Countdown,
    /// Night-clock ticker
    Clock,
    /// Delayed skip after a playback error
    AutoSkip,
}

/// A timer firing, as delivered to the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSignal {
    pub kind: TimerKind,
    pub generation: u64,
}

// ============================================================================
// ScopedTimer
// ============================================================================

/// One cancellable timer task.
#[derive(Debug)]
pub struct ScopedTimer {
    kind: TimerKind,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    signal_tx: mpsc::UnboundedSender<TimerSignal>,
}

impl ScopedTimer {
    pub fn new(kind: TimerKind, signal_tx: mpsc::UnboundedSender<TimerSignal>) -> Self {
        Self {
            kind,
            generation: 0,
            handle: None,
            signal_tx,
        }
    }

    /// Fires every `period`, first after one full period.
    pub fn start_interval(&mut self, period: Duration) {
        let signal = self.rearm();
        let tx = self.signal_tx.clone();
        let first = Instant::now() + period;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(signal).is_err() {
                    break;
                }
            }
        }));
    }

    /// Fires once after `delay`.
    pub fn start_once(&mut self, delay: Duration) {
        let signal = self.rearm();
        let tx = self.signal_tx.clone();
        let deadline = Instant::now() + delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(signal);
        }));
    }

    /// Stops the timer. Returns true if it was armed.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!(kind = ?self.kind, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns true if `signal` belongs to the current run of this timer.
    pub fn is_current(&self, signal: &TimerSignal) -> bool {
        signal.kind == self.kind && signal.generation == self.generation && self.handle.is_some()
    }

    /// Returns true while a run is armed.
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Marks a one-shot run as consumed.
    fn complete(&mut self) {
        self.handle = None;
        self.generation += 1;
    }

    fn rearm(&mut self) -> TimerSignal {
        self.cancel();
        debug!(kind = ?self.kind, generation = self.generation, "Timer armed");
        TimerSignal {
            kind: self.kind,
            generation: self.generation,
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// TimerSet
// ============================================================================

/// The three timers owned by a session.
#[derive(Debug)]
pub struct TimerSet {
    pub countdown: ScopedTimer,
    pub clock: ScopedTimer,
    pub auto_skip: ScopedTimer,
}

impl TimerSet {
    pub fn new(signal_tx: mpsc::UnboundedSender<TimerSignal>) -> Self {
        Self {
            countdown: ScopedTimer::new(TimerKind::Countdown, signal_tx.clone()),
            clock: ScopedTimer::new(TimerKind::Clock, signal_tx.clone()),
            auto_skip: ScopedTimer::new(TimerKind::AutoSkip, signal_tx),
        }
    }

    /// Checks a signal against the current runs.
    ///
    /// Returns false for stale signals. An accepted auto-skip signal consumes
    /// its run.
    pub fn accept(&mut self, signal: &TimerSignal) -> bool {
        let timer = match signal.kind {
            TimerKind::Countdown => &mut self.countdown,
            TimerKind::Clock => &mut self.clock,
            TimerKind::AutoSkip => &mut self.auto_skip,
        };
        if !timer.is_current(signal) {
            return false;
        }
        if signal.kind == TimerKind::AutoSkip {
            timer.complete();
        }
        true
    }

    /// Cancels every timer.
    pub fn cancel_all(&mut self) {
        self.countdown.cancel();
        self.clock.cancel();
        self.auto_skip.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================

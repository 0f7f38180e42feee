//! Async session driver.
//!
//! Wraps the [`Orchestrator`] behind a mutex so transitions never overlap,
//! carries out the effects each transition asks for, and pushes the player
//! directive out whenever it changes.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::playback::PlayerSink;
use crate::playlist::PlaylistStore;
use crate::types::{PlayableEntry, PlayerDirective};

use super::error::SessionError;
use super::orchestrator::{Effect, Orchestrator, SessionEvent, Transition};
use super::scheduler::{TimerKind, TimerSet, TimerSignal, TICK_PERIOD};
use super::timer::clock_text;

/// State guarded by the driver's mutex.
struct SessionCore {
    orchestrator: Orchestrator,
    timers: TimerSet,
    last_directive: Option<PlayerDirective>,
}

/// Serializes events into the orchestrator and executes their effects.
pub struct SessionDriver {
    core: Mutex<SessionCore>,
    /// Held across a save so writes land in transition order
    persist_lock: Mutex<()>,
    store: Arc<dyn PlaylistStore>,
    player: Arc<dyn PlayerSink>,
}

impl SessionDriver {
    /// Creates a driver and the receiver its timers report to.
    ///
    /// Feed the receiver to [`SessionDriver::run`].
    pub fn new(
        orchestrator: Orchestrator,
        store: Arc<dyn PlaylistStore>,
        player: Arc<dyn PlayerSink>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<TimerSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let driver = Arc::new(Self {
            core: Mutex::new(SessionCore {
                orchestrator,
                timers: TimerSet::new(signal_tx),
                last_directive: None,
            }),
            persist_lock: Mutex::new(()),
            store,
            player,
        });
        (driver, signal_rx)
    }

    /// Applies one event and its effects.
    pub async fn dispatch(&self, event: SessionEvent) -> Result<Transition, SessionError> {
        self.dispatch_with(event, |_| ())
            .await
            .map(|(transition, ())| transition)
    }

    /// Applies one event and reads the resulting state under the same lock.
    ///
    /// `snapshot` sees exactly the state this event produced, never a later
    /// one from a concurrent caller.
    pub async fn dispatch_with<R>(
        &self,
        event: SessionEvent,
        snapshot: impl FnOnce(&Orchestrator) -> R,
    ) -> Result<(Transition, R), SessionError> {
        let mut core = self.core.lock().await;
        let transition = core.orchestrator.handle(event)?;
        let pending = self.apply(&mut core, &transition.effects);
        self.publish(&mut core);
        let view = snapshot(&core.orchestrator);
        self.persist(core, pending).await;
        Ok((transition, view))
    }

    /// Turns a timer signal into an event. Stale signals are dropped.
    pub async fn on_timer(&self, signal: TimerSignal) {
        let mut core = self.core.lock().await;
        if !core.timers.accept(&signal) {
            debug!(kind = ?signal.kind, generation = signal.generation, "Stale timer signal dropped");
            return;
        }

        let event = match signal.kind {
            TimerKind::Countdown => SessionEvent::CountdownTick,
            TimerKind::Clock => SessionEvent::ClockTick {
                clock: clock_text(),
            },
            TimerKind::AutoSkip => SessionEvent::AutoSkipDue,
        };

        let transition = match core.orchestrator.handle(event) {
            Ok(transition) => transition,
            Err(e) => {
                warn!(error = %e, "Timer event rejected");
                return;
            }
        };
        let pending = self.apply(&mut core, &transition.effects);
        self.publish(&mut core);
        self.persist(core, pending).await;
    }

    /// Consumes timer signals until the channel closes.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::UnboundedReceiver<TimerSignal>) {
        while let Some(signal) = signals.recv().await {
            self.on_timer(signal).await;
        }
        debug!("Timer signal channel closed");
    }

    /// Runs `f` against the current state.
    pub async fn read<R>(&self, f: impl FnOnce(&Orchestrator) -> R) -> R {
        let core = self.core.lock().await;
        f(&core.orchestrator)
    }

    /// Cancels every timer.
    pub async fn shutdown(&self) {
        let mut core = self.core.lock().await;
        core.timers.cancel_all();
        debug!("Session timers cancelled");
    }

    /// Carries out timer effects. Returns the entries to save if the
    /// transition asked for persistence.
    fn apply(&self, core: &mut SessionCore, effects: &[Effect]) -> Option<Vec<PlayableEntry>> {
        let mut pending = None;
        for effect in effects {
            match *effect {
                Effect::ArmCountdown => core.timers.countdown.start_interval(TICK_PERIOD),
                Effect::CancelCountdown => {
                    core.timers.countdown.cancel();
                }
                Effect::ScheduleAutoSkip(delay) => core.timers.auto_skip.start_once(delay),
                Effect::CancelAutoSkip => {
                    core.timers.auto_skip.cancel();
                }
                Effect::StartClock => {
                    core.timers.clock.start_interval(TICK_PERIOD);
                    // Populate the clock before the first tick
                    core.orchestrator.set_clock(clock_text());
                }
                Effect::StopClock => {
                    core.timers.clock.cancel();
                }
                Effect::Persist => {
                    pending = Some(core.orchestrator.collection().entries().to_vec());
                }
            }
        }
        pending
    }

    /// Releases the session lock, then writes `pending` off the runtime
    /// thread.
    async fn persist(&self, core: MutexGuard<'_, SessionCore>, pending: Option<Vec<PlayableEntry>>) {
        let Some(entries) = pending else {
            return;
        };
        // Queue for the save before letting the next transition in
        let _order = self.persist_lock.lock().await;
        drop(core);

        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.save(&entries)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist playlist"),
            Err(e) => warn!(error = %e, "Playlist save task failed"),
        }
    }

    fn publish(&self, core: &mut SessionCore) {
        let directive = core.orchestrator.directive();
        if core.last_directive.as_ref() == Some(&directive) {
            return;
        }
        self.player.apply(&directive);
        core.last_directive = Some(directive);
    }
}

// ============================================================================
// Tests
// ============================================================================

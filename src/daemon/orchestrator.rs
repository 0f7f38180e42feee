//! Session state machine.
//!
//! [`Orchestrator::handle`] is the single transition function. It owns the
//! playlist, the selection, the countdown, the fault monitor and sleep mode,
//! applies one [`SessionEvent`] at a time and returns the side effects the
//! caller must carry out (timers, persistence). It never blocks and never
//! touches a clock.

use std::time::Duration;

use tracing::{debug, info};

use crate::playback::{FaultDecision, FaultMonitor, FaultPolicy, PlaybackController};
use crate::playlist::PlayableCollection;
use crate::types::{
    EntryView, Notice, PlayableEntry, PlayerDirective, PlayerEvent, ResponseData, SessionConfig,
    SessionMode,
};

use super::error::SessionError;
use super::timer::{CountdownTick, CountdownTimer, SleepModeGate};

// ============================================================================
// Events and Effects
// ============================================================================

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Append a link; the title falls back to the link
    AddEntry { url: String, title: Option<String> },
    /// Delete an entry (no-op if absent)
    RemoveEntry { id: String },
    /// Delete every entry
    ClearEntries,
    /// Manual select-and-play
    Play { id: String },
    /// Arm the countdown and make sure something plays
    StartCountdown { minutes: u32 },
    /// Cancel the countdown and stop playback
    CancelCountdown,
    ToggleMute,
    /// Leave sleep mode
    Wake,
    /// Callback from the external player
    Player(PlayerEvent),
    /// One second of countdown elapsed
    CountdownTick,
    /// Night-clock refresh
    ClockTick { clock: String },
    /// The delayed skip after a playback error is due
    AutoSkipDue,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// (Re)start the countdown ticker
    ArmCountdown,
    /// Stop the countdown ticker
    CancelCountdown,
    /// Fire [`SessionEvent::AutoSkipDue`] after the delay
    ScheduleAutoSkip(Duration),
    /// Drop a pending auto-skip
    CancelAutoSkip,
    /// Start the night-clock ticker
    StartClock,
    /// Stop the night-clock ticker
    StopClock,
    /// Write the playlist to the store
    Persist,
}

/// Outcome of one accepted event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Effects to apply, in order
    pub effects: Vec<Effect>,
    /// Id of the entry created by [`SessionEvent::AddEntry`]
    pub added: Option<String>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn with(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            added: None,
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns all session state and applies events to it.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SessionConfig,
    collection: PlayableCollection,
    playback: PlaybackController,
    countdown: CountdownTimer,
    faults: FaultMonitor,
    sleep: SleepModeGate,
    notice: Option<Notice>,
    skip_pending: bool,
}

impl Orchestrator {
    /// Creates an orchestrator over a loaded playlist. Nothing is selected.
    pub fn new(config: SessionConfig, entries: Vec<PlayableEntry>) -> Self {
        let faults = FaultMonitor::new(FaultPolicy::from_config(&config));
        Self {
            config,
            collection: PlayableCollection::from_entries(entries),
            playback: PlaybackController::new(),
            countdown: CountdownTimer::new(),
            faults,
            sleep: SleepModeGate::new(),
            notice: None,
            skip_pending: false,
        }
    }

    /// Applies one event.
    ///
    /// On `Err` nothing has changed.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        match event {
            SessionEvent::AddEntry { url, title } => self.add_entry(url, title),
            SessionEvent::RemoveEntry { id } => Ok(self.remove_entry(&id)),
            SessionEvent::ClearEntries => Ok(self.clear_entries()),
            SessionEvent::Play { id } => self.manual_play(&id),
            SessionEvent::StartCountdown { minutes } => self.request_start(minutes),
            SessionEvent::CancelCountdown => Ok(self.cancel_countdown()),
            SessionEvent::ToggleMute => {
                let muted = self.playback.toggle_mute();
                info!(muted, "Mute toggled");
                Ok(Transition::none())
            }
            SessionEvent::Wake => Ok(self.wake()),
            SessionEvent::Player(event) => Ok(self.on_player(event)),
            SessionEvent::CountdownTick => Ok(self.on_countdown_tick()),
            SessionEvent::ClockTick { clock } => {
                self.set_clock(clock);
                Ok(Transition::none())
            }
            SessionEvent::AutoSkipDue => Ok(self.on_auto_skip_due()),
        }
    }

    // ------------------------------------------------------------------------
    // Playlist
    // ------------------------------------------------------------------------

    fn add_entry(&mut self, url: String, title: Option<String>) -> Result<Transition, SessionError> {
        let url = url.trim().to_string();
        if url.is_empty() {
            return Err(SessionError::EmptyUrl);
        }
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.clone());

        let added = self.collection.add(url, title);
        info!(entry_id = %added.id, "Entry added");

        if added.was_first {
            if let Some(entry) = self.collection.get(&added.id) {
                self.playback.select(entry);
                debug!(entry_id = %added.id, "First entry selected");
            }
        }

        Ok(Transition {
            effects: vec![Effect::Persist],
            added: Some(added.id),
        })
    }

    fn remove_entry(&mut self, id: &str) -> Transition {
        if self.collection.remove(id).is_none() {
            debug!(entry_id = %id, "Remove of unknown entry ignored");
            return Transition::none();
        }
        info!(entry_id = %id, "Entry removed");

        let mut effects = vec![Effect::Persist];
        if self.playback.on_removed(id) {
            self.cancel_pending_skip(&mut effects);
            self.clear_transient_notice();
        }
        Transition::with(effects)
    }

    fn clear_entries(&mut self) -> Transition {
        self.collection.clear();
        self.playback.clear();
        self.faults.reset();
        self.notice = None;
        info!("Playlist cleared");

        let mut effects = vec![Effect::Persist];
        self.cancel_pending_skip(&mut effects);
        Transition::with(effects)
    }

    // ------------------------------------------------------------------------
    // Manual actions
    // ------------------------------------------------------------------------

    fn manual_play(&mut self, id: &str) -> Result<Transition, SessionError> {
        let entry = self
            .collection
            .get(id)
            .ok_or_else(|| SessionError::EntryNotFound(id.to_string()))?;
        self.playback.select_and_play(entry);
        info!(entry_id = %id, "Playing");

        let mut effects = Vec::new();
        self.reset_after_manual_action(&mut effects);
        if self.sleep.wake() {
            effects.push(Effect::StopClock);
        }
        Ok(Transition::with(effects))
    }

    /// Arms the countdown and makes sure something plays.
    ///
    /// With nothing selected and an empty playlist the arm is rolled back and
    /// the request fails.
    fn request_start(&mut self, minutes: u32) -> Result<Transition, SessionError> {
        let max = self.config.max_minutes;
        if minutes == 0 || minutes > max {
            return Err(SessionError::InvalidDuration { minutes, max });
        }

        let previous = self.countdown.state();
        self.countdown.start(minutes);

        if self.playback.selected_id().is_some() {
            self.playback.play();
        } else if let Some(first) = self.collection.first() {
            self.playback.select_and_play(first);
        } else {
            self.countdown.restore(previous);
            info!("Countdown rejected: nothing to play");
            return Err(SessionError::NothingToPlay);
        }

        let mut effects = vec![Effect::ArmCountdown];
        if self.sleep.wake() {
            effects.push(Effect::StopClock);
        }
        self.reset_after_manual_action(&mut effects);
        Ok(Transition::with(effects))
    }

    fn cancel_countdown(&mut self) -> Transition {
        self.countdown.cancel();
        self.playback.stop();

        let mut effects = vec![Effect::CancelCountdown];
        self.cancel_pending_skip(&mut effects);
        Transition::with(effects)
    }

    fn wake(&mut self) -> Transition {
        if self.sleep.wake() {
            Transition::with(vec![Effect::StopClock])
        } else {
            Transition::none()
        }
    }

    fn reset_after_manual_action(&mut self, effects: &mut Vec<Effect>) {
        self.faults.reset();
        self.notice = None;
        self.cancel_pending_skip(effects);
    }

    // ------------------------------------------------------------------------
    // Player callbacks
    // ------------------------------------------------------------------------

    fn on_player(&mut self, event: PlayerEvent) -> Transition {
        if self.playback.selected_id().is_none() {
            debug!(?event, "Player event with nothing selected ignored");
            return Transition::none();
        }

        match event {
            PlayerEvent::Started => {
                if self.faults.confirm_started() {
                    self.notice = None;
                } else {
                    self.clear_transient_notice();
                }
                if !self.sleep.is_sleeping() {
                    self.playback.set_playing(true);
                }
                Transition::none()
            }
            PlayerEvent::Paused => {
                self.playback.set_playing(false);
                Transition::none()
            }
            PlayerEvent::Resumed => {
                if !self.sleep.is_sleeping() {
                    self.playback.set_playing(true);
                }
                Transition::none()
            }
            PlayerEvent::Ended => {
                if self.faults.is_halted() {
                    debug!("Ended while halted ignored");
                    return Transition::none();
                }
                let mut effects = Vec::new();
                self.cancel_pending_skip(&mut effects);
                self.on_item_ended();
                Transition::with(effects)
            }
            PlayerEvent::Error { code } => self.on_playback_error(code),
        }
    }

    fn on_item_ended(&mut self) {
        if let Some(next) = self.playback.advance(&self.collection) {
            info!(entry_id = %next, "Advanced to next entry");
        }
        self.notice = None;
    }

    fn on_playback_error(&mut self, code: i32) -> Transition {
        if self.faults.is_halted() {
            debug!(code, "Playback error while halted ignored");
            return Transition::none();
        }

        let decision = self.faults.record_failure(code, self.collection.len());
        let mut effects = Vec::new();
        match decision {
            FaultDecision::SkipAfterDelay { .. } => {
                self.notice = Some(Notice::Skipping { code });
                self.skip_pending = true;
                effects.push(Effect::ScheduleAutoSkip(Duration::from_millis(
                    self.config.auto_skip_delay_ms,
                )));
            }
            FaultDecision::NotEmbeddable => {
                self.halt(Notice::NotEmbeddable { code }, &mut effects);
            }
            FaultDecision::Unplayable => {
                self.halt(Notice::PlaybackFailed { code }, &mut effects);
            }
            FaultDecision::TooManyErrors { failures, .. } => {
                self.halt(Notice::TooManyErrors { failures }, &mut effects);
            }
        }
        Transition::with(effects)
    }

    fn halt(&mut self, notice: Notice, effects: &mut Vec<Effect>) {
        self.playback.stop();
        self.notice = Some(notice);
        self.cancel_pending_skip(effects);
    }

    // ------------------------------------------------------------------------
    // Timer signals
    // ------------------------------------------------------------------------

    fn on_countdown_tick(&mut self) -> Transition {
        match self.countdown.tick() {
            CountdownTick::Idle | CountdownTick::Running { .. } => Transition::none(),
            CountdownTick::Expired => {
                self.playback.stop();
                self.sleep.enter();
                let mut effects = vec![Effect::CancelCountdown, Effect::StartClock];
                self.cancel_pending_skip(&mut effects);
                Transition::with(effects)
            }
        }
    }

    fn on_auto_skip_due(&mut self) -> Transition {
        if !self.skip_pending {
            debug!("Auto-skip with nothing pending ignored");
            return Transition::none();
        }
        self.skip_pending = false;
        self.on_item_ended();
        Transition::none()
    }

    fn cancel_pending_skip(&mut self, effects: &mut Vec<Effect>) {
        if self.skip_pending {
            self.skip_pending = false;
            effects.push(Effect::CancelAutoSkip);
            debug!("Pending auto-skip cancelled");
        }
    }

    fn clear_transient_notice(&mut self) {
        if self.notice.as_ref().is_some_and(|n| !n.is_persistent()) {
            self.notice = None;
        }
    }

    /// Refreshes the night clock. Ignored unless sleeping.
    pub fn set_clock(&mut self, clock: impl Into<String>) {
        self.sleep.set_clock(clock);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Observable mode.
    pub fn mode(&self) -> SessionMode {
        if self.sleep.is_sleeping() {
            SessionMode::Sleeping
        } else if self.playback.selected_id().is_none() {
            SessionMode::Idle
        } else if !self.playback.is_playing() {
            SessionMode::SelectedStopped
        } else if self.countdown.is_running() {
            SessionMode::CountingDown
        } else {
            SessionMode::SelectedPlaying
        }
    }

    /// What the external player should be doing.
    pub fn directive(&self) -> PlayerDirective {
        PlayerDirective {
            source_url: self.selected_entry().map(|e| e.source_url.clone()),
            should_play: self.playback.is_playing() && !self.sleep.is_sleeping(),
            muted: self.playback.is_muted(),
        }
    }

    /// Status snapshot for clients.
    pub fn status(&self) -> ResponseData {
        ResponseData {
            mode: Some(self.mode().as_str().to_string()),
            selected: self.selected_entry().cloned(),
            is_playing: Some(self.playback.is_playing()),
            is_muted: Some(self.playback.is_muted()),
            countdown: Some(self.countdown.state()),
            sleeping: Some(self.sleep.is_sleeping()),
            clock: self.sleep.clock().map(str::to_string),
            notice: self.notice.clone(),
            consecutive_failures: Some(self.faults.consecutive_failures()),
            ..Default::default()
        }
    }

    /// Playlist rows with the selection marked.
    pub fn entry_views(&self) -> Vec<EntryView> {
        let selected = self.playback.selected_id();
        self.collection
            .entries()
            .iter()
            .map(|entry| EntryView {
                entry: entry.clone(),
                selected: selected == Some(entry.id.as_str()),
            })
            .collect()
    }

    pub fn selected_entry(&self) -> Option<&PlayableEntry> {
        self.playback
            .selected_id()
            .and_then(|id| self.collection.get(id))
    }

    pub fn collection(&self) -> &PlayableCollection {
        &self.collection
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn countdown(&self) -> &CountdownTimer {
        &self.countdown
    }

    pub fn faults(&self) -> &FaultMonitor {
        &self.faults
    }

    pub fn sleep(&self) -> &SleepModeGate {
        &self.sleep
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Returns true while an auto-skip is scheduled.
    pub fn is_skip_pending(&self) -> bool {
        self.skip_pending
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

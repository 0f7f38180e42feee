//! Core data types for TubeSleep.
//!
//! This module defines the data structures used for:
//! - Playlist entries and the playback selection
//! - Countdown state for the sleep timer
//! - Session configuration with validation
//! - Observable session mode and user-facing notices
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};

// ============================================================================
// PlayableEntry
// ============================================================================

/// One playable item in the playlist.
///
/// Serialized as `{id, url, title, addedAt}`, which is also the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableEntry {
    /// Opaque unique identifier
    pub id: String,
    /// Link handed to the external player
    #[serde(rename = "url")]
    pub source_url: String,
    /// Human-readable title
    #[serde(rename = "title")]
    pub display_title: String,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(rename = "addedAt")]
    pub added_at: i64,
}

impl PlayableEntry {
    /// Creates an entry with a fresh id and the current timestamp.
    pub fn new(source_url: impl Into<String>, display_title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            source_url: source_url.into(),
            display_title: display_title.into(),
            added_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

// ============================================================================
// PlaybackSelection
// ============================================================================

/// What is targeted for playback and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSelection {
    /// Id of the selected entry, if any
    #[serde(rename = "selectedId", skip_serializing_if = "Option::is_none")]
    pub selected_id: Option<String>,
    /// Whether the selected entry should be playing
    #[serde(rename = "isPlaying")]
    pub is_playing: bool,
    /// Whether output is muted
    #[serde(rename = "isMuted")]
    pub is_muted: bool,
}

// ============================================================================
// CountdownState
// ============================================================================

/// State of the sleep countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    /// Seconds left before expiry
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u32,
    /// Seconds the current run started with (for progress display)
    #[serde(rename = "initialSeconds")]
    pub initial_seconds: u32,
    /// Whether the countdown is ticking
    #[serde(rename = "isRunning")]
    pub is_running: bool,
}

impl CountdownState {
    /// Arms the countdown for the given number of minutes.
    pub fn start(&mut self, minutes: u32) {
        self.remaining_seconds = minutes.saturating_mul(60);
        self.initial_seconds = self.remaining_seconds;
        self.is_running = self.remaining_seconds > 0;
    }

    /// Decrements the countdown by one second.
    ///
    /// Returns true exactly once per run: on the tick that reaches 0.
    /// Ticks while not running are ignored.
    pub fn tick(&mut self) -> bool {
        if !self.is_running {
            return false;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.is_running = false;
            return true;
        }
        false
    }

    /// Stops the countdown without expiring it.
    pub fn cancel(&mut self) {
        self.is_running = false;
        self.remaining_seconds = 0;
    }

    /// Fraction of the run already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.initial_seconds == 0 {
            return 0.0;
        }
        let elapsed = self.initial_seconds.saturating_sub(self.remaining_seconds);
        f64::from(elapsed) / f64::from(self.initial_seconds)
    }
}

/// Formats seconds as `H:MM:SS` (one hour or more) or `MM:SS`.
pub fn format_countdown(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Tunables for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fault budget grows by this much per playlist entry
    pub fault_budget_multiplier: u32,
    /// Fault budget never goes below this
    pub fault_budget_floor: u32,
    /// Delay before an automatic skip after a playback error
    pub auto_skip_delay_ms: u64,
    /// Player error codes meaning "embedding restricted by the owner"
    pub restriction_codes: Vec<i32>,
    /// Countdown length used when none is given
    pub default_minutes: u32,
    /// Longest countdown accepted
    pub max_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fault_budget_multiplier: 2,
            fault_budget_floor: 5,
            auto_skip_delay_ms: 1500,
            restriction_codes: vec![101, 150],
            default_minutes: 30,
            max_minutes: 720,
        }
    }
}

impl SessionConfig {
    /// Sets the auto-skip delay.
    pub fn with_auto_skip_delay_ms(mut self, delay_ms: u64) -> Self {
        self.auto_skip_delay_ms = delay_ms;
        self
    }

    /// Sets the fault budget constants.
    pub fn with_fault_budget(mut self, multiplier: u32, floor: u32) -> Self {
        self.fault_budget_multiplier = multiplier;
        self.fault_budget_floor = floor;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.fault_budget_floor < 1 {
            return Err("fault_budget_floor must be at least 1".to_string());
        }
        if self.auto_skip_delay_ms > 60_000 {
            return Err("auto_skip_delay_ms must be at most 60000".to_string());
        }
        if self.max_minutes < 1 {
            return Err("max_minutes must be at least 1".to_string());
        }
        if self.default_minutes < 1 || self.default_minutes > self.max_minutes {
            return Err(format!(
                "default_minutes must be within 1-{}",
                self.max_minutes
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SessionMode / Notice
// ============================================================================

/// Observable mode composed from selection, countdown and sleep state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Nothing selected
    Idle,
    /// Something selected, not playing
    SelectedStopped,
    /// Something selected and playing
    SelectedPlaying,
    /// Playing with the sleep countdown running
    CountingDown,
    /// Countdown expired; night clock shown
    Sleeping,
}

impl SessionMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Idle => "idle",
            SessionMode::SelectedStopped => "selected_stopped",
            SessionMode::SelectedPlaying => "selected_playing",
            SessionMode::CountingDown => "counting_down",
            SessionMode::Sleeping => "sleeping",
        }
    }
}

/// User-facing message produced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Current item failed; the next one follows shortly
    Skipping { code: i32 },
    /// The only item refuses embedded playback
    NotEmbeddable { code: i32 },
    /// The only item failed to play
    PlaybackFailed { code: i32 },
    /// The fault budget is exhausted
    TooManyErrors { failures: u32 },
}

impl Notice {
    /// Returns true if the notice stays until the user acts.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Notice::Skipping { .. })
    }

    /// Returns the message shown to the user.
    pub fn message(&self) -> String {
        match self {
            Notice::Skipping { code } => {
                format!("Playback failed (code {}), skipping to the next item...", code)
            }
            Notice::NotEmbeddable { code } => format!(
                "This video cannot be played here: its owner blocks embedded playback (code {})",
                code
            ),
            Notice::PlaybackFailed { code } => {
                format!("This video could not be played (code {})", code)
            }
            Notice::TooManyErrors { failures } => format!(
                "Stopped after {} consecutive playback errors; pick an item to try again",
                failures
            ),
        }
    }
}

// ============================================================================
// PlayerDirective
// ============================================================================

/// What the external player should be doing right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDirective {
    /// Link to load, if anything is selected
    #[serde(rename = "sourceUrl", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Whether to play (true) or hold paused (false)
    #[serde(rename = "shouldPlay")]
    pub should_play: bool,
    /// Whether output is muted
    pub muted: bool,
}

/// Callbacks reported by the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PlayerEvent {
    /// A clip is actually rendering
    Started,
    /// The current clip finished
    Ended,
    /// The user paused in the player itself
    Paused,
    /// The user resumed in the player itself
    Resumed,
    /// The player failed with an opaque code
    Error { code: i32 },
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Append an entry
    Add { url: String, title: Option<String> },
    /// Remove an entry by id
    Remove { id: String },
    /// Remove every entry
    Clear,
    /// List the playlist
    List,
    /// Select an entry and play it
    Play { id: String },
    /// Start the sleep countdown and make sure something plays
    Start { minutes: Option<u32> },
    /// Cancel the countdown and stop playback
    Cancel,
    /// Toggle mute
    Mute,
    /// Leave sleep mode
    Wake,
    /// Query the session status
    Status,
    /// Query what the player should be doing
    Directive,
    /// Report a player callback
    Player {
        #[serde(flatten)]
        event: PlayerEvent,
    },
}

/// Playlist row in a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    /// Entry data
    #[serde(flatten)]
    pub entry: PlayableEntry,
    /// Whether this is the current selection
    pub selected: bool,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Observable mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Id of a newly added entry
    #[serde(rename = "entryId", skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Selected entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<PlayableEntry>,
    /// Whether playback is on
    #[serde(rename = "isPlaying", skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    /// Whether output is muted
    #[serde(rename = "isMuted", skip_serializing_if = "Option::is_none")]
    pub is_muted: Option<bool>,
    /// Countdown snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<CountdownState>,
    /// Whether sleep mode is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeping: Option<bool>,
    /// Night clock text, while sleeping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    /// Current notice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    /// Consecutive playback failures
    #[serde(rename = "consecutiveFailures", skip_serializing_if = "Option::is_none")]
    pub consecutive_failures: Option<u32>,
    /// Playlist rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryView>>,
    /// Player directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<PlayerDirective>,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for a success response.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================

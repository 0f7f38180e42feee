//! Selection and play/pause state.
//!
//! The controller references entries by id only; the playlist owns them.

use tracing::debug;

use crate::playlist::PlayableCollection;
use crate::types::{PlayableEntry, PlaybackSelection};

/// Owns "what is selected" and "is it playing".
#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    selection: PlaybackSelection,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `entry` and starts playing it.
    pub fn select_and_play(&mut self, entry: &PlayableEntry) {
        self.selection.selected_id = Some(entry.id.clone());
        self.selection.is_playing = true;
    }

    /// Selects `entry` without touching the play state.
    pub fn select(&mut self, entry: &PlayableEntry) {
        self.selection.selected_id = Some(entry.id.clone());
    }

    /// Plays the current selection. Returns false if nothing is selected.
    pub fn play(&mut self) -> bool {
        if self.selection.selected_id.is_none() {
            return false;
        }
        self.selection.is_playing = true;
        true
    }

    /// Stops playback, keeping the selection.
    pub fn stop(&mut self) {
        self.selection.is_playing = false;
    }

    /// Flips mute and returns the new value.
    pub fn toggle_mute(&mut self) -> bool {
        self.selection.is_muted = !self.selection.is_muted;
        self.selection.is_muted
    }

    /// Moves the selection to the entry after the current one.
    ///
    /// Wraps to the first entry from the last one, or when the current
    /// selection is no longer in the collection. On an empty collection the
    /// selection is cleared and playback stops. Returns the new selection.
    pub fn advance(&mut self, collection: &PlayableCollection) -> Option<&str> {
        let next = self
            .selection
            .selected_id
            .as_deref()
            .and_then(|id| collection.index_of(id))
            .and_then(|index| collection.at(index + 1))
            .or_else(|| collection.first());

        match next {
            Some(entry) => {
                debug!(entry_id = %entry.id, "Advancing selection");
                self.selection.selected_id = Some(entry.id.clone());
            }
            None => {
                self.selection.selected_id = None;
                self.selection.is_playing = false;
            }
        }
        self.selection.selected_id.as_deref()
    }

    /// Drops the selection if it pointed at the removed entry.
    ///
    /// Returns true if the selection was cleared.
    pub fn on_removed(&mut self, id: &str) -> bool {
        if self.selection.selected_id.as_deref() != Some(id) {
            return false;
        }
        self.clear();
        true
    }

    /// Clears the selection and stops playback. Mute is kept.
    pub fn clear(&mut self) {
        self.selection.selected_id = None;
        self.selection.is_playing = false;
    }

    /// Sets the play flag as reported by the player. Ignored without a selection.
    pub fn set_playing(&mut self, playing: bool) {
        if self.selection.selected_id.is_some() {
            self.selection.is_playing = playing;
        }
    }

    pub fn selection(&self) -> &PlaybackSelection {
        &self.selection
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.selected_id.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.selection.is_playing
    }

    pub fn is_muted(&self) -> bool {
        self.selection.is_muted
    }
}

// ============================================================================
// Tests
// ============================================================================

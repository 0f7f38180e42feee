//! Ordered playlist storage.
//!
//! Insertion order is playback order. Persistence lives in [`store`]; the
//! collection itself is a plain in-memory sequence.

mod error;
mod store;

pub use error::StoreError;
pub use store::{JsonPlaylistStore, MockPlaylistStore, PlaylistStore};

use crate::types::PlayableEntry;

/// Result of [`PlayableCollection::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    /// Id of the new entry
    pub id: String,
    /// True when the collection was empty before the add
    pub was_first: bool,
}

/// Ordered sequence of playlist entries with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayableCollection {
    entries: Vec<PlayableEntry>,
}

impl PlayableCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from loaded entries, dropping duplicate ids.
    pub fn from_entries(entries: Vec<PlayableEntry>) -> Self {
        let mut collection = Self::new();
        for entry in entries {
            if collection.index_of(&entry.id).is_some() {
                tracing::warn!(entry_id = %entry.id, "Dropping duplicate playlist entry");
                continue;
            }
            collection.entries.push(entry);
        }
        collection
    }

    /// Appends a new entry and returns its id.
    pub fn add(&mut self, url: impl Into<String>, title: impl Into<String>) -> Added {
        let was_first = self.entries.is_empty();
        let entry = PlayableEntry::new(url, title);
        let id = entry.id.clone();
        self.entries.push(entry);
        Added { id, was_first }
    }

    /// Removes an entry. Returns the removed entry, or `None` if absent.
    pub fn remove(&mut self, id: &str) -> Option<PlayableEntry> {
        let index = self.index_of(id)?;
        Some(self.entries.remove(index))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&PlayableEntry> {
        self.entries.get(index)
    }

    pub fn first(&self) -> Option<&PlayableEntry> {
        self.entries.first()
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: &str) -> Option<&PlayableEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in playback order.
    pub fn entries(&self) -> &[PlayableEntry] {
        &self.entries
    }
}

// ============================================================================
// Tests
// ============================================================================

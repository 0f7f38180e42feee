//! Playlist persistence.
//!
//! The playlist is stored as a flat JSON array of `{id, url, title, addedAt}`
//! objects and rewritten in full after every mutation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::error::StoreError;
use crate::types::PlayableEntry;

/// Loads and saves the ordered playlist.
pub trait PlaylistStore: Send + Sync {
    /// Loads the saved playlist. A store that was never written yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored data cannot be read or parsed.
    fn load(&self) -> Result<Vec<PlayableEntry>, StoreError>;

    /// Replaces the saved playlist with `entries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be written.
    fn save(&self, entries: &[PlayableEntry]) -> Result<(), StoreError>;
}

// ============================================================================
// JsonPlaylistStore
// ============================================================================

/// Playlist store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonPlaylistStore {
    path: PathBuf,
}

impl JsonPlaylistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlaylistStore for JsonPlaylistStore {
    fn load(&self) -> Result<Vec<PlayableEntry>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved playlist, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let entries: Vec<PlayableEntry> = serde_json::from_slice(&bytes)?;
        debug!(count = entries.len(), "Loaded playlist");
        Ok(entries)
    }

    fn save(&self, entries: &[PlayableEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        // Sibling temp file, then rename into place
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(entries)?;
        std::fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        debug!(count = entries.len(), "Saved playlist");
        Ok(())
    }
}

// ============================================================================
// MockPlaylistStore
// ============================================================================

/// In-memory store for testing.
#[derive(Debug, Default)]
pub struct MockPlaylistStore {
    saved: Mutex<Vec<PlayableEntry>>,
    save_count: Mutex<usize>,
    should_fail: std::sync::atomic::AtomicBool,
}

impl MockPlaylistStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<PlayableEntry>) -> Self {
        Self {
            saved: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail
            .store(should_fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap()
    }

    #[must_use]
    pub fn saved(&self) -> Vec<PlayableEntry> {
        self.saved.lock().unwrap().clone()
    }
}

impl PlaylistStore for MockPlaylistStore {
    fn load(&self) -> Result<Vec<PlayableEntry>, StoreError> {
        Ok(self.saved.lock().unwrap().clone())
    }

    fn save(&self, entries: &[PlayableEntry]) -> Result<(), StoreError> {
        if self.should_fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::io(
                Path::new("mock"),
                std::io::Error::new(std::io::ErrorKind::Other, "mock failure"),
            ));
        }
        *self.saved.lock().unwrap() = entries.to_vec();
        *self.save_count.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

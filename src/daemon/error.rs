//! Session error types.
//!
//! These are rejected user requests. None of them changes session state, and
//! the IPC layer turns each into an error response; the daemon keeps running.

use thiserror::Error;

/// Reasons the orchestrator rejects a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Countdown requested with an empty playlist.
    #[error("Nothing to play: add something to the playlist before starting the timer")]
    NothingToPlay,

    /// No entry with the given id.
    #[error("No playlist entry with id '{0}'")]
    EntryNotFound(String),

    /// Add requested with a blank link.
    #[error("The link must not be empty")]
    EmptyUrl,

    /// Countdown length outside `1..=max`.
    #[error("Countdown must be between 1 and {max} minutes (got {minutes})")]
    InvalidDuration { minutes: u32, max: u32 },
}

impl SessionError {
    /// Returns true if the request referenced something that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_))
    }
}

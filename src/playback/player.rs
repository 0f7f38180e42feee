//! Outbound side of the external player.
//!
//! The daemon pushes a [`PlayerDirective`] to a [`PlayerSink`] whenever it
//! changes. Player callbacks come back in through IPC as
//! [`crate::types::PlayerEvent`]s.

use std::sync::Mutex;

use tracing::info;

use crate::types::PlayerDirective;

/// Receives player directives.
pub trait PlayerSink: Send + Sync {
    /// Applies a new directive. Called only when the directive changed.
    fn apply(&self, directive: &PlayerDirective);
}

/// Sink that records directives in the log; players poll `directive` over IPC.
#[derive(Debug, Default)]
pub struct TracingPlayerSink;

impl PlayerSink for TracingPlayerSink {
    fn apply(&self, directive: &PlayerDirective) {
        info!(
            url = directive.source_url.as_deref().unwrap_or("-"),
            play = directive.should_play,
            muted = directive.muted,
            "Player directive"
        );
    }
}

/// Mock sink for testing.
#[derive(Debug, Default)]
pub struct MockPlayerSink {
    applied: Mutex<Vec<PlayerDirective>>,
}

impl MockPlayerSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn apply_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    #[must_use]
    pub fn last(&self) -> Option<PlayerDirective> {
        self.applied.lock().unwrap().last().cloned()
    }

    #[must_use]
    pub fn history(&self) -> Vec<PlayerDirective> {
        self.applied.lock().unwrap().clone()
    }
}

impl PlayerSink for MockPlayerSink {
    fn apply(&self, directive: &PlayerDirective) {
        self.applied.lock().unwrap().push(directive.clone());
    }
}

//! TubeSleep Library
//!
//! This library provides the core functionality for the TubeSleep CLI.
//! It includes:
//! - Playlist collection and its JSON persistence
//! - Playback selection and the playback fault policy
//! - Sleep countdown, night clock and the session orchestrator
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Title lookup and music suggestions over HTTP

pub mod cli;
pub mod config;
pub mod daemon;
pub mod lookup;
pub mod playback;
pub mod playlist;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{load_config, AppPaths};
pub use daemon::{Effect, Orchestrator, SessionDriver, SessionError, SessionEvent, Transition};
pub use playlist::PlayableCollection;
pub use types::{
    IpcRequest, IpcResponse, Notice, PlayableEntry, PlaybackSelection, PlayerDirective,
    PlayerEvent, ResponseData, SessionConfig, SessionMode,
};

//! Playback state for TubeSleep.
//!
//! - `controller`: selection, play/pause, mute, wrap-around advance
//! - `fault`: consecutive failure budget and error classification
//! - `player`: directive sink towards the external player

pub mod controller;
pub mod fault;
pub mod player;

pub use controller::PlaybackController;
pub use fault::{FaultDecision, FaultMonitor, FaultPolicy, PlaybackErrorKind};
pub use player::{MockPlayerSink, PlayerSink, TracingPlayerSink};

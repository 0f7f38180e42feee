//! Advisory collaborators: link titles and music suggestions.
//!
//! Neither is part of the session state machine; both are called from the
//! CLI before a request reaches the daemon.

mod error;
pub mod suggest;
pub mod title;

pub use error::LookupError;
pub use suggest::{
    extract_suggestions, suggest_and_pick, GeminiSuggestions, MockSuggestionProvider, Suggestion,
    SuggestionProvider,
};
pub use title::{is_youtube_link, NoembedTitleLookup};

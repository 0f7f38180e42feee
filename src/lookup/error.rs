//! Lookup error types.

use thiserror::Error;

/// Errors from the title and suggestion collaborators.
///
/// None of these is fatal: title lookups fall back to the raw link and
/// suggestion failures are reported to the user.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No API key configured for the suggestion service.
    #[error("Suggestions are unavailable: set GEMINI_API_KEY (or API_KEY) to enable them")]
    MissingCredentials,

    /// Transport or HTTP status failure.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something unusable.
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// `--add N` pointed past the returned candidates.
    #[error("There is no suggestion #{index} ({count} returned)")]
    NoSuchSuggestion { index: usize, count: usize },
}

impl LookupError {
    /// Returns true if the feature is disabled rather than broken.
    #[must_use]
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert!(LookupError::MissingCredentials
            .to_string()
            .contains("GEMINI_API_KEY"));
        assert_eq!(
            LookupError::NoSuchSuggestion { index: 7, count: 5 }.to_string(),
            "There is no suggestion #7 (5 returned)"
        );
    }

    #[test]
    fn test_is_missing_credentials() {
        assert!(LookupError::MissingCredentials.is_missing_credentials());
        assert!(!LookupError::InvalidResponse("x".to_string()).is_missing_credentials());
    }
}

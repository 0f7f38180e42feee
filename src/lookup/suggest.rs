//! Music suggestions from the Gemini API.
//!
//! The model is asked for YouTube links and told to answer with a bare JSON
//! array of `{title, url}`. The first `[` .. last `]` span of the reply is
//! parsed; anything else in the text is ignored.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::error::LookupError;

/// Model used for suggestions.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Most candidates returned per query.
pub const MAX_SUGGESTIONS: usize = 5;

const REQUEST_TIMEOUT_SECS: u64 = 30;

const SYSTEM_INSTRUCTION: &str = "You are a music assistant. When asked for music, find actual \
YouTube video links. Return the response strictly as a JSON array of objects with 'title' and \
'url' properties. Do not add markdown formatting.";

/// One suggested link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    title: Option<String>,
    url: Option<String>,
}

/// Pulls suggestions out of free model text.
///
/// No array in the text means no results. Entries without a link are dropped,
/// a missing title falls back to the link, and at most
/// [`MAX_SUGGESTIONS`] are kept.
pub fn extract_suggestions(text: &str) -> Result<Vec<Suggestion>, LookupError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Ok(Vec::new());
    };
    if end < start {
        return Ok(Vec::new());
    }

    let raw: Vec<RawSuggestion> = serde_json::from_str(&text[start..=end])
        .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

    Ok(raw
        .into_iter()
        .filter_map(|item| {
            let url = item.url?.trim().to_string();
            if url.is_empty() {
                return None;
            }
            let title = item
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| url.clone());
            Some(Suggestion { title, url })
        })
        .take(MAX_SUGGESTIONS)
        .collect())
}

// ============================================================================
// SuggestionProvider
// ============================================================================

/// Source of suggestions for a free-text query.
#[allow(async_fn_in_trait)]
pub trait SuggestionProvider {
    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, LookupError>;
}

/// Asks `provider` and optionally picks the 1-based `pick`-th candidate.
pub async fn suggest_and_pick<P: SuggestionProvider>(
    provider: &P,
    query: &str,
    pick: Option<usize>,
) -> Result<(Vec<Suggestion>, Option<Suggestion>), LookupError> {
    let suggestions = provider.suggest(query).await?;
    let picked = match pick {
        None => None,
        Some(index) => {
            let chosen = index
                .checked_sub(1)
                .and_then(|i| suggestions.get(i))
                .cloned()
                .ok_or(LookupError::NoSuchSuggestion {
                    index,
                    count: suggestions.len(),
                })?;
            Some(chosen)
        }
    };
    Ok((suggestions, picked))
}

// ============================================================================
// GeminiSuggestions
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

/// Gemini `generateContent` client with Google Search grounding.
pub struct GeminiSuggestions {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiSuggestions {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: GEMINI_MODEL.to_string(),
        })
    }

    /// Builds a client from `GEMINI_API_KEY` or `API_KEY`.
    pub fn from_env() -> Result<Self, LookupError> {
        let key = API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or(LookupError::MissingCredentials)?;
        Self::new(key)
    }

    fn request_body(query: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{
                    "text": format!(
                        "Find {} distinct YouTube video links for the following music request: \"{}\". \
                         Return only valid YouTube URLs and their titles.",
                        MAX_SUGGESTIONS, query
                    )
                }]
            }],
            "tools": [{ "google_search": {} }],
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] }
        })
    }
}

impl SuggestionProvider for GeminiSuggestions {
    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, LookupError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        debug!(model = %self.model, "Requesting suggestions");

        let reply: GenerateResponse = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(query))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let suggestions = extract_suggestions(&reply.text())?;
        info!(count = suggestions.len(), "Suggestions received");
        Ok(suggestions)
    }
}

// ============================================================================
// MockSuggestionProvider
// ============================================================================

/// Mock provider for testing.
#[derive(Debug, Default)]
pub struct MockSuggestionProvider {
    results: Vec<Suggestion>,
    fail_with_missing_key: bool,
    queries: Mutex<Vec<String>>,
}

impl MockSuggestionProvider {
    #[must_use]
    pub fn new(results: Vec<Suggestion>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    /// A provider that behaves as if no key were configured.
    #[must_use]
    pub fn without_credentials() -> Self {
        Self {
            fail_with_missing_key: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl SuggestionProvider for MockSuggestionProvider {
    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, LookupError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail_with_missing_key {
            return Err(LookupError::MissingCredentials);
        }
        Ok(self.results.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Best-effort title lookup for YouTube links via noembed.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::error::LookupError;

/// oEmbed proxy used for title lookups.
pub const NOEMBED_ENDPOINT: &str = "https://noembed.com/embed";

const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Returns true for `youtube.com/...` and `youtu.be/...` links, with or
/// without scheme and `www.`.
pub fn is_youtube_link(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    ["youtube.com/", "youtu.be/"].iter().any(|host| {
        rest.strip_prefix(host)
            .is_some_and(|path| !path.is_empty())
    })
}

#[derive(Debug, Deserialize)]
struct NoembedResponse {
    title: Option<String>,
    error: Option<String>,
}

/// Extracts the title from a noembed reply.
fn parse_noembed(body: &str) -> Result<String, LookupError> {
    let reply: NoembedResponse =
        serde_json::from_str(body).map_err(|e| LookupError::InvalidResponse(e.to_string()))?;
    if let Some(error) = reply.error {
        return Err(LookupError::InvalidResponse(error));
    }
    reply
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LookupError::InvalidResponse("no title".to_string()))
}

/// Title lookup client.
pub struct NoembedTitleLookup {
    http_client: reqwest::Client,
    endpoint: String,
}

impl NoembedTitleLookup {
    pub fn new() -> Result<Self, LookupError> {
        Self::with_endpoint(NOEMBED_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    /// Fetches the title for `url`.
    pub async fn fetch_title(&self, url: &str) -> Result<String, LookupError> {
        let body = self
            .http_client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_noembed(&body)
    }

    /// Returns a display title for `url`, falling back to the link itself.
    ///
    /// Only YouTube links are looked up. Failures are logged and swallowed.
    pub async fn resolve_title(&self, url: &str) -> String {
        if !is_youtube_link(url) {
            return url.to_string();
        }
        match self.fetch_title(url).await {
            Ok(title) => title,
            Err(e) => {
                debug!(url, error = %e, "Title lookup failed, using link");
                url.to_string()
            }
        }
    }
}

//! Turn a scoring response into structured feedback.
//!
//! The service may answer with a bare string or with a list of content
//! parts; only the first part carries the answer. Models sometimes wrap the
//! JSON in a ```json fence despite being told not to, so a single outer
//! fence is stripped before parsing. Anything else that is not a feedback
//! object is a parse failure.

use crate::record::StructuredFeedback;
use crate::services::{MessageContent, ScoringResponse};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// The answer text: the string itself, or the first part's text.
pub fn extract_text(response: &ScoringResponse) -> Option<&str> {
    match &response.message.content {
        MessageContent::Text(text) => Some(text),
        MessageContent::Parts(parts) => parts.first().map(|p| p.text.as_str()),
    }
}

/// Parse answer text as a feedback object.
pub fn parse_feedback(text: &str) -> Result<StructuredFeedback, serde_json::Error> {
    serde_json::from_str(strip_outer_fence(text))
}

fn strip_outer_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

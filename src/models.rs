//! Data models flowing through the recommendation pipeline.
//!
//! - [`Topic`]: normalized user interest driving the search
//! - [`RawArticle`]: an article record as returned by the news search API
//! - [`PipelineRequest`]: one inbound recommendation request
//! - [`Recommendation`]: one ranked, summarized article
//! - [`PipelineResult`]: the uniform success/failure value handed to callers
//!
//! Everything here lives for exactly one request; nothing is persisted.

use crate::error::TopicError;
use chrono::NaiveDateTime;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language passed to the news search API when the caller does not pick one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Number of recommendations a request asks for.
pub const RESULT_COUNT: usize = 3;

/// Keywords beyond this many are kept in the topic but left out of the query.
const MAX_QUERY_KEYWORDS: usize = 3;

static INTEREST_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"i['’]?m interested in").expect("valid interest prefix regex"));
static AND_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\band\b").expect("valid separator regex"));

/// A normalized, non-empty user topic.
///
/// Free text such as `"I'm interested in AI and Climate Change"` is lowered,
/// stripped of the leading phrase and split on commas and the word `and`
/// into the keywords `["ai", "climate change"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    keywords: Vec<String>,
}

impl Topic {
    /// Normalize raw user text into a topic.
    ///
    /// # Errors
    ///
    /// [`TopicError::Empty`] when no keyword survives normalization.
    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        let lowered = raw.trim().to_lowercase();
        let without_prefix = INTEREST_PREFIX.replace_all(&lowered, "");
        let separated = AND_SEPARATOR.replace_all(&without_prefix, ",");

        let keywords: Vec<String> = separated
            .split(',')
            .map(|kw| kw.split_whitespace().join(" "))
            .filter(|kw| !kw.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(TopicError::Empty);
        }
        Ok(Self { keywords })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Search string sent to the news API.
    pub fn query(&self) -> String {
        self.keywords.iter().take(MAX_QUERY_KEYWORDS).join(" ")
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keywords.iter().join(", "))
    }
}

/// An article as produced by the Article Source Client. Read-only downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    /// Plain-text snippet; may be empty.
    pub description: String,
    /// Canonical article URL; the identity used when validating model output.
    pub link: String,
    /// Publisher identifier as reported by the API (e.g. `"bbc"`).
    pub source_id: Option<String>,
    pub published: Option<NaiveDateTime>,
}

/// One recommendation request. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    topic: String,
    language: String,
    result_count: usize,
}

impl PipelineRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            result_count: RESULT_COUNT,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// The topic exactly as the user typed it.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn result_count(&self) -> usize {
        self.result_count
    }
}

/// One ranked, summarized article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1-based position, most relevant first.
    pub rank: usize,
    pub title: String,
    pub summary: String,
    /// Why this article matches the topic.
    pub rationale: String,
    /// Always one of the links of the articles the model was shown.
    pub url: String,
}

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    UpstreamUnavailable,
    UpstreamUnauthorized,
    NoArticlesFound,
    MalformedModelOutput,
}

impl FailureKind {
    /// Message shown to end users for this kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "Please enter a topic.",
            FailureKind::UpstreamUnavailable => {
                "A news or model service is unavailable right now. Please try again shortly."
            }
            FailureKind::UpstreamUnauthorized => {
                "A news or model service rejected our credentials. Check NEWS_API_KEY and GOOGLE_API_KEY."
            }
            FailureKind::NoArticlesFound => "No recent articles found matching your interests.",
            FailureKind::MalformedModelOutput => {
                "The ranking model returned recommendations we could not verify. Please try again."
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::UpstreamUnavailable => "upstream_unavailable",
            FailureKind::UpstreamUnauthorized => "upstream_unauthorized",
            FailureKind::NoArticlesFound => "no_articles_found",
            FailureKind::MalformedModelOutput => "malformed_model_output",
        };
        f.write_str(name)
    }
}

/// Outcome of one pipeline run: a complete validated set, or a typed error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Success {
        recommendations: Vec<Recommendation>,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl PipelineResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        PipelineResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PipelineResult::Success { .. } => None,
            PipelineResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Body of the liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_simple() {
        let topic = Topic::parse("  Technology ").unwrap();
        assert_eq!(topic.keywords(), &["technology".to_string()]);
        assert_eq!(topic.to_string(), "technology");
        assert_eq!(topic.query(), "technology");
    }

    #[test]
    fn test_topic_interest_phrase_and_separators() {
        let topic = Topic::parse("I'm interested in AI and Climate   Change, space").unwrap();
        assert_eq!(topic.keywords(), &["ai", "climate change", "space"]);
        assert_eq!(topic.to_string(), "ai, climate change, space");
        assert_eq!(topic.query(), "ai climate change space");
    }

    #[test]
    fn test_topic_and_inside_word_is_kept() {
        let topic = Topic::parse("Android and Brands").unwrap();
        assert_eq!(topic.keywords(), &["android", "brands"]);
    }

    #[test]
    fn test_topic_query_uses_first_three_keywords() {
        let topic = Topic::parse("a1, b2, c3, d4").unwrap();
        assert_eq!(topic.keywords().len(), 4);
        assert_eq!(topic.query(), "a1 b2 c3");
    }

    #[test]
    fn test_topic_empty_inputs() {
        for raw in ["", "   ", "\t\n", ",,", "and", "I'm interested in"] {
            assert_eq!(Topic::parse(raw), Err(TopicError::Empty), "input {raw:?}");
        }
    }

    #[test]
    fn test_topic_normalization_is_case_insensitive() {
        assert_eq!(Topic::parse("STOCKS").unwrap(), Topic::parse("stocks").unwrap());
    }

    #[test]
    fn test_pipeline_request_defaults() {
        let request = PipelineRequest::new("technology");
        assert_eq!(request.topic(), "technology");
        assert_eq!(request.language(), "en");
        assert_eq!(request.result_count(), 3);

        let request = request.with_language("fr");
        assert_eq!(request.language(), "fr");
    }

    #[test]
    fn test_pipeline_result_serialization() {
        let success = PipelineResult::Success {
            recommendations: vec![Recommendation {
                rank: 1,
                title: "AI breakthroughs in 2024".to_string(),
                summary: "Summary".to_string(),
                rationale: "Rationale".to_string(),
                url: "https://example.com/a1".to_string(),
            }],
        };
        let json = serde_json::to_string(&success).unwrap();
        assert!(json.contains(r#""status":"success""#));
        assert!(json.contains("https://example.com/a1"));

        let failure = PipelineResult::failure(FailureKind::NoArticlesFound, "no articles found");
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains(r#""status":"failure""#));
        assert!(json.contains(r#""kind":"no_articles_found""#));
    }

    #[test]
    fn test_pipeline_result_accessors() {
        let failure = PipelineResult::failure(FailureKind::InvalidInput, "topic is empty");
        assert!(!failure.is_success());
        assert_eq!(failure.failure_kind(), Some(FailureKind::InvalidInput));

        let success = PipelineResult::Success {
            recommendations: vec![],
        };
        assert!(success.is_success());
        assert_eq!(success.failure_kind(), None);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::UpstreamUnauthorized.to_string(), "upstream_unauthorized");
        assert!(!FailureKind::NoArticlesFound.user_message().is_empty());
    }
}

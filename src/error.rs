//! Typed failures for each pipeline stage.
//!
//! Every stage owns a small closed error enum. The orchestrator folds each of
//! them into exactly one [`FailureKind`] so the caller only ever sees the
//! five-way taxonomy, never a stage-specific type.

use crate::models::FailureKind;
use thiserror::Error;

/// The topic could not be turned into a searchable query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic is empty")]
    Empty,
}

/// Failures of the Article Source Client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Missing or rejected news API credential.
    #[error("news API rejected the credential: {0}")]
    Unauthorized(String),

    #[error("news API rate limit exceeded")]
    RateLimited,

    /// The query succeeded but yielded no usable articles.
    #[error("no articles found")]
    NoResults,

    /// Connection failure or timeout.
    #[error("news API unreachable: {0}")]
    Network(String),

    #[error("unexpected news API failure: {0}")]
    Unexpected(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Unauthorized(_) => FailureKind::UpstreamUnauthorized,
            FetchError::NoResults => FailureKind::NoArticlesFound,
            FetchError::RateLimited | FetchError::Network(_) | FetchError::Unexpected(_) => {
                FailureKind::UpstreamUnavailable
            }
        }
    }
}

/// Failures of the Ranking/Summarization Client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model API rejected the credential: {0}")]
    Unauthorized(String),

    #[error("model API rate limit exceeded")]
    RateLimited,

    #[error("model API timed out")]
    Timeout,

    /// The request itself was refused (unknown model, invalid argument).
    /// Sending it again cannot succeed.
    #[error("model API rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected model API failure: {0}")]
    Unexpected(String),
}

impl ModelError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ModelError::Unauthorized(_) => FailureKind::UpstreamUnauthorized,
            ModelError::RateLimited
            | ModelError::Timeout
            | ModelError::Rejected(_)
            | ModelError::Unexpected(_) => FailureKind::UpstreamUnavailable,
        }
    }

    /// Whether a fresh attempt has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited | ModelError::Timeout | ModelError::Unexpected(_)
        )
    }
}

/// Failures of the Response Parser & Validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The block layout is missing or violated.
    #[error("malformed model output: {0}")]
    MalformedLayout(String),

    /// Every block referenced a URL outside the supplied articles.
    #[error("no recommendation survived source validation")]
    EmptyAfterValidation,
}

impl ParseError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::MalformedModelOutput
    }
}

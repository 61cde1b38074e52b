//! Article sources feeding the pipeline.
//!
//! A source turns a [`Topic`] into a bounded list of [`RawArticle`]s with a
//! single outbound query. Sources never retry; any failure is terminal for
//! the current request and reported as a [`FetchError`].
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | NewsData.io | [`newsdata`] | `GET /api/1/news` | Requires `NEWS_API_KEY` |

use crate::error::FetchError;
use crate::models::{RawArticle, Topic};

pub mod newsdata;

/// Something that can look up recent articles for a topic.
pub trait ArticleSource {
    /// Fetch at most the source's configured cap of articles for `topic`.
    ///
    /// # Errors
    ///
    /// [`FetchError::NoResults`] when nothing usable comes back; the other
    /// variants for credential, quota and transport failures.
    async fn fetch(&self, topic: &Topic, language: &str) -> Result<Vec<RawArticle>, FetchError>;
}

impl<T: ArticleSource> ArticleSource for &T {
    async fn fetch(&self, topic: &Topic, language: &str) -> Result<Vec<RawArticle>, FetchError> {
        (**self).fetch(topic, language).await
    }
}

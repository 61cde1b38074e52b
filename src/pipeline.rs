//! The fetch → prompt → rank → parse pipeline.
//!
//! [`Pipeline::run`] always returns a [`PipelineResult`]: every stage error
//! is folded into its [`FailureKind`] and nothing is raised to the caller.
//! The two outbound calls are strictly sequential, and dropping the future
//! returned by `run` abandons whichever call is in flight.

use crate::api::{GeminiClient, RankModel, RetryRank};
use crate::config::PipelineConfig;
use crate::error::{FetchError, ModelError, ParseError};
use crate::models::{FailureKind, PipelineRequest, PipelineResult, Topic};
use crate::parser;
use crate::prompt;
use crate::sources::ArticleSource;
use crate::sources::newsdata::NewsDataClient;
use crate::utils::truncate_for_log;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// The production pipeline: NewsData.io articles ranked by Gemini.
pub type DefaultPipeline = Pipeline<NewsDataClient, RetryRank<GeminiClient>>;

/// Sequences one request through the article source and the ranking model.
#[derive(Debug)]
pub struct Pipeline<S, M> {
    source: S,
    model: M,
    max_articles: usize,
}

impl DefaultPipeline {
    /// Wire up the HTTP clients described by `config`.
    ///
    /// Both clients share one connection pool. Missing credentials do not
    /// fail here; they surface per request as
    /// [`FailureKind::UpstreamUnauthorized`].
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = PipelineConfig::new(news_key, google_key);
    /// let pipeline = DefaultPipeline::from_config(&config)?;
    /// ```
    pub fn from_config(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("awful_topic_news/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let source = NewsDataClient::new(http.clone(), config);
        let model = RetryRank::new(
            GeminiClient::new(http, config),
            config.model_retries,
            config.retry_base_delay,
        );
        Ok(Pipeline::new(source, model, config.max_articles))
    }
}

impl<S, M> Pipeline<S, M>
where
    S: ArticleSource,
    M: RankModel,
{
    pub fn new(source: S, model: M, max_articles: usize) -> Self {
        Self {
            source,
            model,
            max_articles: max_articles.max(1),
        }
    }

    /// Recommend articles for a raw topic with the default language.
    pub async fn recommend(&self, topic: &str) -> PipelineResult {
        self.run(&PipelineRequest::new(topic)).await
    }

    /// Run one request to completion.
    ///
    /// Normalizes the topic, fetches articles, keeps the first
    /// `max_articles`, asks the model to rank them and validates its answer
    /// against the fetched links.
    ///
    /// # Arguments
    ///
    /// * `request` - Raw topic, search language and result count
    ///
    /// # Returns
    ///
    /// [`PipelineResult::Success`] with one to `request.result_count()`
    /// recommendations, or [`PipelineResult::Failure`] naming the first stage
    /// that failed. An empty topic fails before any network call, and the
    /// model is never called when no article was fetched.
    #[instrument(level = "info", skip_all, fields(topic = %request.topic(), language = %request.language()))]
    pub async fn run(&self, request: &PipelineRequest) -> PipelineResult {
        let t0 = Instant::now();

        let topic = match Topic::parse(request.topic()) {
            Ok(topic) => topic,
            Err(e) => {
                warn!(error = %e, "Rejected topic");
                return PipelineResult::failure(FailureKind::InvalidInput, e.to_string());
            }
        };
        info!(%topic, query = %topic.query(), "Normalized topic");

        let mut articles = match self.source.fetch(&topic, request.language()).await {
            Ok(articles) => articles,
            Err(e) => return fetch_failure(e),
        };
        if articles.is_empty() {
            return fetch_failure(FetchError::NoResults);
        }
        articles.truncate(self.max_articles);

        let prompt = prompt::build(&topic, &articles);
        info!(
            articles = articles.len(),
            prompt_bytes = prompt.as_str().len(),
            "Built ranking prompt"
        );

        let raw = match self.model.rank(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return model_failure(e),
        };

        let mut recommendations = match parser::parse(&raw, &articles) {
            Ok(recommendations) => recommendations,
            Err(e) => return parse_failure(e, &raw),
        };
        recommendations.truncate(request.result_count());

        info!(
            count = recommendations.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Pipeline succeeded"
        );
        PipelineResult::Success { recommendations }
    }
}

fn fetch_failure(e: FetchError) -> PipelineResult {
    let kind = e.kind();
    match e {
        FetchError::NoResults => info!("No articles for topic"),
        _ => error!(error = %e, %kind, "Article fetch failed"),
    }
    PipelineResult::failure(kind, e.to_string())
}

fn model_failure(e: ModelError) -> PipelineResult {
    let kind = e.kind();
    error!(error = %e, %kind, "Ranking call failed");
    PipelineResult::failure(kind, e.to_string())
}

fn parse_failure(e: ParseError, raw: &str) -> PipelineResult {
    let kind = e.kind();
    warn!(
        error = %e,
        response_preview = %truncate_for_log(raw, 300),
        "Model returned non-conforming output"
    );
    PipelineResult::failure(kind, e.to_string())
}

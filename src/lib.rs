//! # Awful Topic News
//!
//! Picks, ranks and summarizes the three most relevant recent news articles
//! for a user topic, with a short rationale for each.
//!
//! ## Architecture
//!
//! The core is a four-stage pipeline driven by [`pipeline::Pipeline`]:
//! 1. **Fetching**: search NewsData.io for the topic ([`sources`])
//! 2. **Prompting**: serialize the articles into a ranking prompt ([`prompt`])
//! 3. **Ranking**: ask Gemini to pick and summarize ([`api`])
//! 4. **Parsing**: validate the model's blocks against the fetched links ([`parser`])
//!
//! Callers get a [`models::PipelineResult`] back every time, either a
//! complete validated set of recommendations or a typed failure.
//!
//! ```ignore
//! let config = PipelineConfig::new(news_key, google_key);
//! let pipeline = DefaultPipeline::from_config(&config)?;
//! match pipeline.recommend("space exploration").await {
//!     PipelineResult::Success { recommendations } => { /* render */ }
//!     PipelineResult::Failure { kind, message } => { /* show kind.user_message() */ }
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod outputs;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::PipelineConfig;
pub use models::{FailureKind, HealthStatus, PipelineRequest, PipelineResult, Recommendation};
pub use pipeline::{DefaultPipeline, Pipeline};

/// Liveness probe for hosting layers. Always healthy.
pub fn health_check() -> HealthStatus {
    HealthStatus { status: "healthy" }
}

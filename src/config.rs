//! Pipeline configuration.
//!
//! [`PipelineConfig`] is built once at startup and handed to
//! [`Pipeline`](crate::pipeline::Pipeline) and the clients it owns. Secrets
//! come from the environment (via the CLI layer); every other knob has a
//! default and can be overridden by an optional YAML file:
//!
//! ```yaml
//! model: gemini-2.5-flash
//! temperature: 0.3
//! max_articles: 10
//! fetch_timeout_secs: 10
//! model_timeout_secs: 30
//! model_retries: 1
//! ```

use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_NEWS_ENDPOINT: &str = "https://newsdata.io/api/1/news";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Upper bound on ranking re-attempts, whatever the settings file says.
pub const MAX_MODEL_RETRIES: u32 = 3;

/// Everything the pipeline needs to reach its two upstream services.
#[derive(Clone)]
pub struct PipelineConfig {
    /// NewsData.io key. `None` surfaces as an unauthorized fetch per request.
    pub news_api_key: Option<String>,
    /// Gemini key. `None` surfaces as an unauthorized ranking call per request.
    pub llm_api_key: Option<String>,
    pub news_endpoint: String,
    pub llm_endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Cap on articles kept from a fetch, bounding prompt size.
    pub max_articles: usize,
    pub fetch_timeout: Duration,
    pub model_timeout: Duration,
    /// Re-attempts of the ranking call on transient failures.
    pub model_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            news_api_key: None,
            llm_api_key: None,
            news_endpoint: DEFAULT_NEWS_ENDPOINT.to_string(),
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_articles: 10,
            fetch_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(30),
            model_retries: 1,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("news_api_key", &self.news_api_key.as_ref().map(|_| "<set>"))
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<set>"))
            .field("news_endpoint", &self.news_endpoint)
            .field("llm_endpoint", &self.llm_endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_articles", &self.max_articles)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("model_timeout", &self.model_timeout)
            .field("model_retries", &self.model_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

impl PipelineConfig {
    /// Defaults plus the two credentials. Blank keys count as missing.
    pub fn new(news_api_key: Option<String>, llm_api_key: Option<String>) -> Self {
        Self {
            news_api_key: non_blank(news_api_key),
            llm_api_key: non_blank(llm_api_key),
            ..Self::default()
        }
    }

    /// Apply every field present in `settings`.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        if let Some(v) = settings.news_endpoint {
            self.news_endpoint = v;
        }
        if let Some(v) = settings.llm_endpoint {
            self.llm_endpoint = v;
        }
        if let Some(v) = settings.model {
            self.model = v;
        }
        if let Some(v) = settings.temperature {
            self.temperature = v;
        }
        if let Some(v) = settings.max_articles {
            self.max_articles = v.max(1);
        }
        if let Some(v) = settings.fetch_timeout_secs {
            self.fetch_timeout = Duration::from_secs(v.max(1));
        }
        if let Some(v) = settings.model_timeout_secs {
            self.model_timeout = Duration::from_secs(v.max(1));
        }
        if let Some(v) = settings.model_retries {
            self.model_retries = v.min(MAX_MODEL_RETRIES);
        }
        if let Some(v) = settings.retry_base_delay_ms {
            self.retry_base_delay = Duration::from_millis(v);
        }
        self
    }
}

/// Optional overrides read from a YAML settings file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub news_endpoint: Option<String>,
    pub llm_endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_articles: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub model_timeout_secs: Option<u64>,
    pub model_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Read and parse a settings file.
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let yaml = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&yaml)?;
        info!(?settings, "Loaded settings file");
        Ok(settings)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//! Ranking model API interaction with a bounded retry decorator.
//!
//! # Architecture
//!
//! - [`RankModel`]: core trait, one prompt in, the model's raw text out
//! - [`GeminiClient`]: Google Generative Language `generateContent` backend
//! - [`RetryRank`]: decorator that re-attempts transient failures a fixed
//!   number of times with exponential backoff and jitter
//!
//! Backends never retry on their own; retries are opted into by the
//! orchestrator wrapping a backend in [`RetryRank`].

use crate::config::PipelineConfig;
use crate::error::ModelError;
use crate::prompt::Prompt;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// A service that turns a ranking prompt into free-form model text.
pub trait RankModel {
    /// Send the prompt and return the generated text verbatim.
    async fn rank(&self, prompt: &Prompt) -> Result<String, ModelError>;
}

impl<T: RankModel> RankModel for &T {
    async fn rank(&self, prompt: &Prompt) -> Result<String, ModelError> {
        (**self).rank(prompt).await
    }
}

/// Wrapper that adds bounded exponential backoff retries to any [`RankModel`].
///
/// Only transient errors ([`ModelError::is_transient`]) are retried. The
/// delay before re-attempt `n` (1-based) is:
///
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..250ms)
/// ```
///
/// A zero `base_delay` disables both backoff and jitter.
pub struct RetryRank<T> {
    inner: T,
    max_retries: u32,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryRank<T>
where
    T: RankModel,
{
    /// Wrap an existing [`RankModel`] with bounded retries.
    ///
    /// # Arguments
    ///
    /// * `inner` - The model client to wrap
    /// * `max_retries` - Re-attempts after the first call (1 by default, at most 3)
    /// * `base_delay` - Delay before the first re-attempt; doubles each time
    ///
    /// # Example
    ///
    /// ```ignore
    /// let gemini = GeminiClient::new(http, &config);
    /// let model = RetryRank::new(gemini, 1, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: u32, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(8),
        }
    }

    fn backoff(&self, attempt: u32) -> StdDuration {
        if self.base_delay.is_zero() {
            return StdDuration::ZERO;
        }
        let exp = self
            .base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16))
            .min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        exp + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryRank<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRank")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> RankModel for RetryRank<T>
where
    T: RankModel,
{
    #[instrument(level = "info", skip_all)]
    async fn rank(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.rank(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "rank() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "rank() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Gemini `models/{model}:generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    timeout: StdDuration,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from the model, endpoint, key and timeout in `config`,
    /// sharing the given connection pool.
    pub fn new(client: Client, config: &PipelineConfig) -> Self {
        Self {
            client,
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.llm_api_key.clone(),
            temperature: config.temperature,
            timeout: config.model_timeout,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl RankModel for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn rank(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("GOOGLE_API_KEY is not configured");
            return Err(ModelError::Unauthorized("GOOGLE_API_KEY is not set".to_string()));
        };

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.as_str(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        let elapsed_ms = t0.elapsed().as_millis();

        match decode_response(status, &text) {
            Ok(generated) => {
                info!(elapsed_ms, bytes = generated.len(), "Model call succeeded");
                debug!(response_preview = %truncate_for_log(&generated, 300), "Model output");
                Ok(generated)
            }
            Err(e) => {
                warn!(elapsed_ms, %status, error = %e, "Model call failed");
                Err(e)
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout
    } else {
        ModelError::Unexpected(e.without_url().to_string())
    }
}

/// Turn an HTTP status and body into generated text or a typed error.
fn decode_response(status: StatusCode, body: &str) -> Result<String, ModelError> {
    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_default();
        return Err(classify_error(status, detail, body));
    }

    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        ModelError::Unexpected(format!("unreadable model response: {e}"))
    })?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ModelError::Unexpected(format!("empty model response ({reason})")));
    }
    Ok(text)
}

fn classify_error(status: StatusCode, detail: ErrorDetail, body: &str) -> ModelError {
    let message = if detail.message.is_empty() {
        format!("HTTP {}: {}", status.as_u16(), truncate_for_log(body, 120))
    } else {
        detail.message
    };

    // Gemini reports a bad key as 400 INVALID_ARGUMENT with this text.
    let bad_key = message.contains("API key not valid") || message.contains("API_KEY_INVALID");

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || detail.status == "UNAUTHENTICATED"
        || detail.status == "PERMISSION_DENIED"
        || bad_key
    {
        ModelError::Unauthorized(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS || detail.status == "RESOURCE_EXHAUSTED" {
        ModelError::RateLimited
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
        || detail.status == "DEADLINE_EXCEEDED"
    {
        ModelError::Timeout
    } else if status.is_client_error() {
        ModelError::Rejected(message)
    } else {
        ModelError::Unexpected(message)
    }
}

//! JSON output of pipeline results.
//!
//! Files are organized by local date and named after the topic slug:
//! `{json_output_dir}/{YYYY-MM-DD}/{topic-slug}.json`. A later run for the
//! same topic on the same day replaces the earlier file.

use crate::models::PipelineResult;
use crate::utils::slugify_title;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// What lands on disk: the result plus the request that produced it.
#[derive(Debug, Serialize)]
pub struct ResultFile<'a> {
    pub topic: &'a str,
    pub language: &'a str,
    pub generated_at: String,
    pub result: &'a PipelineResult,
}

/// Path of the file a result for `topic` on `date` is written to.
pub fn result_path(json_output_dir: &str, date: NaiveDate, topic: &str) -> PathBuf {
    let slug = match slugify_title(topic) {
        s if s.is_empty() => "untitled".to_string(),
        s => s,
    };
    PathBuf::from(json_output_dir)
        .join(date.to_string())
        .join(format!("{slug}.json"))
}

/// Serialize `result` and write it under `json_output_dir`.
///
/// The file lands at `<json_output_dir>/<YYYY-MM-DD>/<topic-slug>.json` and
/// wraps the result with the topic, language and generation time. A second
/// run for the same topic on the same day overwrites the first.
///
/// # Arguments
///
/// * `result` - Outcome of one pipeline run
/// * `topic` - Topic as the user typed it, used for the file name
/// * `language` - Search language of the request
/// * `json_output_dir` - Root output directory
///
/// # Returns
///
/// The path written to.
///
/// # Errors
///
/// Returns an error if the dated directory cannot be created or the file
/// cannot be written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, %topic))]
pub async fn write_result(
    result: &PipelineResult,
    topic: &str,
    language: &str,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let now = Local::now();
    let file = ResultFile {
        topic,
        language,
        generated_at: now.to_rfc3339(),
        result,
    };
    let json = serde_json::to_string_pretty(&file)?;

    let path = result_path(json_output_dir, now.date_naive(), topic);
    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON result file");
    Ok(path)
}

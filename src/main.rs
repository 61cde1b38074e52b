//! `atn`: terminal front-end for Awful Topic News.
//!
//! ## Usage
//!
//! ```sh
//! atn technology          # one-shot
//! atn                     # interactive prompt, `quit` to leave
//! atn --list-topics
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use awful_topic_news::cli::{Cli, PRESET_TOPICS};
use awful_topic_news::config::Settings;
use awful_topic_news::outputs::{json, markdown};
use awful_topic_news::utils::ensure_writable_dir;
use awful_topic_news::{DefaultPipeline, PipelineConfig, PipelineRequest, PipelineResult};
use clap::Parser;
use std::error::Error;
use std::io::Write as _;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // .env must be loaded before clap reads the key variables
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => debug!("No .env file"),
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let args = Cli::parse();
    debug!(topic = ?args.topic(), language = %args.language, "Parsed CLI arguments");

    if args.list_topics {
        for topic in PRESET_TOPICS {
            println!("{topic}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = PipelineConfig::new(args.news_api_key.clone(), args.google_api_key.clone());
    if let Some(path) = &args.config {
        config = config.with_settings(Settings::load(path).await?);
    }
    if config.news_api_key.is_none() {
        warn!("NEWS_API_KEY not set; every request will fail as unauthorized");
    }
    if config.llm_api_key.is_none() {
        warn!("GOOGLE_API_KEY not set; every request will fail as unauthorized");
    }
    info!(?config, "Configuration ready");

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let pipeline = DefaultPipeline::from_config(&config)?;

    match args.topic() {
        Some(topic) => {
            let outcome = run_once(&pipeline, &args, &topic).await?;
            Ok(match outcome {
                Some(true) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            })
        }
        None => {
            interactive(&pipeline, &args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run one request, print it, and archive it if asked.
///
/// Returns `None` when interrupted, otherwise whether the run succeeded.
async fn run_once(
    pipeline: &DefaultPipeline,
    args: &Cli,
    topic: &str,
) -> Result<Option<bool>, Box<dyn Error>> {
    let request = PipelineRequest::new(topic).with_language(args.language.as_str());

    // Dropping the pipeline future abandons any in-flight call.
    let result = tokio::select! {
        result = pipeline.run(&request) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!(%topic, "Interrupted; abandoning request");
            return Ok(None);
        }
    };

    print_result(args, topic, &result)?;

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_result(&result, topic, request.language(), dir).await {
            error!(error = %e, "Failed to write JSON result");
        }
    }
    Ok(Some(result.is_success()))
}

fn print_result(args: &Cli, topic: &str, result: &PipelineResult) -> Result<(), Box<dyn Error>> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let rule = "=".repeat(50);
        println!("{rule}");
        print!("{}", markdown::result_to_markdown(topic, result));
        println!("{rule}");
    }
    Ok(())
}

async fn interactive(pipeline: &DefaultPipeline, args: &Cli) -> Result<(), Box<dyn Error>> {
    println!("Awful Topic News");
    println!("Example topics: {}", PRESET_TOPICS.join(", "));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nWhat topics are you interested in? (or 'quit' to exit)\n> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!("\nGoodbye!");
            return Ok(());
        };

        let input = line.trim();
        if matches!(input.to_lowercase().as_str(), "quit" | "exit") {
            println!("Goodbye!");
            return Ok(());
        }
        if input.is_empty() {
            println!("Please enter some interests.");
            continue;
        }

        println!("\nFinding relevant news...");
        run_once(pipeline, args, input).await?;
    }
}

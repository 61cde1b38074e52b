//! Command-line interface definitions for Awful Topic News.
//!
//! All credentials can be provided via flags or environment variables; a
//! `.env` file in the working directory is loaded before parsing.

use crate::models::DEFAULT_LANGUAGE;
use clap::Parser;

/// Topics offered as quick picks in interactive mode and by `--list-topics`.
pub const PRESET_TOPICS: [&str; 6] = ["Technology", "War", "Industrial", "All", "Political", "Stocks"];

/// Command-line arguments for the Awful Topic News application.
///
/// # Examples
///
/// ```sh
/// # One-shot recommendation
/// atn space exploration
///
/// # Interactive prompt
/// atn
///
/// # Machine-readable output, also archived to disk
/// atn --json -j ./json technology
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic to get recommendations for; omit to start an interactive prompt
    pub topic: Vec<String>,

    /// Language code passed to the news search
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for JSON result files
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Print results as JSON instead of Markdown
    #[arg(long)]
    pub json: bool,

    /// Print the preset topics and exit
    #[arg(long)]
    pub list_topics: bool,

    /// NewsData.io API key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// Google Generative Language API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,
}

impl Cli {
    /// The positional words joined into one topic, if any were given.
    pub fn topic(&self) -> Option<String> {
        if self.topic.is_empty() {
            None
        } else {
            Some(self.topic.join(" "))
        }
    }
}

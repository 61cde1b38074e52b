//! Prompt construction for the ranking model.
//!
//! The prompt is the single place where the output contract is stated. The
//! markers below are the whole layout; [`parser`](crate::parser) reads
//! exactly what is described here:
//!
//! ```text
//! [RECOMMENDATION 1]
//! TITLE: <article title>
//! SUMMARY: <one or two sentences>
//! RATIONALE: <why it matches the topic>
//! URL: <link copied verbatim from the article list>
//! [END]
//! ```
//!
//! [`build`] is pure: the same topic and the same article order always yield
//! byte-identical prompt text.

use crate::models::{RESULT_COUNT, RawArticle, Topic};
use crate::utils::truncate_chars;
use std::fmt::{self, Write};

/// Opening marker of a block; followed by the 1-based rank and `]`.
pub const BLOCK_START: &str = "[RECOMMENDATION";
pub const BLOCK_END: &str = "[END]";
pub const TITLE_FIELD: &str = "TITLE:";
pub const SUMMARY_FIELD: &str = "SUMMARY:";
pub const RATIONALE_FIELD: &str = "RATIONALE:";
pub const URL_FIELD: &str = "URL:";

/// Descriptions longer than this are cut before they reach the prompt.
const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Instruction text sent to the ranking model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of blocks the model is asked for given `available` articles.
pub fn expected_picks(available: usize) -> usize {
    available.min(RESULT_COUNT)
}

/// Build the ranking prompt for `topic` over `articles`, in the given order.
pub fn build(topic: &Topic, articles: &[RawArticle]) -> Prompt {
    let picks = expected_picks(articles.len());
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = write_prompt(&mut out, topic, articles, picks);
    Prompt(out)
}

fn write_prompt(
    out: &mut String,
    topic: &Topic,
    articles: &[RawArticle],
    picks: usize,
) -> fmt::Result {
    writeln!(out, "You are a news editor recommending articles to a reader.")?;
    writeln!(out)?;
    writeln!(out, "**User Interests**: {topic}")?;
    writeln!(out)?;
    writeln!(
        out,
        "**Task**: From the numbered articles below, select the {picks} most relevant to the \
         user's interests and rank them from most to least relevant."
    )?;
    if articles.len() < RESULT_COUNT {
        writeln!(
            out,
            "Only {} article(s) are available, so return exactly {picks} block(s).",
            articles.len()
        )?;
    }
    writeln!(
        out,
        "Use only the articles listed here. Do not use outside knowledge and do not invent \
         articles or links."
    )?;
    writeln!(out)?;
    writeln!(out, "For each selected article provide:")?;
    writeln!(out, "1. {TITLE_FIELD} the article title")?;
    writeln!(out, "2. {SUMMARY_FIELD} a concise summary of at most two sentences")?;
    writeln!(out, "3. {RATIONALE_FIELD} why it matches the user's interests")?;
    writeln!(
        out,
        "4. {URL_FIELD} the article's Link, copied character for character from the list"
    )?;
    writeln!(out)?;

    writeln!(out, "**Articles**:")?;
    for (i, article) in articles.iter().enumerate() {
        writeln!(out)?;
        write_article(out, i + 1, article)?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "**Output format**: Respond with exactly {picks} block(s) and nothing else. \
         Keep every field on a single line. Use this layout, numbering blocks from 1 in rank order:"
    )?;
    writeln!(out)?;
    writeln!(out, "{BLOCK_START} 1]")?;
    writeln!(out, "{TITLE_FIELD} <article title>")?;
    writeln!(out, "{SUMMARY_FIELD} <summary>")?;
    writeln!(out, "{RATIONALE_FIELD} <why it matches>")?;
    writeln!(out, "{URL_FIELD} <exact Link of the article>")?;
    writeln!(out, "{BLOCK_END}")?;
    Ok(())
}

fn write_article(out: &mut String, number: usize, article: &RawArticle) -> fmt::Result {
    let description = if article.description.is_empty() {
        "No description".to_string()
    } else {
        truncate_chars(&article.description, DESCRIPTION_PREVIEW_CHARS)
    };
    let published = article
        .published
        .map(|p| p.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown date".to_string());

    writeln!(out, "[{number}]")?;
    writeln!(out, "Title: {}", article.title)?;
    writeln!(out, "Source: {}", article.source_id.as_deref().unwrap_or("Unknown source"))?;
    writeln!(out, "Description: {description}")?;
    writeln!(out, "Published: {published}")?;
    writeln!(out, "Link: {}", article.link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article(n: usize) -> RawArticle {
        RawArticle {
            title: format!("Story {n}"),
            description: format!("Description of story {n}"),
            link: format!("https://example.com/a{n}"),
            source_id: Some("example".to_string()),
            published: None,
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let topic = Topic::parse("technology").unwrap();
        let articles: Vec<_> = (1..=5).map(article).collect();
        assert_eq!(build(&topic, &articles), build(&topic, &articles));
    }

    #[test]
    fn test_build_is_order_sensitive() {
        let topic = Topic::parse("technology").unwrap();
        let articles: Vec<_> = (1..=3).map(article).collect();
        let mut reversed = articles.clone();
        reversed.reverse();
        assert_ne!(build(&topic, &articles), build(&topic, &reversed));
    }

    #[test]
    fn test_build_lists_every_article_and_contract() {
        let topic = Topic::parse("AI and climate").unwrap();
        let articles: Vec<_> = (1..=5).map(article).collect();
        let prompt = build(&topic, &articles).into_string();

        assert!(prompt.contains("**User Interests**: ai, climate"));
        assert!(prompt.contains("select the 3 most relevant"));
        assert!(prompt.contains("exactly 3 block(s)"));
        assert!(prompt.contains("do not invent"));
        for n in 1..=5 {
            assert!(prompt.contains(&format!("Link: https://example.com/a{n}")));
        }
        for marker in [BLOCK_START, BLOCK_END, TITLE_FIELD, SUMMARY_FIELD, RATIONALE_FIELD, URL_FIELD] {
            assert!(prompt.contains(marker), "missing {marker}");
        }
        assert!(!prompt.contains("Only "));
    }

    #[test]
    fn test_build_with_fewer_articles_than_result_count() {
        let topic = Topic::parse("space").unwrap();
        let articles = vec![article(1), article(2)];
        let prompt = build(&topic, &articles).into_string();
        assert!(prompt.contains("select the 2 most relevant"));
        assert!(prompt.contains("Only 2 article(s) are available"));
    }

    #[test]
    fn test_article_block_formatting() {
        let topic = Topic::parse("markets").unwrap();
        let articles = vec![RawArticle {
            title: "Stocks slide".to_string(),
            description: "x".repeat(500),
            link: "https://example.com/s".to_string(),
            source_id: None,
            published: NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(9, 30, 0)),
        }];
        let prompt = build(&topic, &articles).into_string();
        assert!(prompt.contains("[1]\nTitle: Stocks slide\nSource: Unknown source\n"));
        assert!(prompt.contains("Published: 2024-05-01 09:30"));
        let description_line = prompt
            .lines()
            .find(|l| l.starts_with("Description: "))
            .unwrap();
        assert_eq!(
            description_line.trim_start_matches("Description: ").chars().count(),
            DESCRIPTION_PREVIEW_CHARS
        );
    }

    #[test]
    fn test_expected_picks() {
        assert_eq!(expected_picks(0), 0);
        assert_eq!(expected_picks(2), 2);
        assert_eq!(expected_picks(3), 3);
        assert_eq!(expected_picks(10), 3);
    }
}

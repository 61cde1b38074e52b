//! Parsing and validation of the ranking model's output.
//!
//! The model is asked for the block layout defined in [`prompt`](crate::prompt).
//! Anything that does not follow it is [`ParseError::MalformedLayout`]; there
//! is no heuristic recovery. Inside an otherwise valid answer, a block whose
//! URL is not one of the supplied article links (or repeats an accepted one)
//! is dropped on its own, and only an answer left with no blocks fails as
//! [`ParseError::EmptyAfterValidation`].
//!
//! Ranks follow emission order: the first surviving block is rank 1.

use crate::error::ParseError;
use crate::models::{RESULT_COUNT, RawArticle, Recommendation};
use crate::prompt::{BLOCK_END, BLOCK_START, RATIONALE_FIELD, SUMMARY_FIELD, TITLE_FIELD, URL_FIELD};
use crate::utils::{collapse_whitespace, truncate_chars};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Summaries are cut to this many characters.
pub const MAX_SUMMARY_CHARS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Rationale,
    Url,
}

impl Field {
    const ALL: [(Field, &'static str); 4] = [
        (Field::Title, TITLE_FIELD),
        (Field::Summary, SUMMARY_FIELD),
        (Field::Rationale, RATIONALE_FIELD),
        (Field::Url, URL_FIELD),
    ];

    fn marker(self) -> &'static str {
        match self {
            Field::Title => TITLE_FIELD,
            Field::Summary => SUMMARY_FIELD,
            Field::Rationale => RATIONALE_FIELD,
            Field::Url => URL_FIELD,
        }
    }

    /// Split a line into the field it opens and the rest of the line.
    fn split(line: &str) -> Option<(Field, &str)> {
        Field::ALL
            .iter()
            .find_map(|(field, marker)| line.strip_prefix(*marker).map(|rest| (*field, rest)))
    }
}

/// Raw field text of one block, before validation.
#[derive(Debug, Default)]
struct Block {
    title: Option<String>,
    summary: Option<String>,
    rationale: Option<String>,
    url: Option<String>,
}

impl Block {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Summary => &mut self.summary,
            Field::Rationale => &mut self.rationale,
            Field::Url => &mut self.url,
        }
    }
}

fn is_block_start(line: &str) -> bool {
    line.strip_prefix(BLOCK_START)
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|n| {
            let n = n.trim();
            !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())
        })
}

/// Split raw text into blocks. Text outside blocks is ignored.
fn split_blocks(raw: &str) -> Result<Vec<Block>, ParseError> {
    let mut blocks = Vec::new();
    let mut current: Option<(Block, Option<Field>)> = None;

    for line in raw.lines().map(str::trim) {
        if is_block_start(line) {
            if current.is_some() {
                return Err(malformed(format!(
                    "block {} is missing {BLOCK_END}",
                    blocks.len() + 1
                )));
            }
            current = Some((Block::default(), None));
            continue;
        }

        let Some((block, last_field)) = current.as_mut() else {
            continue;
        };

        if line == BLOCK_END {
            if let Some((block, _)) = current.take() {
                blocks.push(block);
            }
            continue;
        }

        if let Some((field, rest)) = Field::split(line) {
            let slot = block.slot(field);
            if slot.is_some() {
                return Err(malformed(format!(
                    "block {} repeats {}",
                    blocks.len() + 1,
                    field.marker()
                )));
            }
            *slot = Some(rest.trim().to_string());
            *last_field = Some(field);
        } else if !line.is_empty() {
            // Continuation of a field that wrapped onto the next line.
            let Some(field) = *last_field else {
                return Err(malformed(format!(
                    "block {} has text before its first field",
                    blocks.len() + 1
                )));
            };
            if let Some(value) = block.slot(field).as_mut() {
                value.push(' ');
                value.push_str(line);
            }
        }
    }

    if current.is_some() {
        return Err(malformed(format!(
            "block {} is missing {BLOCK_END}",
            blocks.len() + 1
        )));
    }
    Ok(blocks)
}

fn malformed(reason: String) -> ParseError {
    ParseError::MalformedLayout(reason)
}

fn required(value: Option<String>, field: Field, index: usize) -> Result<String, ParseError> {
    let value = collapse_whitespace(value.as_deref().unwrap_or_default());
    if value.is_empty() {
        return Err(malformed(format!(
            "block {index} has no {}",
            field.marker().trim_end_matches(':')
        )));
    }
    Ok(value)
}

/// Parse the model's raw text into ranked recommendations.
///
/// # Errors
///
/// - [`ParseError::MalformedLayout`] when no block is found, a block is not
///   terminated, a required field is missing or empty, or there are more
///   blocks than `min(3, source_articles.len())`
/// - [`ParseError::EmptyAfterValidation`] when every block was dropped by
///   URL validation
#[instrument(level = "info", skip_all, fields(sources = source_articles.len()))]
pub fn parse(raw: &str, source_articles: &[RawArticle]) -> Result<Vec<Recommendation>, ParseError> {
    let blocks = split_blocks(raw)?;
    if blocks.is_empty() {
        return Err(malformed("no recommendation blocks found".to_string()));
    }

    let allowed = source_articles.len().min(RESULT_COUNT);
    if blocks.len() > allowed {
        return Err(malformed(format!(
            "{} blocks returned but at most {allowed} allowed",
            blocks.len()
        )));
    }

    let known: HashSet<&str> = source_articles.iter().map(|a| a.link.as_str()).collect();
    let mut used: HashSet<String> = HashSet::new();
    let mut recommendations = Vec::with_capacity(blocks.len());

    for (i, block) in blocks.into_iter().enumerate() {
        let index = i + 1;
        let title = required(block.title, Field::Title, index)?;
        let summary = required(block.summary, Field::Summary, index)?;
        let url = required(block.url, Field::Url, index)?;
        let rationale = collapse_whitespace(block.rationale.as_deref().unwrap_or_default());

        if !known.contains(url.as_str()) {
            warn!(block = index, %url, "Dropping recommendation with unknown source URL");
            continue;
        }
        if !used.insert(url.clone()) {
            warn!(block = index, %url, "Dropping recommendation with repeated source URL");
            continue;
        }

        recommendations.push(Recommendation {
            rank: recommendations.len() + 1,
            title,
            summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
            rationale,
            url,
        });
    }

    if recommendations.is_empty() {
        return Err(ParseError::EmptyAfterValidation);
    }
    debug!(count = recommendations.len(), "Parsed recommendations");
    Ok(recommendations)
}

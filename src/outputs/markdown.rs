//! Markdown rendering of pipeline results.

use crate::models::{PipelineResult, Recommendation};
use std::fmt::Write;

/// Render a result as Markdown.
///
/// Successes get a heading per recommendation with summary, rationale and
/// link; failures get the user-facing message for their kind followed by
/// the technical detail.
pub fn result_to_markdown(topic: &str, result: &PipelineResult) -> String {
    let mut md = String::new();
    match result {
        PipelineResult::Success { recommendations } => {
            let _ = writeln!(md, "# Recommendations for *{}*\n", topic.trim());
            for rec in recommendations {
                write_recommendation(&mut md, rec);
            }
        }
        PipelineResult::Failure { kind, message } => {
            let _ = writeln!(md, "> **{}**", kind.user_message());
            let _ = writeln!(md, ">");
            let _ = writeln!(md, "> `{kind}`: {message}");
        }
    }
    md
}

fn write_recommendation(md: &mut String, rec: &Recommendation) {
    let _ = writeln!(md, "## {}. {}\n", rec.rank, rec.title);
    let _ = writeln!(md, "{}\n", rec.summary);
    if !rec.rationale.is_empty() {
        let _ = writeln!(md, "**Why it matters:** {}\n", rec.rationale);
    }
    let _ = writeln!(md, "[Read the article]({})\n", rec.url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;

    fn rec(rank: usize, rationale: &str) -> Recommendation {
        Recommendation {
            rank,
            title: format!("Story {rank}"),
            summary: format!("Summary {rank}."),
            rationale: rationale.to_string(),
            url: format!("https://example.com/a{rank}"),
        }
    }

    #[test]
    fn test_success_markdown() {
        let result = PipelineResult::Success {
            recommendations: vec![rec(1, "Directly on topic."), rec(2, "")],
        };
        let md = result_to_markdown(" technology ", &result);
        assert!(md.starts_with("# Recommendations for *technology*\n"));
        assert!(md.contains("## 1. Story 1\n\nSummary 1.\n\n**Why it matters:** Directly on topic.\n"));
        assert!(md.contains("[Read the article](https://example.com/a1)"));
        assert!(md.contains("## 2. Story 2\n\nSummary 2.\n\n[Read the article](https://example.com/a2)"));
        assert!(md.find("## 1.").unwrap() < md.find("## 2.").unwrap());
    }

    #[test]
    fn test_failure_markdown() {
        let result = PipelineResult::failure(FailureKind::NoArticlesFound, "no articles found");
        let md = result_to_markdown("technology", &result);
        assert!(md.contains(FailureKind::NoArticlesFound.user_message()));
        assert!(md.contains("`no_articles_found`: no articles found"));
        assert!(!md.contains("# Recommendations"));
    }
}

//! Terminal summaries of a pipeline result.

use crate::artifacts::{PipelineResult, ReviewStatus};

/// One line per completed stage, for printing after a run.
pub fn summary_lines(result: &PipelineResult) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(req) = &result.requirements {
        let title = if req.title.is_empty() {
            "(untitled)"
        } else {
            req.title.as_str()
        };
        lines.push(format!(
            "✓ Requirements analyzed: {title} ({} features)",
            req.features.len()
        ));
    }
    if let Some(code) = &result.final_code {
        let revised = result.code.as_deref().is_some_and(|c| c != code.as_str());
        lines.push(format!(
            "✓ Code generated: {} characters{}",
            code.chars().count(),
            if revised { " (revised after review)" } else { "" }
        ));
    } else if let Some(code) = &result.code {
        lines.push(format!(
            "✓ Code generated: {} characters (not reviewed)",
            code.chars().count()
        ));
    }
    if let Some(review) = &result.review {
        let status = match review.status {
            Some(ReviewStatus::Approved) => "APPROVED",
            Some(ReviewStatus::NeedsRevision) => "NEEDS REVISION",
            Some(ReviewStatus::Other) | None => "UNKNOWN",
        };
        let score = review
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        lines.push(format!("✓ Code review: {status}, score {score}/10"));
    }
    if let Some(docs) = &result.documentation {
        lines.push(format!(
            "✓ Documentation: {} characters",
            docs.chars().count()
        ));
    }
    if let Some(tests) = &result.tests {
        lines.push(format!(
            "✓ Test cases: {} test functions",
            count_test_functions(tests)
        ));
    }
    if let Some(deployment) = &result.deployment {
        lines.push(format!(
            "✓ Deployment script generated at {}",
            deployment.timestamp
        ));
    }

    lines
}

/// Occurrences of `def test_` in generated test code.
pub fn count_test_functions(tests: &str) -> usize {
    tests.matches("def test_").count()
}

/// First `max_lines` lines of `content`, with a trailer if cut.
pub fn preview(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = lines
        .iter()
        .take(max_lines)
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n");
    if lines.len() > max_lines {
        out.push_str(&format!("\n  ... ({} more lines)", lines.len() - max_lines));
    }
    out
}

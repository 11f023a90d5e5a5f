//! Bounded review / revision loop between the developer and the reviewer.

use crate::artifacts::{RequirementSpec, ReviewVerdict};
use crate::conversation::Conversation;
use crate::llm::LlmError;
use crate::parse::extract_structured;
use crate::roles::Role;

/// Review `code`, asking the developer for a rewrite after each rejection.
///
/// Makes at most `max_iterations` review calls and `max_iterations - 1`
/// revision calls; zero is treated as one. Returns the last verdict and
/// the code it judged, so a caller that sees a non-approved status knows
/// the budget ran out. Undecodable verdicts count as approvals.
pub async fn review_and_revise(
    conv: &mut Conversation<'_>,
    code: &str,
    requirements: &RequirementSpec,
    max_iterations: u32,
) -> Result<(ReviewVerdict, String), LlmError> {
    let budget = max_iterations.max(1);
    let mut current = code.to_string();
    let mut iteration = 0;

    loop {
        let review_text = conv
            .ask(
                Role::Reviewer,
                &review_prompt(&current, requirements),
                Role::Reviewer.turn_cap(),
            )
            .await?;
        let verdict = extract_structured(&review_text, ReviewVerdict::fallback());

        if verdict.is_approved() {
            tracing::info!(iteration, score = ?verdict.score, "Code approved");
            return Ok((verdict, current));
        }

        if iteration + 1 >= budget {
            tracing::warn!(
                iterations = budget,
                score = ?verdict.score,
                "Review budget exhausted without approval"
            );
            return Ok((verdict, current));
        }

        tracing::info!(
            iteration = iteration + 1,
            score = ?verdict.score,
            "Code needs revision, regenerating"
        );
        current = conv
            .ask(
                Role::Developer,
                &revision_prompt(&review_text, &current),
                Role::Developer.turn_cap(),
            )
            .await?;
        iteration += 1;
    }
}

fn review_prompt(code: &str, requirements: &RequirementSpec) -> String {
    let mut prompt = format!("Review this code:\n{code}\n\n");
    if !requirements.features.is_empty() {
        prompt.push_str("It should implement:\n");
        for feature in &requirements.features {
            prompt.push_str(&format!("- {feature}\n"));
        }
        prompt.push('\n');
    }
    prompt.push_str("IMPORTANT: Provide ONLY the JSON review, no explanations.");
    prompt
}

fn revision_prompt(review_text: &str, code: &str) -> String {
    format!(
        "Improve this code based on review:\n{review_text}\n\nOriginal code:\n{code}\n\nIMPORTANT: Provide ONLY the improved code."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ReviewStatus;
    use crate::llm::{ChatModel, Message};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Reviewer replies come from a list (last one repeats); the developer
    /// answers `revision N`.
    struct ReviewScript {
        reviews: Vec<&'static str>,
        reviewer_calls: Mutex<usize>,
        developer_calls: Mutex<usize>,
    }

    impl ReviewScript {
        fn new(reviews: &[&'static str]) -> Self {
            Self {
                reviews: reviews.to_vec(),
                reviewer_calls: Mutex::new(0),
                developer_calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ReviewScript {
        async fn chat(&self, system: &str, _messages: &[Message]) -> Result<String, LlmError> {
            if system == Role::Reviewer.system_prompt() {
                let mut n = self.reviewer_calls.lock().unwrap();
                let reply = self.reviews[(*n).min(self.reviews.len() - 1)];
                *n += 1;
                Ok(reply.to_string())
            } else {
                let mut n = self.developer_calls.lock().unwrap();
                *n += 1;
                Ok(format!("revision {}", *n))
            }
        }
    }

    fn reqs() -> RequirementSpec {
        RequirementSpec::fallback("calculator")
    }

    async fn drive(model: &ReviewScript, max: u32) -> (ReviewVerdict, String) {
        let mut conv = Conversation::new(model, Duration::from_secs(5));
        review_and_revise(&mut conv, "original", &reqs(), max)
            .await
            .unwrap()
    }

    const APPROVE: &str = r#"{"status":"approved","score":9}"#;
    const REJECT: &str = r#"{"status":"needs_revision","score":5}"#;

    #[tokio::test]
    async fn first_approval_keeps_original_code() {
        let model = ReviewScript::new(&[APPROVE]);
        let (verdict, code) = drive(&model, 3).await;
        assert!(verdict.is_approved());
        assert_eq!(verdict.score, Some(9));
        assert_eq!(code, "original");
        assert_eq!(*model.developer_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn always_rejecting_exhausts_budget() {
        let model = ReviewScript::new(&[REJECT]);
        let (verdict, code) = drive(&model, 2).await;
        assert_eq!(verdict.status, Some(ReviewStatus::NeedsRevision));
        assert_eq!(*model.reviewer_calls.lock().unwrap(), 2);
        assert_eq!(*model.developer_calls.lock().unwrap(), 1);
        assert_eq!(code, "revision 1");
    }

    #[tokio::test]
    async fn approval_after_one_revision() {
        let model = ReviewScript::new(&[REJECT, APPROVE]);
        let (verdict, code) = drive(&model, 3).await;
        assert!(verdict.is_approved());
        assert_eq!(code, "revision 1");
        assert_eq!(*model.reviewer_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn malformed_verdict_fails_open() {
        let model = ReviewScript::new(&["{incomplete json"]);
        let (verdict, code) = drive(&model, 3).await;
        assert_eq!(verdict, ReviewVerdict::fallback());
        assert_eq!(code, "original");
        assert_eq!(*model.reviewer_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn zero_budget_reviews_once_without_revision() {
        let model = ReviewScript::new(&[REJECT]);
        let (verdict, code) = drive(&model, 0).await;
        assert!(!verdict.is_approved());
        assert_eq!(code, "original");
        assert_eq!(*model.reviewer_calls.lock().unwrap(), 1);
        assert_eq!(*model.developer_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn call_bounds_hold_for_several_budgets() {
        for max in 1..=5u32 {
            let model = ReviewScript::new(&[REJECT]);
            let (_, code) = drive(&model, max).await;
            let reviews = *model.reviewer_calls.lock().unwrap();
            let revisions = *model.developer_calls.lock().unwrap();
            assert_eq!(reviews, max as usize);
            assert_eq!(revisions, max as usize - 1);
            if max > 1 {
                assert_eq!(code, format!("revision {}", max - 1));
            }
        }
    }

    #[tokio::test]
    async fn rejection_with_string_findings_still_revises() {
        let model = ReviewScript::new(&[
            r#"{"status":"needs_revision","score":4,"findings":["division by zero unhandled"]}"#,
            APPROVE,
        ]);
        let (verdict, code) = drive(&model, 3).await;
        assert!(verdict.is_approved());
        assert_eq!(code, "revision 1");
        assert_eq!(*model.reviewer_calls.lock().unwrap(), 2);
        assert_eq!(*model.developer_calls.lock().unwrap(), 1);
    }

    #[test]
    fn revision_prompt_carries_raw_review() {
        let p = revision_prompt(REJECT, "def f(): pass");
        assert!(p.contains(REJECT));
        assert!(p.contains("Original code:\ndef f(): pass"));
    }

    #[test]
    fn review_prompt_lists_features() {
        let mut spec = reqs();
        spec.features = vec!["add".into(), "subtract".into()];
        let p = review_prompt("code", &spec);
        assert!(p.contains("- add\n- subtract"));
    }
}

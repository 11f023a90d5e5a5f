//! Pipeline orchestrator: runs the agent roles over one requirement.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::artifacts::{DeploymentArtifact, PipelineResult, RequirementSpec, ReviewVerdict};
use crate::config::PipelineConfig;
use crate::conversation::Conversation;
use crate::llm::{ChatModel, LlmError};
use crate::parse::extract_structured;
use crate::roles::Role;

use super::review::review_and_revise;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Requirements,
    Code,
    Review,
    Documentation,
    Tests,
    Deployment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Requirements => write!(f, "requirements"),
            Stage::Code => write!(f, "code"),
            Stage::Review => write!(f, "review"),
            Stage::Documentation => write!(f, "documentation"),
            Stage::Tests => write!(f, "tests"),
            Stage::Deployment => write!(f, "deployment"),
        }
    }
}

/// A stage failed; `partial` holds every stage that finished before it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: LlmError,
    pub partial: Box<PipelineResult>,
}

/// The development pipeline.
pub struct Pipeline {
    model: Arc<dyn ChatModel>,
    config: PipelineConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl Pipeline {
    pub fn new(model: Arc<dyn ChatModel>, config: PipelineConfig) -> Self {
        Self {
            model,
            config,
            cancel: None,
        }
    }

    /// Abort the in-flight model call once `cancel` reads `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Limits and output location this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A fresh conversation bound to this pipeline's model and limits.
    pub fn conversation(&self) -> Conversation<'_> {
        let conv = Conversation::new(
            self.model.as_ref(),
            Duration::from_secs(self.config.model.timeout_secs),
        );
        match &self.cancel {
            Some(rx) => conv.with_cancel(rx.clone()),
            None => conv,
        }
    }

    /// Run every stage over `requirement`.
    ///
    /// Each stage's output lands in the result as soon as it completes. The
    /// first failure stops the run and comes back with the partial result.
    pub async fn run(&self, requirement: &str) -> Result<PipelineResult, PipelineError> {
        let mut conv = self.conversation();
        let mut result = PipelineResult::default();

        tracing::info!(stage = %Stage::Requirements, "Analyzing requirements");
        let outcome = self.analyze_requirements(&mut conv, requirement).await;
        let requirements = checked(Stage::Requirements, outcome, &mut result)?;
        tracing::info!(title = %requirements.title, features = requirements.features.len(), "Requirements ready");
        result.requirements = Some(requirements.clone());

        tracing::info!(stage = %Stage::Code, "Generating code");
        let outcome = self.generate_code(&mut conv, &requirements).await;
        let code = checked(Stage::Code, outcome, &mut result)?;
        result.code = Some(code.clone());

        tracing::info!(stage = %Stage::Review, "Reviewing code");
        let outcome = self
            .review_and_revise(&mut conv, &code, &requirements)
            .await;
        let (review, final_code) = checked(Stage::Review, outcome, &mut result)?;
        result.review = Some(review);
        result.final_code = Some(final_code.clone());

        tracing::info!(stage = %Stage::Documentation, "Writing documentation");
        let outcome = self
            .write_documentation(&mut conv, &final_code, &requirements)
            .await;
        let documentation = checked(Stage::Documentation, outcome, &mut result)?;
        result.documentation = Some(documentation);

        tracing::info!(stage = %Stage::Tests, "Generating tests");
        let outcome = self
            .generate_tests(&mut conv, &final_code, &requirements)
            .await;
        let tests = checked(Stage::Tests, outcome, &mut result)?;
        result.tests = Some(tests);

        tracing::info!(stage = %Stage::Deployment, "Creating deployment configuration");
        let outcome = self
            .generate_deployment(&mut conv, &final_code, &requirements)
            .await;
        let deployment = checked(Stage::Deployment, outcome, &mut result)?;
        result.deployment = Some(deployment);

        tracing::info!(
            model_calls = conv.transcript().len(),
            "Pipeline completed"
        );
        Ok(result)
    }

    /// Structured requirements, or the fixed fallback if the reply has no
    /// decodable object.
    pub async fn analyze_requirements(
        &self,
        conv: &mut Conversation<'_>,
        requirement: &str,
    ) -> Result<RequirementSpec, LlmError> {
        let prompt = format!(
            "Analyze this requirement and provide structured output:\n{requirement}\n\nIMPORTANT: Provide ONLY the JSON output, no code blocks or explanations."
        );
        let reply = conv
            .ask(Role::Analyst, &prompt, Role::Analyst.turn_cap())
            .await?;
        Ok(extract_structured(
            &reply,
            RequirementSpec::fallback(requirement),
        ))
    }

    pub async fn generate_code(
        &self,
        conv: &mut Conversation<'_>,
        requirements: &RequirementSpec,
    ) -> Result<String, LlmError> {
        let prompt = format!(
            "Generate Python code for these requirements:\n{}\n\nIMPORTANT: Provide ONLY the code, no markdown formatting or explanations before/after.",
            requirements_json(requirements, true)
        );
        conv.ask(Role::Developer, &prompt, Role::Developer.turn_cap())
            .await
    }

    /// The revision loop with this pipeline's iteration budget.
    pub async fn review_and_revise(
        &self,
        conv: &mut Conversation<'_>,
        code: &str,
        requirements: &RequirementSpec,
    ) -> Result<(ReviewVerdict, String), LlmError> {
        review_and_revise(conv, code, requirements, self.config.max_review_iterations).await
    }

    pub async fn write_documentation(
        &self,
        conv: &mut Conversation<'_>,
        code: &str,
        requirements: &RequirementSpec,
    ) -> Result<String, LlmError> {
        let mut prompt = format!("Create documentation for this code:\n{code}\n\n");
        if !requirements.title.is_empty() {
            prompt.push_str(&format!("Project: {}\n\n", requirements.title));
        }
        prompt.push_str("IMPORTANT: Provide documentation in Markdown format.");
        conv.ask(Role::Writer, &prompt, Role::Writer.turn_cap()).await
    }

    pub async fn generate_tests(
        &self,
        conv: &mut Conversation<'_>,
        code: &str,
        requirements: &RequirementSpec,
    ) -> Result<String, LlmError> {
        let mut prompt = format!("Generate comprehensive tests for this code:\n{code}\n\n");
        if !requirements.edge_cases.is_empty() {
            prompt.push_str("Edge cases to cover:\n");
            for case in &requirements.edge_cases {
                prompt.push_str(&format!("- {case}\n"));
            }
            prompt.push('\n');
        }
        prompt.push_str("IMPORTANT: Provide ONLY the test code.");
        conv.ask(Role::Qa, &prompt, Role::Qa.turn_cap()).await
    }

    pub async fn generate_deployment(
        &self,
        conv: &mut Conversation<'_>,
        code: &str,
        requirements: &RequirementSpec,
    ) -> Result<DeploymentArtifact, LlmError> {
        let prompt = format!(
            "Create deployment configuration for this project:\nCode:\n{code}\nRequirements:\n{}\n\nIMPORTANT: Provide deployment script and requirements.txt.",
            requirements_json(requirements, false)
        );
        let script = conv
            .ask(Role::DevOps, &prompt, Role::DevOps.turn_cap())
            .await?;
        Ok(DeploymentArtifact::new(script))
    }
}

/// Pass a stage outcome through, turning a failure into a [`PipelineError`]
/// that takes ownership of what has accumulated so far.
fn checked<T>(
    stage: Stage,
    outcome: Result<T, LlmError>,
    result: &mut PipelineResult,
) -> Result<T, PipelineError> {
    outcome.map_err(|source| {
        tracing::error!(%stage, error = %source, completed = ?result.keys(), "Stage failed");
        PipelineError {
            stage,
            source,
            partial: Box::new(std::mem::take(result)),
        }
    })
}

fn requirements_json(requirements: &RequirementSpec, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(requirements)
    } else {
        serde_json::to_string(requirements)
    };
    encoded.unwrap_or_else(|_| format!("{requirements:?}"))
}

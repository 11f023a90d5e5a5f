//! Writes a pipeline result to disk, one file per artifact.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::artifacts::PipelineResult;

pub const REQUIREMENTS_FILE: &str = "requirements.json";
pub const INITIAL_CODE_FILE: &str = "initial_code.py";
pub const FINAL_CODE_FILE: &str = "generated_code.py";
pub const REVIEW_FILE: &str = "code_review.json";
pub const DOCUMENTATION_FILE: &str = "documentation.md";
pub const TESTS_FILE: &str = "test_generated_code.py";
pub const DEPLOY_SCRIPT_FILE: &str = "deploy.sh";
pub const DEPLOYMENT_INFO_FILE: &str = "deployment_info.json";
pub const FULL_RESULTS_FILE: &str = "full_results.json";
pub const INDEX_FILE: &str = "README.md";

/// Output directory for one run's artifacts.
pub struct ResultStore {
    pub root: PathBuf,
}

impl ResultStore {
    /// Create the output directory if needed.
    pub async fn create(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Write every present field plus `full_results.json` and an index.
    /// Returns the paths written, index last.
    pub async fn save(&self, result: &PipelineResult) -> Result<Vec<PathBuf>> {
        let mut written: Vec<&'static str> = Vec::new();

        if let Some(requirements) = &result.requirements {
            self.write_json(REQUIREMENTS_FILE, requirements).await?;
            written.push(REQUIREMENTS_FILE);
        }
        if let Some(code) = &result.code {
            self.write_text(INITIAL_CODE_FILE, code).await?;
            written.push(INITIAL_CODE_FILE);
        }
        if let Some(code) = &result.final_code {
            self.write_text(FINAL_CODE_FILE, code).await?;
            written.push(FINAL_CODE_FILE);
        }
        if let Some(review) = &result.review {
            self.write_json(REVIEW_FILE, review).await?;
            written.push(REVIEW_FILE);
        }
        if let Some(docs) = &result.documentation {
            self.write_text(DOCUMENTATION_FILE, docs).await?;
            written.push(DOCUMENTATION_FILE);
        }
        if let Some(tests) = &result.tests {
            self.write_text(TESTS_FILE, tests).await?;
            written.push(TESTS_FILE);
        }
        if let Some(deployment) = &result.deployment {
            self.write_text(DEPLOY_SCRIPT_FILE, &deployment.script).await?;
            make_executable(&self.root.join(DEPLOY_SCRIPT_FILE)).await?;
            written.push(DEPLOY_SCRIPT_FILE);
            self.write_json(DEPLOYMENT_INFO_FILE, deployment).await?;
            written.push(DEPLOYMENT_INFO_FILE);
        }

        self.write_json(FULL_RESULTS_FILE, result).await?;
        written.push(FULL_RESULTS_FILE);

        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.write_text(INDEX_FILE, &render_index(&written, &generated_at))
            .await?;
        written.push(INDEX_FILE);

        tracing::info!(dir = %self.root.display(), files = written.len(), "Results saved");
        Ok(written.iter().map(|name| self.root.join(name)).collect())
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<()> {
        let path = self.root.join(name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(file = name, bytes = content.len(), "Wrote artifact");
        Ok(())
    }

    async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to encode {name}"))?;
        self.write_text(name, &json).await
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .with_context(|| format!("Failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn describe(name: &str) -> &'static str {
    match name {
        REQUIREMENTS_FILE => "Structured requirements from the natural-language input",
        INITIAL_CODE_FILE => "Code as first generated, before review",
        FINAL_CODE_FILE => "Final code after the review loop",
        REVIEW_FILE => "Last code review verdict",
        DOCUMENTATION_FILE => "Technical documentation",
        TESTS_FILE => "Generated test suite",
        DEPLOY_SCRIPT_FILE => "Deployment script",
        DEPLOYMENT_INFO_FILE => "Deployment script with generation timestamp",
        FULL_RESULTS_FILE => "Every result in one JSON document",
        _ => "",
    }
}

/// Markdown index of the files in this output directory.
fn render_index(files: &[&str], generated_at: &str) -> String {
    let mut out = String::from(
        "# Generated Output\n\nArtifacts produced by the devcrew pipeline.\n\n## Files\n\n",
    );
    for name in files {
        out.push_str(&format!("- `{name}` - {}\n", describe(name)));
    }
    out.push_str(&format!("\n## Generated On\n{generated_at}\n"));

    let mut usage = Vec::new();
    if files.contains(&FINAL_CODE_FILE) {
        usage.push(format!("### Run the code\n```bash\npython {FINAL_CODE_FILE}\n```"));
    }
    if files.contains(&TESTS_FILE) {
        usage.push(format!(
            "### Run the tests\n```bash\npython -m pytest {TESTS_FILE} -v\n```"
        ));
    }
    if files.contains(&DEPLOY_SCRIPT_FILE) {
        usage.push(format!("### Deploy\n```bash\n./{DEPLOY_SCRIPT_FILE}\n```"));
    }
    if files.contains(&DOCUMENTATION_FILE) {
        usage.push(format!(
            "### Documentation\nOpen `{DOCUMENTATION_FILE}` in any Markdown viewer."
        ));
    }
    if !usage.is_empty() {
        out.push_str("\n## How to Use\n\n");
        out.push_str(&usage.join("\n\n"));
        out.push('\n');
    }
    out
}

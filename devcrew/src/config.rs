//! Pipeline configuration.
//!
//! Values come from three layers, lowest first: built-in defaults, an
//! optional TOML file, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default model served by the endpoint.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_REVIEW_ITERATIONS: u32 = 3;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Model invocation settings shared by every role.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    /// Upper bound on reviewer rounds in the revision loop.
    pub max_review_iterations: u32,
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(model: ModelConfig) -> Self {
        Self {
            model,
            max_review_iterations: DEFAULT_MAX_REVIEW_ITERATIONS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// On-disk configuration (`devcrew.toml`). Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub max_review_iterations: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Bad config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Lay `overrides` on top of this file's values.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            api_key: overrides.api_key.or(self.api_key),
            model: overrides.model.or(self.model),
            base_url: overrides.base_url.or(self.base_url),
            temperature: overrides.temperature.or(self.temperature),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            max_review_iterations: overrides
                .max_review_iterations
                .or(self.max_review_iterations),
            output_dir: overrides.output_dir.or(self.output_dir),
        }
    }

    /// Fill in defaults. The API key is the only required value.
    pub fn resolve(self) -> Result<PipelineConfig> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .context("No API key: pass --api-key, set GROQ_API_KEY, or add api_key to the config file")?;

        let mut model = ModelConfig::new(api_key);
        if let Some(m) = self.model {
            model.model = m;
        }
        if let Some(url) = self.base_url {
            model.base_url = url;
        }
        if let Some(t) = self.temperature {
            anyhow::ensure!((0.0..=2.0).contains(&t), "temperature must be within 0.0..=2.0, got {t}");
            model.temperature = t;
        }
        if let Some(secs) = self.timeout_secs {
            anyhow::ensure!(secs > 0, "timeout_secs must be positive");
            model.timeout_secs = secs;
        }

        let mut config = PipelineConfig::new(model);
        if let Some(n) = self.max_review_iterations {
            config.max_review_iterations = n;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        Ok(config)
    }
}

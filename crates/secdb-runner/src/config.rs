//! Run configuration

use crate::cli::Cli;
use secdb_classifiers::{BackendConfig, DispatchConfig, PromptMode, PromptTemplate, RetryPolicy, DEFAULT_PREAMBLE};
use secdb_core::Error;
use secdb_telemetry::ScoringPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Everything one classification run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input dataset path
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Output base path, extended with `_{model}.json` / `_{model}.csv`
    #[serde(default = "default_output_basename")]
    pub output_basename: String,

    /// Record field holding the comment text
    #[serde(default = "default_text_field")]
    pub text_field: String,

    /// Record field holding the stored taxonomy string
    #[serde(default = "default_label_field")]
    pub label_field: String,

    /// Only classify the first N records
    #[serde(default)]
    pub limit: Option<usize>,

    /// Keep the comment text in outputs
    #[serde(default = "default_true")]
    pub show_comments: bool,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl RunConfig {
    /// Load configuration from file and CLI overrides.
    ///
    /// A missing file falls back to the defaults.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_file(&cli.config)?
        } else {
            debug!(path = %cli.config.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(input) = &cli.input {
            self.input_path = input.clone();
        }
        if let Some(output) = &cli.output {
            self.output_basename = output.clone();
        }
        if let Some(model) = &cli.model {
            self.model.name = model.clone();
        }
        if let Some(base_url) = &cli.base_url {
            self.model.base_url = base_url.clone();
        }
        if let Some(api_key) = &cli.api_key {
            self.model.api_key = Some(api_key.clone());
        }
        if let Some(workers) = cli.workers {
            self.dispatch.workers = workers;
        }
        if cli.limit.is_some() {
            self.limit = cli.limit;
        }
        if cli.hide_comments {
            self.show_comments = false;
        }
        if cli.system_prompt {
            self.prompt.system_message = true;
        }
    }

    pub fn validate(&self) -> secdb_core::Result<()> {
        if self.text_field.is_empty() || self.label_field.is_empty() {
            return Err(Error::config("text_field and label_field must be non-empty"));
        }
        if self.model.name.trim().is_empty() {
            return Err(Error::config("model.name must be set"));
        }
        if !self.model.temperature.is_finite() || self.model.temperature < 0.0 {
            return Err(Error::config("model.temperature must be non-negative"));
        }
        if self.model.timeout_secs == 0 {
            return Err(Error::config("model.timeout_secs must be at least 1"));
        }
        if self.dispatch.progress_interval == 0 {
            return Err(Error::config("dispatch.progress_interval must be at least 1"));
        }
        self.dispatch_config().validate()?;
        self.retry_policy()?;
        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.model.base_url.clone(),
            model: self.model.name.clone(),
            api_key: self.model.api_key.clone(),
            temperature: self.model.temperature,
            timeout: Duration::from_secs(self.model.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> secdb_core::Result<RetryPolicy> {
        let secs = self.retry.initial_backoff_secs;
        if !secs.is_finite() || secs < 0.0 {
            return Err(Error::config("retry.initial_backoff_secs must be non-negative"));
        }
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs_f64(secs),
            self.retry.multiplier,
        )
    }

    pub fn prompt_template(&self) -> secdb_core::Result<PromptTemplate> {
        let mode = if self.prompt.system_message {
            PromptMode::System
        } else {
            PromptMode::Inline
        };
        match &self.prompt.preamble_path {
            Some(path) => PromptTemplate::from_file(path, mode),
            None => Ok(PromptTemplate::new(DEFAULT_PREAMBLE, mode)),
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            workers: self.dispatch.workers,
        }
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            count_empty_as_hit: self.scoring.count_empty_as_hit,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_basename: default_output_basename(),
            text_field: default_text_field(),
            label_field: default_label_field(),
            limit: None,
            show_comments: true,
            model: ModelConfig::default(),
            prompt: PromptConfig::default(),
            retry: RetryConfig::default(),
            dispatch: DispatchSettings::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

/// Remote model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Falls back to `SECDB_API_KEY` through the CLI
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            base_url: default_base_url(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Replaces the built-in instruction preamble
    #[serde(default)]
    pub preamble_path: Option<PathBuf>,

    /// Send the preamble as a system message
    #[serde(default)]
    pub system_message: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: f64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff_secs(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Completions between live progress lines
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            progress_interval: default_progress_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Empty prediction against empty ground truth counts as a hit
    #[serde(default = "default_true")]
    pub count_empty_as_hit: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            count_empty_as_hit: true,
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("LLM-SecDB.json")
}

fn default_output_basename() -> String {
    "./results/out".to_string()
}

fn default_text_field() -> String {
    "comments".to_string()
}

fn default_label_field() -> String {
    "classification".to_string()
}

fn default_model_name() -> String {
    "openai/gpt-oss-20b".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_backoff_secs() -> f64 {
    2.0
}

fn default_multiplier() -> f64 {
    1.7
}

fn default_workers() -> usize {
    50
}

fn default_progress_interval() -> usize {
    25
}

fn default_true() -> bool {
    true
}

//! Configuration system for claimcheck.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/claimcheck/config.toml` and/or
//! `.claimcheck/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for a claimcheck run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimCheckConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub voting: VotingConfig,
    #[serde(default)]
    pub external: ExternalConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Live verifier back-ends, looked up by name from `voting.verifier_priority_order`.
    #[serde(default = "default_verifiers")]
    pub verifiers: Vec<VerifierConfig>,
}

/// Confidence-scoring weights for the cross-model, external and context sub-scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            beta: 0.4,
            gamma: 0.2,
        }
    }
}

/// Scoring weights after validation, guaranteed non-negative and summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl ScoringConfig {
    /// Validate and renormalize the weights.
    ///
    /// Negative, non-finite, or all-zero weights are rejected. Weights that do not
    /// sum to 1 are scaled proportionally and a warning is logged.
    pub fn normalized(&self) -> Result<ScoringWeights, ConfigError> {
        let weights = [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeights {
                    message: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }

        let sum = self.alpha + self.beta + self.gamma;
        if sum <= 0.0 {
            return Err(ConfigError::InvalidWeights {
                message: "alpha, beta and gamma are all zero".to_string(),
            });
        }

        if (sum - 1.0).abs() > 1e-9 {
            tracing::warn!(
                alpha = self.alpha,
                beta = self.beta,
                gamma = self.gamma,
                sum = sum,
                "Scoring weights do not sum to 1, renormalizing"
            );
        }

        Ok(ScoringWeights {
            alpha: self.alpha / sum,
            beta: self.beta / sum,
            gamma: self.gamma / sum,
        })
    }
}

/// Settings for the prioritized voting engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingConfig {
    /// Verifier names in priority order. The answering model is removed at run time.
    pub verifier_priority_order: Vec<String>,
    /// Deadline for a single batch call to one verifier.
    pub verifier_timeout_ms: u64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            verifier_priority_order: vec![
                "openai".to_string(),
                "anthropic".to_string(),
                "gemini".to_string(),
                "deepseek".to_string(),
            ],
            verifier_timeout_ms: 30_000,
        }
    }
}

/// Settings for the external knowledge-graph consensus check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    pub enabled: bool,
    /// Deadline for a single knowledge-source query.
    pub timeout_ms: u64,
    /// Fraction of patterns that must agree for a source to report Supports or Contradicts.
    pub consensus_threshold: f64,
    /// Extra attempts after a failed or timed-out query.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_backoff_ms: u64,
    /// Identifies this client to public SPARQL endpoints.
    pub user_agent: String,
    pub wikidata_endpoint: String,
    pub dbpedia_endpoint: String,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 20_000,
            consensus_threshold: 0.7,
            retry_attempts: 2,
            retry_backoff_ms: 500,
            user_agent: format!("claimcheck/{}", env!("CARGO_PKG_VERSION")),
            wikidata_endpoint: "https://query.wikidata.org/sparql".to_string(),
            dbpedia_endpoint: "https://dbpedia.org/sparql".to_string(),
        }
    }
}

/// Pipeline-level concurrency limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on claims whose external checks run at the same time.
    pub max_concurrent_claims: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_claims: 4,
        }
    }
}

/// Retry policy for live verifier HTTP calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Which wire protocol a live verifier speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifierProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    /// Any endpoint implementing the OpenAI chat completions API (DeepSeek, vLLM, ...).
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl std::fmt::Display for VerifierProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifierProvider::OpenAi => write!(f, "openai"),
            VerifierProvider::Anthropic => write!(f, "anthropic"),
            VerifierProvider::Gemini => write!(f, "gemini"),
            VerifierProvider::OpenAiCompatible => write!(f, "openai_compatible"),
        }
    }
}

/// One live verifier back-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Name used in `verifier_priority_order` and matched against the excluded model.
    pub name: String,
    pub provider: VerifierProvider,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ClaimCheckConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            voting: VotingConfig::default(),
            external: ExternalConfig::default(),
            pipeline: PipelineConfig::default(),
            retry: RetryConfig::default(),
            verifiers: default_verifiers(),
        }
    }
}

fn default_max_tokens() -> usize {
    200
}

fn default_temperature() -> f32 {
    0.1
}

fn default_verifiers() -> Vec<VerifierConfig> {
    let entry = |name: &str, provider, model: &str, env: &str, base_url: Option<&str>| {
        VerifierConfig {
            name: name.to_string(),
            provider,
            model: model.to_string(),
            api_key_env: env.to_string(),
            base_url: base_url.map(str::to_string),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    };
    vec![
        entry("openai", VerifierProvider::OpenAi, "gpt-4o-mini", "OPENAI_API_KEY", None),
        entry(
            "anthropic",
            VerifierProvider::Anthropic,
            "claude-3-5-sonnet-20241022",
            "ANTHROPIC_API_KEY",
            None,
        ),
        entry("gemini", VerifierProvider::Gemini, "gemini-1.5-flash", "GOOGLE_API_KEY", None),
        entry(
            "deepseek",
            VerifierProvider::OpenAiCompatible,
            "deepseek-chat",
            "DEEPSEEK_API_KEY",
            Some("https://api.deepseek.com/v1"),
        ),
    ]
}

impl ClaimCheckConfig {
    /// Check value ranges. Returns non-fatal warnings; fatal problems are errors.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let mut warnings = Vec::new();

        self.scoring.normalized()?;

        let threshold = self.external.consensus_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid {
                message: format!("external.consensus_threshold must be in (0, 1], got {threshold}"),
            });
        }
        if threshold <= 0.5 {
            warnings.push(format!(
                "external.consensus_threshold is {threshold}; a source can report Supports and Contradicts evidence at once"
            ));
        }

        if self.pipeline.max_concurrent_claims == 0 {
            return Err(ConfigError::Invalid {
                message: "pipeline.max_concurrent_claims must be at least 1".to_string(),
            });
        }

        if self.voting.verifier_timeout_ms == 0 {
            warnings.push("voting.verifier_timeout_ms is 0, every verifier call will time out".to_string());
        }
        if self.external.timeout_ms == 0 {
            warnings.push("external.timeout_ms is 0, every source query will time out".to_string());
        }

        for name in &self.voting.verifier_priority_order {
            if !self.verifiers.iter().any(|v| v.name.eq_ignore_ascii_case(name)) {
                warnings.push(format!(
                    "verifier '{name}' is in the priority order but has no [[verifiers]] entry"
                ));
            }
        }

        Ok(warnings)
    }

    /// Look up a live verifier definition by name (case-insensitive).
    pub fn verifier(&self, name: &str) -> Option<&VerifierConfig> {
        self.verifiers.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

/// Platform directory holding the per-user `config.toml`
/// (`~/.config/claimcheck` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "claimcheck", "claimcheck")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CLAIMCHECK_`)
/// 3. Explicit config file (`--config`)
/// 4. Workspace-local config (`.claimcheck/config.toml`)
/// 5. User config (`~/.config/claimcheck/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&ClaimCheckConfig>,
) -> Result<ClaimCheckConfig, ConfigError> {
    load_config_from(user_config_dir().as_deref(), workspace, config_file, overrides)
}

/// [`load_config`] with the user config directory given explicitly.
/// `None` skips the user layer.
pub fn load_config_from(
    user_dir: Option<&Path>,
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&ClaimCheckConfig>,
) -> Result<ClaimCheckConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ClaimCheckConfig::default()));

    if let Some(dir) = user_dir {
        let user_config = dir.join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".claimcheck").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // CLAIMCHECK_SCORING__ALPHA, CLAIMCHECK_EXTERNAL__TIMEOUT_MS, ...
    figment = figment.merge(Env::prefixed("CLAIMCHECK_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

//! CLI subcommand handlers.

use crate::fixtures::{Dataset, FixtureFile, read_claims};
use crate::report;
use crate::{AnalyzeArgs, Backend, Commands, ConfigAction, EvaluateArgs};
use anyhow::{Context, bail};
use claimcheck_core::config::{ClaimCheckConfig, load_config_from, user_config_dir};
use claimcheck_core::evaluation::{aggregate, evaluate_question};
use claimcheck_core::knowledge::{DbpediaSource, KnowledgeSource, WikidataSource};
use claimcheck_core::pipeline::Pipeline;
use claimcheck_core::providers::create_verifiers;
use claimcheck_core::verifier::Verifier;
use std::path::PathBuf;
use std::sync::Arc;

/// Where configuration layers are read from.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub workspace: PathBuf,
    pub config_file: Option<PathBuf>,
    /// Directory of the per-user `config.toml`; `None` skips that layer.
    pub user_dir: Option<PathBuf>,
}

impl ConfigSources {
    pub fn new(workspace: PathBuf, config_file: Option<PathBuf>) -> Self {
        Self {
            workspace,
            config_file,
            user_dir: user_config_dir(),
        }
    }

    fn load(&self) -> anyhow::Result<ClaimCheckConfig> {
        load_config_from(
            self.user_dir.as_deref(),
            Some(self.workspace.as_path()),
            self.config_file.as_deref(),
            None,
        )
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, sources: &ConfigSources) -> anyhow::Result<()> {
    match command {
        Commands::Analyze(args) => handle_analyze(args, sources).await,
        Commands::Evaluate(args) => handle_evaluate(args, sources).await,
        Commands::Config { action } => handle_config(action, sources),
    }
}

/// Verifiers and knowledge sources for the selected back-end.
fn build_backends(
    backend: &Backend,
    config: &ClaimCheckConfig,
) -> anyhow::Result<(Vec<Arc<dyn Verifier>>, Vec<Arc<dyn KnowledgeSource>>)> {
    if backend.live {
        let verifiers = create_verifiers(&config.verifiers, &config.retry);
        let sources: Vec<Arc<dyn KnowledgeSource>> = vec![
            Arc::new(WikidataSource::new(&config.external)),
            Arc::new(DbpediaSource::new(&config.external)),
        ];
        tracing::info!(verifiers = verifiers.len(), "Using live back-ends");
        return Ok((verifiers, sources));
    }

    let Some(path) = backend.fixtures.as_deref() else {
        bail!("Choose a back-end: --fixtures <FILE> for offline runs or --live for real APIs");
    };
    let fixtures = FixtureFile::load(path)?;
    tracing::info!(
        fixtures = %path.display(),
        verifiers = fixtures.verifiers.len(),
        sources = fixtures.sources.len(),
        "Using fixture back-ends"
    );
    Ok((fixtures.verifiers(), fixtures.sources()))
}

fn apply_overrides(config: &mut ClaimCheckConfig, backend: &Backend) {
    if backend.no_external {
        config.external.enabled = false;
    }
    if let Some(alpha) = backend.alpha {
        config.scoring.alpha = alpha;
    }
    if let Some(beta) = backend.beta {
        config.scoring.beta = beta;
    }
    if let Some(gamma) = backend.gamma {
        config.scoring.gamma = gamma;
    }
    if let Some(threshold) = backend.threshold {
        config.external.consensus_threshold = threshold;
    }
}

async fn handle_analyze(args: AnalyzeArgs, sources: &ConfigSources) -> anyhow::Result<()> {
    let mut config = sources.load()?;
    apply_overrides(&mut config, &args.backend);

    let mut claims = args.claims;
    if let Some(path) = &args.file {
        claims.extend(read_claims(path)?);
    }

    let (verifiers, sources) = build_backends(&args.backend, &config)?;
    let pipeline = Pipeline::new(&config, verifiers, sources).context("Invalid configuration")?;
    let result = pipeline.run(&claims, &args.exclude).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report::render_result(&result));
        if args.breakdown {
            println!();
            print!("{}", report::render_breakdown(&result.breakdown));
        }
    }
    Ok(())
}

async fn handle_evaluate(args: EvaluateArgs, sources: &ConfigSources) -> anyhow::Result<()> {
    let mut config = sources.load()?;
    apply_overrides(&mut config, &args.backend);

    let dataset = Dataset::load(&args.dataset)?;
    let (verifiers, sources) = build_backends(&args.backend, &config)?;
    let pipeline = Pipeline::new(&config, verifiers, sources).context("Invalid configuration")?;

    let mut evaluations = Vec::with_capacity(dataset.questions.len());
    for question in &dataset.questions {
        tracing::info!(
            question_id = %question.id,
            question = question.question.as_deref().unwrap_or(""),
            claims = question.claims.len(),
            "Evaluating question"
        );
        let result = pipeline
            .run(&question.claims, &question.model)
            .await
            .with_context(|| format!("Question {} failed", question.id))?;
        evaluations.push(evaluate_question(&question.id, &result.records, &question.annotations));
    }
    let summary = aggregate(&evaluations);

    if args.json {
        let out = serde_json::json!({ "questions": evaluations, "aggregate": summary });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", report::render_evaluation(&evaluations, &summary));
    }
    Ok(())
}

fn handle_config(action: ConfigAction, sources: &ConfigSources) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = sources.workspace.join(".claimcheck");
            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!("Configuration already exists at {}", config_path.display());
                return Ok(());
            }
            std::fs::create_dir_all(&config_dir)?;
            let toml_str = toml::to_string_pretty(&ClaimCheckConfig::default())?;
            std::fs::write(&config_path, toml_str)?;
            println!("Created {}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = sources.load()?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Validate => {
            let config = sources.load()?;
            let warnings = config.validate().context("Invalid configuration")?;
            if warnings.is_empty() {
                println!("Configuration OK");
            } else {
                for warning in &warnings {
                    println!("warning: {warning}");
                }
            }
            Ok(())
        }
    }
}

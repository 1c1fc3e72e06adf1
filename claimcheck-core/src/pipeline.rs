//! Pipeline orchestrator.
//!
//! Feeds a response's claims through voting, risk classification, the
//! optional external consensus check and confidence scoring, in that order.
//! Verifier and knowledge-source failures are absorbed by the stages
//! themselves; only configuration problems abort a run.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClaimCheckConfig, VotingConfig};
use crate::error::{ConfigError, Result};
use crate::knowledge::{ExternalConsensusVerifier, ExternalReport, KnowledgeSource};
use crate::risk::{self, RiskSummary};
use crate::scoring::{ConfidenceBreakdown, ConfidenceScorer};
use crate::types::ClaimRecord;
use crate::verifier::Verifier;
use crate::voting::{PrioritizedVoting, VotingOutcome};

/// External check result attached to the claim it was run for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCheck {
    pub claim_id: String,
    pub report: ExternalReport,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub records: Vec<ClaimRecord>,
    pub overall_confidence: f64,
    pub breakdown: ConfidenceBreakdown,
    pub summary: RiskSummary,
    pub voting: VotingOutcome,
    /// One entry per claim that was sent to the knowledge sources, in claim order.
    pub external_checks: Vec<ExternalCheck>,
}

/// Verification-and-scoring pipeline over injected verifiers and sources.
pub struct Pipeline {
    verifiers: Vec<Arc<dyn Verifier>>,
    external: Option<ExternalConsensusVerifier>,
    scorer: ConfidenceScorer,
    voting: VotingConfig,
    max_concurrent_claims: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "verifiers",
                &self.verifiers.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .field(
                "sources",
                &self.external.as_ref().map(|e| e.source_names()),
            )
            .field("scorer", &self.scorer)
            .field("max_concurrent_claims", &self.max_concurrent_claims)
            .finish()
    }
}

impl Pipeline {
    /// Wire a pipeline from configuration.
    ///
    /// External checks are skipped entirely when `external.enabled` is false or
    /// no source is supplied.
    pub fn new(
        config: &ClaimCheckConfig,
        verifiers: Vec<Arc<dyn Verifier>>,
        sources: Vec<Arc<dyn KnowledgeSource>>,
    ) -> std::result::Result<Self, ConfigError> {
        for warning in config.validate()? {
            warn!(warning = %warning, "Configuration warning");
        }
        let scorer = ConfidenceScorer::new(&config.scoring)?;
        let external = (config.external.enabled && !sources.is_empty())
            .then(|| ExternalConsensusVerifier::new(sources, &config.external));

        Ok(Self {
            verifiers,
            external,
            scorer,
            voting: config.voting.clone(),
            max_concurrent_claims: config.pipeline.max_concurrent_claims.max(1),
        })
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub fn external_enabled(&self) -> bool {
        self.external.is_some()
    }

    /// Analyze one response's claims. `excluded_verifier` names the model that
    /// wrote the response; it never judges its own claims.
    pub async fn run(&self, claims: &[String], excluded_verifier: &str) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        if claims.is_empty() {
            info!(run_id = %run_id, "No claims supplied, nothing to verify");
            return Ok(PipelineResult {
                run_id,
                started_at,
                duration_ms: 0,
                records: Vec::new(),
                overall_confidence: 0.0,
                breakdown: self.scorer.breakdown(Vec::new()),
                summary: RiskSummary::default(),
                voting: VotingOutcome::default(),
                external_checks: Vec::new(),
            });
        }

        let voting = PrioritizedVoting::new(
            self.verifiers.clone(),
            &self.voting.verifier_priority_order,
            excluded_verifier,
            Duration::from_millis(self.voting.verifier_timeout_ms),
        )?;

        info!(
            run_id = %run_id,
            claims = claims.len(),
            excluded = excluded_verifier,
            "Pipeline run started"
        );

        let mut records: Vec<ClaimRecord> = claims
            .iter()
            .enumerate()
            .map(|(idx, text)| ClaimRecord::new(idx, text.as_str()))
            .collect();

        let voting_outcome = voting.vote(&mut records).await?;
        let external_checks = self.check_external(&mut records).await?;
        let breakdown = self.scorer.score_all(&mut records);
        let summary = RiskSummary::from_records(&records);
        let duration_ms = clock.elapsed().as_millis() as u64;

        info!(
            run_id = %run_id,
            overall_confidence = breakdown.overall_confidence,
            label = %breakdown.label,
            high = summary.high,
            medium = summary.medium,
            low = summary.low,
            external_checks = external_checks.len(),
            duration_ms,
            "Pipeline run complete"
        );

        Ok(PipelineResult {
            run_id,
            started_at,
            duration_ms,
            overall_confidence: breakdown.overall_confidence,
            records,
            breakdown,
            summary,
            voting: voting_outcome,
            external_checks,
        })
    }

    /// Run the external check for every claim whose first two opinions left it
    /// at medium risk, at most `max_concurrent_claims` at a time.
    async fn check_external(&self, records: &mut [ClaimRecord]) -> Result<Vec<ExternalCheck>> {
        let Some(external) = self.external.as_ref() else {
            return Ok(Vec::new());
        };

        let targets: Vec<(usize, String)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| risk::should_check_external(record))
            .map(|(idx, record)| (idx, record.text.clone()))
            .collect();

        if targets.is_empty() {
            debug!("No medium-risk claims, external check skipped");
            return Ok(Vec::new());
        }

        let mut reports: Vec<(usize, ExternalReport)> = stream::iter(targets)
            .map(|(idx, text)| async move { (idx, external.verify(&text).await) })
            .buffer_unordered(self.max_concurrent_claims)
            .collect()
            .await;
        reports.sort_by_key(|(idx, _)| *idx);

        let mut checks = Vec::with_capacity(reports.len());
        for (idx, report) in reports {
            let record = &mut records[idx];
            record.set_external_status(report.status)?;
            debug!(
                claim_id = %record.id,
                status = %report.status,
                risk = ?record.risk_level(),
                "External status applied"
            );
            checks.push(ExternalCheck {
                claim_id: record.id.clone(),
                report,
            });
        }
        Ok(checks)
    }
}

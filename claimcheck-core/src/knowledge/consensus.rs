//! Cross-source consensus over knowledge-source lookups.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::KnowledgeSource;
use super::entities::{Entity, FactPattern, detect_entity, extract_fact_patterns};
use crate::config::ExternalConfig;
use crate::error::SourceError;
use crate::types::ExternalStatus;

/// One source's tally for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    /// `None` when every query to this source failed; the source is then left out of the vote.
    pub status: Option<ExternalStatus>,
    pub supports: usize,
    pub contradicts: usize,
    pub failed: usize,
    pub total: usize,
}

/// Outcome of an external check, with enough detail to audit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReport {
    pub status: ExternalStatus,
    pub entity: Option<String>,
    pub patterns: Vec<FactPattern>,
    pub sources: Vec<SourceReport>,
}

impl ExternalReport {
    fn early(status: ExternalStatus, entity: Option<&Entity>) -> Self {
        Self {
            status,
            entity: entity.map(|e| e.name.to_string()),
            patterns: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// Per-source verdict from pattern tallies.
///
/// Failed queries count toward `total` but toward neither side.
pub fn source_status(supports: usize, contradicts: usize, total: usize, threshold: f64) -> ExternalStatus {
    if total == 0 {
        return ExternalStatus::Unclear;
    }
    let total = total as f64;
    if supports as f64 / total >= threshold {
        ExternalStatus::Supports
    } else if contradicts as f64 / total >= threshold {
        ExternalStatus::Contradicts
    } else {
        ExternalStatus::Unclear
    }
}

/// Majority vote over per-source statuses.
///
/// A Supports/Contradicts tie is Unclear. Other ties go to the first status in
/// [`ExternalStatus::PRIORITY`]. No votes means NotFound.
pub fn consensus(statuses: &[ExternalStatus]) -> ExternalStatus {
    if statuses.is_empty() {
        return ExternalStatus::NotFound;
    }

    let counts = ExternalStatus::PRIORITY.map(|status| statuses.iter().filter(|s| **s == status).count());
    let max = counts.iter().copied().max().unwrap_or(0);
    let winners: Vec<ExternalStatus> = ExternalStatus::PRIORITY
        .iter()
        .zip(counts.iter())
        .filter(|(_, count)| **count == max)
        .map(|(status, _)| *status)
        .collect();

    if winners.contains(&ExternalStatus::Supports) && winners.contains(&ExternalStatus::Contradicts) {
        return ExternalStatus::Unclear;
    }
    winners[0]
}

/// Corroborates claims against every configured knowledge source.
pub struct ExternalConsensusVerifier {
    sources: Vec<Arc<dyn KnowledgeSource>>,
    timeout: Duration,
    retry_attempts: u32,
    retry_backoff: Duration,
    threshold: f64,
}

impl ExternalConsensusVerifier {
    pub fn new(sources: Vec<Arc<dyn KnowledgeSource>>, config: &ExternalConfig) -> Self {
        Self {
            sources,
            timeout: Duration::from_millis(config.timeout_ms),
            retry_attempts: config.retry_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            threshold: config.consensus_threshold,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Check one claim. Never fails; unreachable sources are excluded from the vote.
    pub async fn verify(&self, claim: &str) -> ExternalReport {
        let Some(entity) = detect_entity(claim) else {
            debug!("No registered entity in claim");
            return ExternalReport::early(ExternalStatus::NotFound, None);
        };

        let patterns = extract_fact_patterns(claim);
        if patterns.is_empty() {
            debug!(entity = entity.name, "No checkable fact patterns");
            return ExternalReport::early(ExternalStatus::Unclear, Some(entity));
        }

        let sources = join_all(
            self.sources
                .iter()
                .map(|source| self.evaluate(source.as_ref(), entity, &patterns)),
        )
        .await;

        let votes: Vec<ExternalStatus> = sources.iter().filter_map(|r| r.status).collect();
        let status = consensus(&votes);
        info!(
            entity = entity.name,
            patterns = patterns.len(),
            votes = ?votes,
            status = %status,
            "External consensus"
        );

        ExternalReport {
            status,
            entity: Some(entity.name.to_string()),
            patterns,
            sources,
        }
    }

    async fn evaluate(
        &self,
        source: &dyn KnowledgeSource,
        entity: &Entity,
        patterns: &[FactPattern],
    ) -> SourceReport {
        let entity_id = source.entity_id(entity);
        let mut report = SourceReport {
            source: source.name().to_string(),
            status: None,
            supports: 0,
            contradicts: 0,
            failed: 0,
            total: patterns.len(),
        };

        for pattern in patterns {
            let property_id = source.property_id(pattern.kind);
            match self.query_with_retry(source, entity_id, property_id).await {
                Ok(values) if pattern.matches(&values) => report.supports += 1,
                Ok(values) => {
                    debug!(
                        source = source.name(),
                        kind = %pattern.kind,
                        expected = %pattern.expected,
                        returned = ?values,
                        "Pattern not confirmed"
                    );
                    report.contradicts += 1;
                }
                Err(e) => {
                    warn!(source = source.name(), kind = %pattern.kind, error = %e, "Source query failed");
                    report.failed += 1;
                }
            }
        }

        if report.failed < report.total {
            report.status = Some(source_status(
                report.supports,
                report.contradicts,
                report.total,
                self.threshold,
            ));
        } else {
            warn!(source = source.name(), "Every query failed, excluding source from vote");
        }
        report
    }

    async fn query_with_retry(
        &self,
        source: &dyn KnowledgeSource,
        entity_id: &str,
        property_id: &str,
    ) -> Result<Vec<String>, SourceError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, source.query(entity_id, property_id)).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout {
                    source_name: source.name().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(values) => return Ok(values),
                Err(e @ SourceError::InvalidQuery { .. }) => return Err(e),
                Err(e) if attempt >= self.retry_attempts => return Err(e),
                Err(e) => {
                    let backoff = self.retry_backoff * 2u32.saturating_pow(attempt);
                    debug!(
                        source = source.name(),
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying source query"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

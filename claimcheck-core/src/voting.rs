//! Prioritized multi-verifier voting.
//!
//! Verifiers #1 and #2 judge the full batch. Claims they disagree on form a
//! contradiction set that goes to verifier #3 as one sub-batch, and the final
//! verdict is a majority over the three opinions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::types::{ClaimRecord, OpinionOutcome, Verdict};
use crate::verifier::Verifier;

/// What a voting round did, for logging and the confidence breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotingOutcome {
    /// Verifier names in the order they were consulted.
    pub verifiers_used: Vec<String>,
    /// Batch calls issued across all verifiers.
    pub calls: usize,
    /// Claims sent to the third verifier.
    pub escalated: usize,
    /// Contradictions left Uncertain because no third verifier exists.
    pub unresolved: usize,
    /// Opinions padded after a failed, timed-out or short verifier reply.
    pub padded_opinions: usize,
}

/// Majority over three opinions. All distinct resolves to `Uncertain`.
pub fn majority(a: Verdict, b: Verdict, c: Verdict) -> Verdict {
    if a == b || a == c {
        a
    } else if b == c {
        b
    } else {
        Verdict::Uncertain
    }
}

/// Voting engine over a priority-ordered verifier list.
pub struct PrioritizedVoting {
    verifiers: Vec<Arc<dyn Verifier>>,
    timeout: Duration,
}

impl std::fmt::Debug for PrioritizedVoting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrioritizedVoting")
            .field("verifiers", &self.names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PrioritizedVoting {
    /// Order `available` by `priority_order`, drop the verifier named `excluded`
    /// (case-insensitive), and require at least two remaining.
    ///
    /// Verifiers missing from `priority_order` follow the listed ones in the
    /// order they were supplied.
    pub fn new(
        available: Vec<Arc<dyn Verifier>>,
        priority_order: &[String],
        excluded: &str,
        timeout: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        let mut remaining: Vec<Arc<dyn Verifier>> = available
            .into_iter()
            .filter(|v| !v.name().eq_ignore_ascii_case(excluded))
            .collect();

        let mut verifiers = Vec::with_capacity(remaining.len());
        for name in priority_order {
            if let Some(pos) = remaining
                .iter()
                .position(|v| v.name().eq_ignore_ascii_case(name))
            {
                verifiers.push(remaining.remove(pos));
            }
        }
        verifiers.extend(remaining);

        if verifiers.len() < 2 {
            return Err(ConfigError::TooFewVerifiers {
                available: verifiers.len(),
            });
        }

        info!(
            verifiers = ?verifiers.iter().map(|v| v.name().to_string()).collect::<Vec<_>>(),
            excluded = excluded,
            "Voting engine ready"
        );

        Ok(Self { verifiers, timeout })
    }

    /// Verifier names in priority order.
    pub fn names(&self) -> Vec<String> {
        self.verifiers.iter().map(|v| v.name().to_string()).collect()
    }

    /// Settle `final_verdict` for every record.
    pub async fn vote(&self, records: &mut [ClaimRecord]) -> Result<VotingOutcome> {
        let mut outcome = VotingOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let first = &self.verifiers[0];
        let second = &self.verifiers[1];
        let claims: Vec<String> = records.iter().map(|r| r.text.clone()).collect();

        let (first_opinions, second_opinions) = tokio::join!(
            self.consult(first.as_ref(), &claims),
            self.consult(second.as_ref(), &claims)
        );
        outcome.calls += 2;
        outcome.verifiers_used.push(first.name().to_string());
        outcome.verifiers_used.push(second.name().to_string());

        let mut contradictions = Vec::new();
        for (idx, record) in records.iter_mut().enumerate() {
            let (v1, o1) = first_opinions[idx];
            let (v2, o2) = second_opinions[idx];
            record.record_opinion(first.name(), v1, o1);
            record.record_opinion(second.name(), v2, o2);
            outcome.padded_opinions += [o1, o2]
                .iter()
                .filter(|o| **o == OpinionOutcome::Failed)
                .count();

            if v1 == v2 {
                record.resolve(v1, false)?;
            } else {
                debug!(claim_id = %record.id, first = %v1, second = %v2, "Verifiers disagree");
                contradictions.push(idx);
            }
        }

        if contradictions.is_empty() {
            return Ok(outcome);
        }

        let Some(third) = self.verifiers.get(2) else {
            warn!(
                contradictions = contradictions.len(),
                "No third verifier available, contradictions stay Uncertain"
            );
            for &idx in &contradictions {
                records[idx].resolve(Verdict::Uncertain, true)?;
            }
            outcome.unresolved = contradictions.len();
            return Ok(outcome);
        };

        let sub_batch: Vec<String> = contradictions.iter().map(|&i| claims[i].clone()).collect();
        let third_opinions = self.consult(third.as_ref(), &sub_batch).await;
        outcome.calls += 1;
        outcome.escalated = contradictions.len();
        outcome.verifiers_used.push(third.name().to_string());

        for (&idx, &(v3, o3)) in contradictions.iter().zip(third_opinions.iter()) {
            let record = &mut records[idx];
            record.record_opinion(third.name(), v3, o3);
            if o3 == OpinionOutcome::Failed {
                outcome.padded_opinions += 1;
            }
            let (v1, v2) = record.primary_verdicts().unwrap_or((Verdict::Uncertain, Verdict::Uncertain));
            let verdict = majority(v1, v2, v3);
            debug!(claim_id = %record.id, third = %v3, verdict = %verdict, "Contradiction resolved by vote");
            record.resolve(verdict, true)?;
        }

        info!(
            claims = records.len(),
            escalated = outcome.escalated,
            padded = outcome.padded_opinions,
            "Voting complete"
        );
        Ok(outcome)
    }

    /// Call one verifier under the timeout and normalize its reply to exactly
    /// `claims.len()` opinions.
    async fn consult(
        &self,
        verifier: &dyn Verifier,
        claims: &[String],
    ) -> Vec<(Verdict, OpinionOutcome)> {
        let reply = tokio::time::timeout(self.timeout, verifier.verify_batch(claims)).await;
        let raw = match reply {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(verifier = verifier.name(), error = %e, "Verifier call failed, padding with Uncertain");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    verifier = verifier.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Verifier call timed out, padding with Uncertain"
                );
                Vec::new()
            }
        };
        align_answers(verifier.name(), &raw, claims.len())
    }
}

/// Normalize raw answers, pad missing entries with failed `Uncertain`
/// opinions, and drop extras.
fn align_answers(verifier: &str, raw: &[String], expected: usize) -> Vec<(Verdict, OpinionOutcome)> {
    if raw.len() > expected {
        debug!(verifier = verifier, got = raw.len(), expected = expected, "Truncating extra answers");
    } else if !raw.is_empty() && raw.len() < expected {
        warn!(verifier = verifier, got = raw.len(), expected = expected, "Short verifier reply");
    }

    let mut aligned: Vec<(Verdict, OpinionOutcome)> = raw
        .iter()
        .take(expected)
        .map(|answer| (Verdict::normalize(answer), OpinionOutcome::Answered))
        .collect();
    aligned.resize(expected, (Verdict::Uncertain, OpinionOutcome::Failed));
    aligned
}

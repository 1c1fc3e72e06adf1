//! Claim risk classification.
//!
//! Maps a verdict plus optional external evidence to a coarse risk level, and
//! decides which claims are ambiguous enough to justify an external lookup.

use serde::{Deserialize, Serialize};

use crate::types::{ClaimRecord, ExternalStatus, RiskLevel, Verdict};

/// How external evidence changed a claim's risk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskAdjustment {
    /// Medium risk lowered to low by supporting evidence.
    Downgrade,
    /// Forced to a specific level regardless of the verdict.
    Override(RiskLevel),
    NoChange,
}

/// Risk implied by a final verdict alone.
pub fn base_risk(verdict: Verdict) -> RiskLevel {
    match verdict {
        Verdict::Yes => RiskLevel::Low,
        Verdict::No => RiskLevel::High,
        Verdict::Uncertain => RiskLevel::Medium,
    }
}

/// Risk implied by the first two opinions, before any escalation.
///
/// Agreement maps through [`base_risk`]; disagreement is medium.
pub fn pre_escalation_risk(first: Verdict, second: Verdict) -> RiskLevel {
    if first == second {
        base_risk(first)
    } else {
        RiskLevel::Medium
    }
}

/// Whether a claim should be corroborated against external sources.
///
/// Only claims whose first two opinions leave them at medium risk qualify, so
/// a third verifier resolving the contradiction does not cancel the lookup.
pub fn should_check_external(record: &ClaimRecord) -> bool {
    match record.primary_verdicts() {
        Some((first, second)) => pre_escalation_risk(first, second) == RiskLevel::Medium,
        None => false,
    }
}

/// The adjustment external evidence applies to `base`.
pub fn risk_adjustment(base: RiskLevel, external: Option<ExternalStatus>) -> RiskAdjustment {
    match external {
        Some(ExternalStatus::Supports) if base == RiskLevel::Medium => RiskAdjustment::Downgrade,
        Some(ExternalStatus::Contradicts) => RiskAdjustment::Override(RiskLevel::High),
        _ => RiskAdjustment::NoChange,
    }
}

/// Final risk after external evidence.
///
/// Supports only lowers medium to low; Contradicts always means high.
pub fn adjusted_risk(base: RiskLevel, external: Option<ExternalStatus>) -> RiskLevel {
    match risk_adjustment(base, external) {
        RiskAdjustment::Downgrade => RiskLevel::Low,
        RiskAdjustment::Override(level) => level,
        RiskAdjustment::NoChange => base,
    }
}

/// Risk counts over one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskSummary {
    pub fn from_records(records: &[ClaimRecord]) -> Self {
        let mut summary = Self::default();
        for level in records.iter().filter_map(ClaimRecord::risk_level) {
            match level {
                RiskLevel::High => summary.high += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::Low => summary.low += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    /// The highest level present, if any claim was classified.
    pub fn worst(&self) -> Option<RiskLevel> {
        if self.high > 0 {
            Some(RiskLevel::High)
        } else if self.medium > 0 {
            Some(RiskLevel::Medium)
        } else if self.low > 0 {
            Some(RiskLevel::Low)
        } else {
            None
        }
    }
}

//! Confidence scoring.
//!
//! Each claim's confidence is `alpha * cross_model + beta * external + gamma * context`.
//! The response-level confidence is the weight-averaged claim confidence, where
//! a claim's weight reflects how much it matters (length, key topic words).
//! Every intermediate value is kept in a [`ConfidenceBreakdown`] so a caller can
//! reproduce the result.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::{ScoringConfig, ScoringWeights};
use crate::error::ConfigError;
use crate::types::{ClaimRecord, ExternalStatus, Verdict, VerifierOpinion};

/// Qualitative reading of an overall confidence value. For reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    High,
    Medium,
    LowMedium,
    Low,
}

impl ConfidenceLabel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            ConfidenceLabel::High
        } else if confidence >= 0.6 {
            ConfidenceLabel::Medium
        } else if confidence >= 0.4 {
            ConfidenceLabel::LowMedium
        } else {
            ConfidenceLabel::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLabel::High => write!(f, "high"),
            ConfidenceLabel::Medium => write!(f, "medium"),
            ConfidenceLabel::LowMedium => write!(f, "low-medium"),
            ConfidenceLabel::Low => write!(f, "low"),
        }
    }
}

/// Agreement score for the two primary opinions. Order does not matter.
pub fn cross_model_score(first: Verdict, second: Verdict) -> f64 {
    use Verdict::*;
    match (first, second) {
        (Yes, Yes) => 0.9,
        (No, No) => 0.1,
        (Uncertain, Uncertain) => 0.3,
        (Yes, No) | (No, Yes) => 0.2,
        (Uncertain, Yes) | (Yes, Uncertain) => 0.5,
        (Uncertain, No) | (No, Uncertain) => 0.3,
    }
}

/// Used when a record has fewer than two opinions.
const CROSS_MODEL_FALLBACK: f64 = 0.4;

/// Score for external evidence; unchecked claims are neutral.
pub fn external_score(status: Option<ExternalStatus>) -> f64 {
    match status {
        None => 0.5,
        Some(ExternalStatus::Supports) => 0.9,
        Some(ExternalStatus::Contradicts) => 0.1,
        Some(ExternalStatus::Unclear) => 0.4,
        Some(ExternalStatus::NotFound) => 0.3,
    }
}

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").expect("year"));

static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},?\s+\d{4}\b",
    )
    .expect("full date")
});

static PROPER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").expect("proper name"));

static IN_PLACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bin\s+[A-Z][a-z]+\b").expect("in place"));

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(\.\d+)?\s*(km|miles|meters|feet|kg|pounds|years|months|days)\b")
        .expect("measurement")
});

static SCIENTIFIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(theory|law|principle|equation|formula)\s+of\b").expect("scientific")
});

static HEDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(probably|might|could|seems|appears|likely|perhaps|possibly)\b").expect("hedge")
});

static IMPORTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(theory|discovery|invention|principle|law|born|died|published|awarded|prize|president|founded|established|created)\b",
    )
    .expect("importance keywords")
});

/// Heuristic for how concretely checkable a claim is.
pub fn context_score(claim: &str) -> f64 {
    let bonuses: [(&Regex, f64); 6] = [
        (&*YEAR, 0.2),
        (&*FULL_DATE, 0.3),
        (&*PROPER_NAME, 0.1),
        (&*IN_PLACE, 0.1),
        (&*MEASUREMENT, 0.15),
        (&*SCIENTIFIC, 0.1),
    ];

    let mut score = 0.5;
    for (pattern, bonus) in bonuses {
        if pattern.is_match(claim) {
            score += bonus;
        }
    }

    let words = claim.split_whitespace().count();
    if words > 20 {
        score -= 0.2;
    } else if words > 15 {
        score -= 0.1;
    } else if words < 5 {
        score += 0.1;
    }

    score -= 0.1 * HEDGE.find_iter(claim).count() as f64;
    score.clamp(0.0, 1.0)
}

/// Importance of a claim in the overall average, in `[0.5, 2.0]`.
pub fn claim_weight(claim: &str) -> f64 {
    let words = claim.split_whitespace().count();
    let mut weight = 1.0;
    if words > 15 {
        weight += 0.3;
    } else if words > 10 {
        weight += 0.2;
    } else if words < 5 {
        weight -= 0.2;
    }
    weight += 0.1 * IMPORTANT.find_iter(claim).count() as f64;
    weight.clamp(0.5, 2.0)
}

/// Weighted mean of `(value, weight)` pairs; 0.0 when empty or weightless.
pub fn weighted_mean(items: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = items.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    items.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight
}

/// Every input and intermediate value behind one claim's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimScore {
    pub claim_id: String,
    pub claim_text: String,
    pub opinions: Vec<VerifierOpinion>,
    pub external_status: Option<ExternalStatus>,
    pub cross_model_score: f64,
    pub external_score: f64,
    pub context_score: f64,
    pub cross_model_weighted: f64,
    pub external_weighted: f64,
    pub context_weighted: f64,
    pub confidence: f64,
    pub weight: f64,
    pub weighted_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub avg_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub avg_weight: f64,
}

/// Audit trail for a response's overall confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub weights: ScoringWeights,
    pub claims: Vec<ClaimScore>,
    pub total_weight: f64,
    pub total_weighted_confidence: f64,
    /// Absent when there are no claims.
    pub summary: Option<SummaryStats>,
    pub overall_confidence: f64,
    pub label: ConfidenceLabel,
}

/// Computes per-claim and overall confidence from validated weights.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    /// Validate and normalize the configured weights.
    pub fn new(config: &ScoringConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weights: config.normalized()?,
        })
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// `alpha * cross_model + beta * external + gamma * context`.
    pub fn combine(&self, cross_model: f64, external: f64, context: f64) -> f64 {
        self.weights.alpha * cross_model + self.weights.beta * external + self.weights.gamma * context
    }

    pub fn score_claim(&self, record: &ClaimRecord) -> ClaimScore {
        let cross_model = record
            .primary_verdicts()
            .map(|(a, b)| cross_model_score(a, b))
            .unwrap_or(CROSS_MODEL_FALLBACK);
        let external = external_score(record.external_status());
        let context = context_score(&record.text);

        let cross_model_weighted = self.weights.alpha * cross_model;
        let external_weighted = self.weights.beta * external;
        let context_weighted = self.weights.gamma * context;
        let confidence = (cross_model_weighted + external_weighted + context_weighted).clamp(0.0, 1.0);
        let weight = claim_weight(&record.text);

        ClaimScore {
            claim_id: record.id.clone(),
            claim_text: record.text.clone(),
            opinions: record.verifier_opinions().to_vec(),
            external_status: record.external_status(),
            cross_model_score: cross_model,
            external_score: external,
            context_score: context,
            cross_model_weighted,
            external_weighted,
            context_weighted,
            confidence,
            weight,
            weighted_confidence: confidence * weight,
        }
    }

    /// Score every record, write its confidence, and aggregate.
    pub fn score_all(&self, records: &mut [ClaimRecord]) -> ConfidenceBreakdown {
        let claims: Vec<ClaimScore> = records
            .iter_mut()
            .map(|record| {
                let score = self.score_claim(record);
                record.set_confidence(score.confidence);
                score
            })
            .collect();
        self.breakdown(claims)
    }

    /// Aggregate already computed claim scores.
    pub fn breakdown(&self, claims: Vec<ClaimScore>) -> ConfidenceBreakdown {
        let pairs: Vec<(f64, f64)> = claims.iter().map(|c| (c.confidence, c.weight)).collect();
        let overall_confidence = weighted_mean(&pairs);
        let total_weight: f64 = claims.iter().map(|c| c.weight).sum();
        let total_weighted_confidence: f64 = claims.iter().map(|c| c.weighted_confidence).sum();

        let summary = (!claims.is_empty()).then(|| {
            let n = claims.len() as f64;
            SummaryStats {
                avg_confidence: claims.iter().map(|c| c.confidence).sum::<f64>() / n,
                min_confidence: claims.iter().map(|c| c.confidence).fold(f64::INFINITY, f64::min),
                max_confidence: claims
                    .iter()
                    .map(|c| c.confidence)
                    .fold(f64::NEG_INFINITY, f64::max),
                avg_weight: total_weight / n,
            }
        });

        ConfidenceBreakdown {
            weights: self.weights,
            claims,
            total_weight,
            total_weighted_confidence,
            summary,
            overall_confidence,
            label: ConfidenceLabel::from_confidence(overall_confidence),
        }
    }
}

//! Core data types: verdicts, external evidence status, risk levels, and the
//! per-claim record that flows through the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, Result};
use crate::risk;

/// A verifier's opinion on a claim after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Yes,
    No,
    Uncertain,
}

/// Raw answers that normalize to `Yes`.
const YES_ANSWERS: &[&str] = &["yes", "true", "correct", "supported", "agree"];

/// Raw answers that normalize to `No`.
const NO_ANSWERS: &[&str] = &["no", "false", "incorrect", "contradicted", "disagree"];

impl Verdict {
    /// Normalize a raw verifier answer. Case-insensitive; unknown input is `Uncertain`.
    pub fn normalize(raw: &str) -> Self {
        let answer = raw.trim().to_lowercase();
        if YES_ANSWERS.contains(&answer.as_str()) {
            Verdict::Yes
        } else if NO_ANSWERS.contains(&answer.as_str()) {
            Verdict::No
        } else {
            Verdict::Uncertain
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Yes => write!(f, "Yes"),
            Verdict::No => write!(f, "No"),
            Verdict::Uncertain => write!(f, "Uncertain"),
        }
    }
}

/// Result of corroborating a claim against external knowledge sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalStatus {
    Supports,
    Contradicts,
    Unclear,
    NotFound,
}

impl ExternalStatus {
    /// All statuses in tie-break priority order.
    pub const PRIORITY: [ExternalStatus; 4] = [
        ExternalStatus::Supports,
        ExternalStatus::Contradicts,
        ExternalStatus::Unclear,
        ExternalStatus::NotFound,
    ];
}

impl std::fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalStatus::Supports => write!(f, "Supports"),
            ExternalStatus::Contradicts => write!(f, "Contradicts"),
            ExternalStatus::Unclear => write!(f, "Unclear"),
            ExternalStatus::NotFound => write!(f, "NotFound"),
        }
    }
}

/// Coarse hallucination risk bucket for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Whether an opinion came from a verifier answer or was filled in after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpinionOutcome {
    /// The verifier returned an answer for this claim.
    Answered,
    /// The call failed, timed out, or returned too few answers; the verdict is padding.
    Failed,
}

/// One verifier's normalized opinion on one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierOpinion {
    pub verifier: String,
    pub verdict: Verdict,
    pub outcome: OpinionOutcome,
}

/// One extracted factual claim and everything the pipeline learns about it.
///
/// Derived fields (`risk_level`, `confidence`) are only written by the record
/// itself or by the scorer, always from the other fields. Deserialized records
/// go through the same checks (see [`ClaimRecordWire`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ClaimRecordWire")]
pub struct ClaimRecord {
    pub id: String,
    pub text: String,
    verifier_opinions: Vec<VerifierOpinion>,
    voting_used: bool,
    final_verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_status: Option<ExternalStatus>,
    risk_level: Option<RiskLevel>,
    confidence: Option<f64>,
}

impl ClaimRecord {
    /// Create a record for the claim at `index` (0-based) in the response.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("C{}", index + 1),
            text: text.into(),
            verifier_opinions: Vec::new(),
            voting_used: false,
            final_verdict: None,
            external_status: None,
            risk_level: None,
            confidence: None,
        }
    }

    pub fn verifier_opinions(&self) -> &[VerifierOpinion] {
        &self.verifier_opinions
    }

    pub fn voting_used(&self) -> bool {
        self.voting_used
    }

    pub fn final_verdict(&self) -> Option<Verdict> {
        self.final_verdict
    }

    pub fn external_status(&self) -> Option<ExternalStatus> {
        self.external_status
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_level
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// The first two verdicts, in verifier priority order.
    pub fn primary_verdicts(&self) -> Option<(Verdict, Verdict)> {
        match self.verifier_opinions.as_slice() {
            [first, second, ..] => Some((first.verdict, second.verdict)),
            _ => None,
        }
    }

    /// Append a verifier opinion.
    pub fn record_opinion(
        &mut self,
        verifier: impl Into<String>,
        verdict: Verdict,
        outcome: OpinionOutcome,
    ) {
        self.verifier_opinions.push(VerifierOpinion {
            verifier: verifier.into(),
            verdict,
            outcome,
        });
    }

    /// Settle the final verdict. Requires at least two opinions.
    pub fn resolve(&mut self, verdict: Verdict, voting_used: bool) -> Result<()> {
        if self.verifier_opinions.len() < 2 {
            return Err(CheckError::InvalidState {
                claim_id: self.id.clone(),
                message: format!(
                    "final verdict needs at least 2 opinions, have {}",
                    self.verifier_opinions.len()
                ),
            });
        }
        self.final_verdict = Some(verdict);
        self.voting_used = voting_used;
        self.refresh_risk();
        Ok(())
    }

    /// Attach the external consensus result. Only valid once the verdict is final.
    pub fn set_external_status(&mut self, status: ExternalStatus) -> Result<()> {
        if self.final_verdict.is_none() {
            return Err(CheckError::InvalidState {
                claim_id: self.id.clone(),
                message: "external status set before final verdict".to_string(),
            });
        }
        self.external_status = Some(status);
        self.refresh_risk();
        Ok(())
    }

    pub(crate) fn set_confidence(&mut self, confidence: f64) {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
    }

    /// Whether every pipeline stage has written its field.
    pub fn is_terminal(&self) -> bool {
        self.final_verdict.is_some() && self.risk_level.is_some() && self.confidence.is_some()
    }

    fn refresh_risk(&mut self) {
        self.risk_level = self
            .final_verdict
            .map(|verdict| risk::adjusted_risk(risk::base_risk(verdict), self.external_status));
    }
}

/// Serialized form of a [`ClaimRecord`], validated on the way in.
#[derive(Deserialize)]
struct ClaimRecordWire {
    id: String,
    text: String,
    #[serde(default)]
    verifier_opinions: Vec<VerifierOpinion>,
    #[serde(default)]
    voting_used: bool,
    final_verdict: Option<Verdict>,
    external_status: Option<ExternalStatus>,
    risk_level: Option<RiskLevel>,
    confidence: Option<f64>,
}

impl TryFrom<ClaimRecordWire> for ClaimRecord {
    type Error = CheckError;

    /// Replays the lifecycle mutators so a decoded record obeys the same rules
    /// as one built by the pipeline.
    fn try_from(wire: ClaimRecordWire) -> Result<Self> {
        let invalid = |message: String| CheckError::InvalidState {
            claim_id: wire.id.clone(),
            message,
        };

        let mut record = ClaimRecord {
            id: wire.id.clone(),
            text: wire.text.clone(),
            verifier_opinions: wire.verifier_opinions.clone(),
            voting_used: false,
            final_verdict: None,
            external_status: None,
            risk_level: None,
            confidence: None,
        };

        match wire.final_verdict {
            Some(verdict) => record.resolve(verdict, wire.voting_used)?,
            None if wire.voting_used => {
                return Err(invalid("voting_used set without a final verdict".to_string()));
            }
            None => {}
        }
        if let Some(status) = wire.external_status {
            record.set_external_status(status)?;
        }
        if wire.risk_level != record.risk_level {
            return Err(invalid(format!(
                "risk_level {:?} does not follow from the verdict and external status (expected {:?})",
                wire.risk_level, record.risk_level
            )));
        }
        if let Some(confidence) = wire.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(invalid(format!("confidence {confidence} is outside [0, 1]")));
            }
            record.confidence = Some(confidence);
        }
        Ok(record)
    }
}

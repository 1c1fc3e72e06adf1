//! Evaluation of final verdicts against manual annotations.
//!
//! A claim the pipeline settled as `Yes` counts as "verified"; anything else
//! counts as "flagged". Comparing that against a human `correct`/`incorrect`
//! label gives a binary confusion matrix per question, which aggregates across
//! questions either by pooling counts (micro) or by averaging per-question
//! metrics (macro).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::{ClaimRecord, Verdict};

/// A human judgment of one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annotation {
    Correct,
    Incorrect,
}

impl FromStr for Annotation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correct" => Ok(Annotation::Correct),
            "incorrect" => Ok(Annotation::Incorrect),
            other => Err(ConfigError::Invalid {
                message: format!("unknown annotation '{other}', expected 'correct' or 'incorrect'"),
            }),
        }
    }
}

/// Confusion matrix counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn add(&mut self, verdict: Option<Verdict>, annotation: Annotation) {
        let verified = verdict == Some(Verdict::Yes);
        match (verified, annotation) {
            (true, Annotation::Correct) => self.tp += 1,
            (true, Annotation::Incorrect) => self.fp += 1,
            (false, Annotation::Incorrect) => self.tn += 1,
            (false, Annotation::Correct) => self.fn_ += 1,
        }
    }

    pub fn merge(&mut self, other: &ConfusionMatrix) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.tn += other.tn;
        self.fn_ += other.fn_;
    }

    pub fn metrics(&self) -> BinaryMetrics {
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(self.tp, self.tp + self.fp);
        let recall = ratio(self.tp, self.tp + self.fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        BinaryMetrics {
            precision,
            recall,
            f1,
            accuracy: ratio(self.tp + self.tn, self.total()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
}

/// Metrics for one question's claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEvaluation {
    pub question_id: String,
    pub confusion: ConfusionMatrix,
    pub metrics: BinaryMetrics,
    /// Annotated claim ids with no matching record.
    pub unmatched: Vec<String>,
}

/// Compare one question's records against its annotations, keyed by claim id.
///
/// Records without an annotation are ignored. A record whose verdict never
/// settled counts as flagged.
pub fn evaluate_question(
    question_id: &str,
    records: &[ClaimRecord],
    annotations: &BTreeMap<String, Annotation>,
) -> QuestionEvaluation {
    let mut confusion = ConfusionMatrix::default();
    let mut unmatched = Vec::new();

    for (claim_id, annotation) in annotations {
        match records.iter().find(|r| &r.id == claim_id) {
            Some(record) => confusion.add(record.final_verdict(), *annotation),
            None => unmatched.push(claim_id.clone()),
        }
    }

    if !unmatched.is_empty() {
        tracing::debug!(
            question_id,
            unmatched = unmatched.len(),
            "Annotations without a matching claim"
        );
    }

    QuestionEvaluation {
        question_id: question_id.to_string(),
        metrics: confusion.metrics(),
        confusion,
        unmatched,
    }
}

/// Metrics pooled over several questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEvaluation {
    pub questions: usize,
    pub total_claims: usize,
    pub confusion: ConfusionMatrix,
    /// From the pooled confusion matrix.
    pub micro: BinaryMetrics,
    /// Unweighted mean of per-question metrics.
    pub macro_avg: BinaryMetrics,
}

pub fn aggregate(evaluations: &[QuestionEvaluation]) -> AggregateEvaluation {
    let mut confusion = ConfusionMatrix::default();
    for evaluation in evaluations {
        confusion.merge(&evaluation.confusion);
    }

    let macro_avg = if evaluations.is_empty() {
        BinaryMetrics::default()
    } else {
        let n = evaluations.len() as f64;
        let mean = |f: fn(&BinaryMetrics) -> f64| {
            evaluations.iter().map(|e| f(&e.metrics)).sum::<f64>() / n
        };
        BinaryMetrics {
            precision: mean(|m| m.precision),
            recall: mean(|m| m.recall),
            f1: mean(|m| m.f1),
            accuracy: mean(|m| m.accuracy),
        }
    };

    AggregateEvaluation {
        questions: evaluations.len(),
        total_claims: confusion.total(),
        micro: confusion.metrics(),
        macro_avg,
        confusion,
    }
}

//! Human-readable rendering of pipeline results and evaluations.

use claimcheck_core::evaluation::{AggregateEvaluation, BinaryMetrics, QuestionEvaluation};
use claimcheck_core::pipeline::PipelineResult;
use claimcheck_core::scoring::ConfidenceBreakdown;
use std::fmt::Write;

fn rule(out: &mut String) {
    let _ = writeln!(out, "{}", "=".repeat(72));
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Per-claim verdicts, risk and confidence, then the response total.
pub fn render_result(result: &PipelineResult) -> String {
    let mut out = String::new();
    rule(&mut out);
    let _ = writeln!(out, "Claim analysis ({} claims)  run {}", result.records.len(), result.run_id);
    rule(&mut out);

    if result.records.is_empty() {
        let _ = writeln!(out, "No claims supplied.");
    }

    for record in &result.records {
        let _ = writeln!(out, "{}  {}", record.id, record.text);
        let opinions: Vec<String> = record
            .verifier_opinions()
            .iter()
            .map(|o| format!("{}={}", o.verifier, o.verdict))
            .collect();
        let _ = writeln!(out, "    verifiers : {}", opinions.join(", "));
        let _ = writeln!(
            out,
            "    verdict   : {}{}",
            opt(record.final_verdict()),
            if record.voting_used() { " (voted)" } else { "" }
        );
        if let Some(status) = record.external_status() {
            let _ = writeln!(out, "    external  : {status}");
        }
        let _ = writeln!(
            out,
            "    risk      : {}   confidence: {}",
            opt(record.risk_level()),
            record
                .confidence()
                .map_or_else(|| "-".to_string(), |c| format!("{c:.2}"))
        );
    }

    let summary = &result.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Risk summary: {} high, {} medium, {} low",
        summary.high, summary.medium, summary.low
    );
    let _ = writeln!(
        out,
        "Overall confidence: {:.4} ({})",
        result.overall_confidence, result.breakdown.label
    );
    out
}

/// The scoring formula worked through for every claim.
pub fn render_breakdown(breakdown: &ConfidenceBreakdown) -> String {
    let mut out = String::new();
    let w = &breakdown.weights;
    let _ = writeln!(out, "Confidence breakdown");
    let _ = writeln!(
        out,
        "  Confidence = {:.2} x CrossModel + {:.2} x External + {:.2} x Context",
        w.alpha, w.beta, w.gamma
    );

    for claim in &breakdown.claims {
        let _ = writeln!(out, "  {}: {}", claim.claim_id, claim.claim_text);
        let _ = writeln!(
            out,
            "    scores    : cross-model {:.2}, external {:.2}, context {:.2}",
            claim.cross_model_score, claim.external_score, claim.context_score
        );
        let _ = writeln!(
            out,
            "    confidence: {:.2} + {:.2} + {:.2} = {:.2}",
            claim.cross_model_weighted, claim.external_weighted, claim.context_weighted, claim.confidence
        );
        let _ = writeln!(
            out,
            "    weight    : {:.1} (weighted {:.3})",
            claim.weight, claim.weighted_confidence
        );
    }

    if let Some(summary) = &breakdown.summary {
        let _ = writeln!(
            out,
            "  Overall = {:.3} / {:.1} = {:.4}",
            breakdown.total_weighted_confidence, breakdown.total_weight, breakdown.overall_confidence
        );
        let _ = writeln!(
            out,
            "  avg {:.2}, min {:.2}, max {:.2}, avg weight {:.2}",
            summary.avg_confidence, summary.min_confidence, summary.max_confidence, summary.avg_weight
        );
    } else {
        let _ = writeln!(out, "  Overall = 0.0 (no claims)");
    }
    out
}

fn metrics_row(label: &str, m: &BinaryMetrics) -> String {
    format!(
        "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
        label, m.precision, m.recall, m.f1, m.accuracy
    )
}

pub fn render_evaluation(questions: &[QuestionEvaluation], aggregate: &AggregateEvaluation) -> String {
    let mut out = String::new();
    rule(&mut out);
    let _ = writeln!(
        out,
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "question", "precision", "recall", "f1", "accuracy"
    );
    rule(&mut out);
    for question in questions {
        let _ = writeln!(out, "{}", metrics_row(&question.question_id, &question.metrics));
    }
    rule(&mut out);
    let _ = writeln!(out, "{}", metrics_row("micro", &aggregate.micro));
    let _ = writeln!(out, "{}", metrics_row("macro", &aggregate.macro_avg));
    let c = &aggregate.confusion;
    let _ = writeln!(
        out,
        "{} questions, {} claims (TP {}, FP {}, TN {}, FN {})",
        aggregate.questions, aggregate.total_claims, c.tp, c.fp, c.tn, c.fn_
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimcheck_core::config::ClaimCheckConfig;
    use claimcheck_core::evaluation::{ConfusionMatrix, aggregate};
    use claimcheck_core::pipeline::Pipeline;
    use claimcheck_core::verifier::{MockVerifier, Verifier};
    use std::sync::Arc;

    async fn einstein_result() -> PipelineResult {
        let verifiers: Vec<Arc<dyn Verifier>> = vec![
            Arc::new(MockVerifier::answering("openai", "No")),
            Arc::new(MockVerifier::answering("anthropic", "No")),
        ];
        let pipeline = Pipeline::new(&ClaimCheckConfig::default(), verifiers, Vec::new()).unwrap();
        pipeline
            .run(
                &["Albert Einstein was born in 1879 in Munich, Germany.".to_string()],
                "gemini",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_render_result() {
        let text = render_result(&einstein_result().await);
        assert!(text.contains("C1  Albert Einstein was born in 1879 in Munich, Germany."));
        assert!(text.contains("verifiers : openai=No, anthropic=No"));
        assert!(text.contains("risk      : high   confidence: 0.42"));
        assert!(text.contains("Risk summary: 1 high, 0 medium, 0 low"));
        assert!(text.contains("Overall confidence: 0.4200 (low-medium)"));
    }

    #[tokio::test]
    async fn test_render_breakdown() {
        let text = render_breakdown(&einstein_result().await.breakdown);
        assert!(text.contains("Confidence = 0.40 x CrossModel + 0.40 x External + 0.20 x Context"));
        assert!(text.contains("confidence: 0.04 + 0.20 + 0.18 = 0.42"));
    }

    #[test]
    fn test_render_evaluation() {
        let q = QuestionEvaluation {
            question_id: "q1".to_string(),
            confusion: ConfusionMatrix {
                tp: 1,
                fp: 0,
                tn: 1,
                fn_: 0,
            },
            metrics: ConfusionMatrix {
                tp: 1,
                fp: 0,
                tn: 1,
                fn_: 0,
            }
            .metrics(),
            unmatched: Vec::new(),
        };
        let agg = aggregate(std::slice::from_ref(&q));
        let text = render_evaluation(&[q], &agg);
        assert!(text.contains("micro"));
        assert!(text.contains("1 questions, 2 claims (TP 1, FP 0, TN 1, FN 0)"));
    }
}

//! End-to-end tests for the verification pipeline.
//!
//! Verifiers and knowledge sources are the in-memory `MockVerifier` and
//! `FixtureSource`, so every run is deterministic and offline.

use claimcheck_core::config::ClaimCheckConfig;
use claimcheck_core::error::{CheckError, ConfigError};
use claimcheck_core::knowledge::{FixtureSource, IdScheme, KnowledgeSource};
use claimcheck_core::pipeline::Pipeline;
use claimcheck_core::types::{ExternalStatus, OpinionOutcome, RiskLevel, Verdict};
use claimcheck_core::verifier::{MockVerifier, Verifier};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const EINSTEIN_MUNICH: &str = "Albert Einstein was born in 1879 in Munich, Germany.";

fn claims(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

fn panel(verifiers: &[&Arc<MockVerifier>]) -> Vec<Arc<dyn Verifier>> {
    verifiers
        .iter()
        .map(|v| Arc::clone(*v) as Arc<dyn Verifier>)
        .collect()
}

fn sources(list: &[&Arc<FixtureSource>]) -> Vec<Arc<dyn KnowledgeSource>> {
    list.iter()
        .map(|s| Arc::clone(*s) as Arc<dyn KnowledgeSource>)
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_agreement_never_calls_third_verifier() {
    let first = Arc::new(MockVerifier::answering("openai", "yes"));
    let second = Arc::new(MockVerifier::answering("anthropic", "Correct"));
    let third = Arc::new(MockVerifier::panicking("gemini"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline
        .run(
            &claims(&["Python was created by Guido van Rossum.", "Water boils at 100 degrees."]),
            "deepseek",
        )
        .await
        .unwrap();

    assert_eq!(third.call_count(), 0);
    assert_eq!(result.voting.escalated, 0);
    for record in &result.records {
        assert!(!record.voting_used());
        assert_eq!(record.verifier_opinions().len(), 2);
        assert_eq!(record.final_verdict(), Some(Verdict::Yes));
        assert_eq!(record.risk_level(), Some(RiskLevel::Low));
    }
}

#[tokio::test]
async fn test_contradiction_resolved_by_majority() {
    let first = Arc::new(MockVerifier::answering("openai", "Yes"));
    let second = Arc::new(MockVerifier::answering("anthropic", "No"));
    let third = Arc::new(MockVerifier::answering("gemini", "Yes"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&["The Eiffel Tower is in Paris."]), "deepseek")
        .await
        .unwrap();

    let record = &result.records[0];
    assert!(record.voting_used());
    assert_eq!(record.verifier_opinions().len(), 3);
    assert_eq!(record.final_verdict(), Some(Verdict::Yes));
    assert_eq!(third.batches(), vec![claims(&["The Eiffel Tower is in Paris."])]);
}

#[tokio::test]
async fn test_three_way_split_is_uncertain() {
    let first = Arc::new(MockVerifier::answering("openai", "Yes"));
    let second = Arc::new(MockVerifier::answering("anthropic", "No"));
    let third = Arc::new(MockVerifier::answering("gemini", "no idea"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&["The Moon is made of basalt."]), "deepseek")
        .await
        .unwrap();

    let record = &result.records[0];
    assert!(record.voting_used());
    assert_eq!(record.final_verdict(), Some(Verdict::Uncertain));
    assert_eq!(record.risk_level(), Some(RiskLevel::Medium));
}

#[tokio::test]
async fn test_only_medium_claims_reach_knowledge_sources() {
    let agreed_yes = "Isaac Newton was born in 1643.";
    let agreed_no = "Charles Darwin died in 1900.";
    let disputed = "Albert Einstein was born in 1879.";

    let first = Arc::new(
        MockVerifier::new("openai")
            .with_answer(agreed_yes, "Yes")
            .with_answer(agreed_no, "No")
            .with_answer(disputed, "Yes"),
    );
    let second = Arc::new(
        MockVerifier::new("anthropic")
            .with_answer(agreed_yes, "Yes")
            .with_answer(agreed_no, "No")
            .with_answer(disputed, "No"),
    );
    let wikidata = Arc::new(
        FixtureSource::new("wikidata", IdScheme::Wikidata)
            .with_values("Q937", "P569", &["1879-03-14T00:00:00Z"]),
    );
    let dbpedia = Arc::new(
        FixtureSource::new("dbpedia", IdScheme::Dbpedia)
            .with_values("Albert_Einstein", "dbo:birthDate", &["1879-03-14"]),
    );
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second]),
        sources(&[&wikidata, &dbpedia]),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&[agreed_yes, agreed_no, disputed]), "gemini")
        .await
        .unwrap();

    // One birth-date pattern for the disputed claim, one query per source.
    assert_eq!(wikidata.call_count(), 1);
    assert_eq!(dbpedia.call_count(), 1);
    assert_eq!(result.external_checks.len(), 1);
    assert_eq!(result.external_checks[0].claim_id, "C3");

    let statuses: Vec<Option<ExternalStatus>> =
        result.records.iter().map(|r| r.external_status()).collect();
    assert_eq!(statuses, vec![None, None, Some(ExternalStatus::Supports)]);

    let risks: Vec<Option<RiskLevel>> = result.records.iter().map(|r| r.risk_level()).collect();
    assert_eq!(
        risks,
        vec![Some(RiskLevel::Low), Some(RiskLevel::High), Some(RiskLevel::Low)]
    );
    assert_eq!(result.summary.low, 2);
    assert_eq!(result.summary.high, 1);
}

#[tokio::test]
async fn test_split_sources_leave_claim_unclear() {
    let first = Arc::new(MockVerifier::answering("openai", "Yes"));
    let second = Arc::new(MockVerifier::answering("anthropic", "Uncertain"));
    let wikidata = Arc::new(
        FixtureSource::new("wikidata", IdScheme::Wikidata)
            .with_values("Q937", "P569", &["1879-03-14T00:00:00Z"]),
    );
    let dbpedia = Arc::new(
        FixtureSource::new("dbpedia", IdScheme::Dbpedia)
            .with_values("Albert_Einstein", "dbo:birthDate", &["1878-01-01"]),
    );
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second]),
        sources(&[&wikidata, &dbpedia]),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&["Albert Einstein was born in 1879."]), "gemini")
        .await
        .unwrap();

    let record = &result.records[0];
    assert_eq!(record.external_status(), Some(ExternalStatus::Unclear));
    assert_eq!(record.risk_level(), Some(RiskLevel::Medium));

    let report = &result.external_checks[0].report;
    let per_source: Vec<Option<ExternalStatus>> = report.sources.iter().map(|s| s.status).collect();
    assert_eq!(
        per_source,
        vec![Some(ExternalStatus::Supports), Some(ExternalStatus::Contradicts)]
    );
}

#[tokio::test]
async fn test_contradicting_sources_raise_risk() {
    let first = Arc::new(MockVerifier::answering("openai", "Yes"));
    let second = Arc::new(MockVerifier::answering("anthropic", "No"));
    let third = Arc::new(MockVerifier::answering("gemini", "Yes"));
    let wikidata = Arc::new(
        FixtureSource::new("wikidata", IdScheme::Wikidata)
            .with_values("Q935", "P569", &["1643-01-04T00:00:00Z"]),
    );
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        sources(&[&wikidata]),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&["Isaac Newton was born in 1642."]), "deepseek")
        .await
        .unwrap();

    let record = &result.records[0];
    assert_eq!(record.final_verdict(), Some(Verdict::Yes));
    assert_eq!(record.external_status(), Some(ExternalStatus::Contradicts));
    assert_eq!(record.risk_level(), Some(RiskLevel::High));
}

#[tokio::test]
async fn test_empty_claim_list() {
    let first = Arc::new(MockVerifier::panicking("openai"));
    let second = Arc::new(MockVerifier::panicking("anthropic"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline.run(&[], "gemini").await.unwrap();
    assert!(result.records.is_empty());
    assert_eq!(result.overall_confidence, 0.0);
    assert_eq!(result.breakdown.total_weight, 0.0);
    assert_eq!(result.summary.total(), 0);
}

#[tokio::test]
async fn test_einstein_agreed_false_skips_external() {
    let first = Arc::new(MockVerifier::answering("openai", "No"));
    let second = Arc::new(MockVerifier::answering("anthropic", "No"));
    let third = Arc::new(MockVerifier::panicking("gemini"));
    let wikidata = Arc::new(FixtureSource::new("wikidata", IdScheme::Wikidata));
    let dbpedia = Arc::new(FixtureSource::new("dbpedia", IdScheme::Dbpedia));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        sources(&[&wikidata, &dbpedia]),
    )
    .unwrap();

    let result = pipeline.run(&claims(&[EINSTEIN_MUNICH]), "deepseek").await.unwrap();

    let record = &result.records[0];
    assert_eq!(record.final_verdict(), Some(Verdict::No));
    assert_eq!(record.risk_level(), Some(RiskLevel::High));
    assert!(!record.voting_used());
    assert_eq!(record.external_status(), None);
    assert_eq!(wikidata.call_count() + dbpedia.call_count(), 0);

    // 0.4 * 0.1 + 0.4 * 0.5 + 0.2 * 0.9
    let score = &result.breakdown.claims[0];
    assert!(close(score.cross_model_score, 0.1));
    assert!(close(score.external_score, 0.5));
    assert!(close(score.context_score, 0.9));
    assert!(close(record.confidence().unwrap(), 0.42));
    assert!(close(result.overall_confidence, 0.42));
}

#[tokio::test]
async fn test_failed_verifier_is_padded_and_escalated() {
    let first = Arc::new(MockVerifier::failing("openai"));
    let second = Arc::new(MockVerifier::answering("anthropic", "Yes"));
    let third = Arc::new(MockVerifier::answering("gemini", "Yes"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&["Claim one is here.", "Claim two is here."]), "deepseek")
        .await
        .unwrap();

    assert_eq!(result.voting.padded_opinions, 2);
    assert_eq!(result.voting.escalated, 2);
    for record in &result.records {
        let opinions = record.verifier_opinions();
        assert_eq!(opinions[0].verdict, Verdict::Uncertain);
        assert_eq!(opinions[0].outcome, OpinionOutcome::Failed);
        assert_eq!(opinions[1].outcome, OpinionOutcome::Answered);
        assert_eq!(record.final_verdict(), Some(Verdict::Yes));
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_verifier_times_out() {
    let mut config = ClaimCheckConfig::default();
    config.voting.verifier_timeout_ms = 50;
    let first = Arc::new(MockVerifier::answering("openai", "Yes").with_delay(Duration::from_secs(60)));
    let second = Arc::new(MockVerifier::answering("anthropic", "No"));
    let pipeline = Pipeline::new(&config, panel(&[&first, &second]), Vec::new()).unwrap();

    let result = pipeline
        .run(&claims(&["Some claim to check."]), "gemini")
        .await
        .unwrap();

    let record = &result.records[0];
    assert_eq!(record.verifier_opinions()[0].outcome, OpinionOutcome::Failed);
    // Uncertain vs No with no third verifier: unresolved.
    assert_eq!(record.final_verdict(), Some(Verdict::Uncertain));
    assert_eq!(result.voting.unresolved, 1);
}

#[tokio::test]
async fn test_author_model_is_excluded_case_insensitively() {
    let author = Arc::new(MockVerifier::panicking("openai"));
    let second = Arc::new(MockVerifier::answering("anthropic", "Yes"));
    let third = Arc::new(MockVerifier::answering("gemini", "Yes"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&author, &second, &third]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline
        .run(&claims(&["Python was released in 1991."]), "OpenAI")
        .await
        .unwrap();

    assert_eq!(result.voting.verifiers_used, vec!["anthropic", "gemini"]);
    assert_eq!(result.records[0].final_verdict(), Some(Verdict::Yes));
}

#[tokio::test]
async fn test_too_few_verifiers_is_a_config_error() {
    let only = Arc::new(MockVerifier::answering("anthropic", "Yes"));
    let pipeline = Pipeline::new(&ClaimCheckConfig::default(), panel(&[&only]), Vec::new()).unwrap();

    let err = pipeline
        .run(&claims(&["Python was released in 1991."]), "openai")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckError::Config(ConfigError::TooFewVerifiers { available: 1 })
    ));
}

#[tokio::test]
async fn test_every_record_is_complete_and_in_range() {
    let first = Arc::new(
        MockVerifier::new("openai")
            .with_answer("a", "Yes")
            .with_answer("b", "No")
            .with_answer("c", "maybe"),
    );
    let second = Arc::new(
        MockVerifier::new("anthropic")
            .with_answer("a", "true")
            .with_answer("b", "Yes")
            .with_answer("c", "disagree"),
    );
    let third = Arc::new(MockVerifier::answering("gemini", "Uncertain"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second, &third]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline.run(&claims(&["a", "b", "c"]), "deepseek").await.unwrap();

    let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["C1", "C2", "C3"]);
    for record in &result.records {
        assert!(record.is_terminal());
        let confidence = record.confidence().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        if record.voting_used() {
            assert_eq!(record.verifier_opinions().len(), 3);
        } else {
            assert_eq!(record.verifier_opinions().len(), 2);
        }
    }
    assert!((0.0..=1.0).contains(&result.overall_confidence));
}

#[tokio::test]
async fn test_result_serializes_with_wire_names() {
    let first = Arc::new(MockVerifier::answering("openai", "No"));
    let second = Arc::new(MockVerifier::answering("anthropic", "No"));
    let pipeline = Pipeline::new(
        &ClaimCheckConfig::default(),
        panel(&[&first, &second]),
        Vec::new(),
    )
    .unwrap();

    let result = pipeline.run(&claims(&[EINSTEIN_MUNICH]), "gemini").await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["records"][0]["id"], "C1");
    assert_eq!(json["records"][0]["final_verdict"], "No");
    assert_eq!(json["records"][0]["risk_level"], "high");
    assert!(json["records"][0].get("external_status").is_none());
    assert_eq!(json["summary"]["high"], 1);
}

//! Offline back-ends and input files.
//!
//! A fixture file scripts the verifier panel and the knowledge sources so the
//! pipeline can run without network access:
//!
//! ```json
//! {
//!   "verifiers": [
//!     { "name": "openai", "default": "Uncertain", "answers": { "Claim text.": "Yes" } }
//!   ],
//!   "sources": [
//!     { "name": "wikidata", "scheme": "wikidata",
//!       "facts": [ { "entity": "Q937", "property": "P569", "values": ["1879-03-14"] } ] }
//!   ]
//! }
//! ```

use anyhow::Context;
use claimcheck_core::evaluation::Annotation;
use claimcheck_core::knowledge::{FixtureSource, FixtureSourceSpec, KnowledgeSource};
use claimcheck_core::verifier::{MockVerifier, Verifier};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub verifiers: Vec<VerifierFixture>,
    #[serde(default)]
    pub sources: Vec<FixtureSourceSpec>,
}

/// A scripted verifier.
#[derive(Debug, Deserialize)]
pub struct VerifierFixture {
    pub name: String,
    #[serde(default = "default_answer")]
    pub default: String,
    #[serde(default)]
    pub answers: HashMap<String, String>,
    #[serde(default)]
    pub failing: bool,
}

fn default_answer() -> String {
    "Uncertain".to_string()
}

impl FixtureFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid fixture file {}", path.display()))
    }

    pub fn verifiers(&self) -> Vec<Arc<dyn Verifier>> {
        self.verifiers
            .iter()
            .map(|fixture| {
                let verifier = if fixture.failing {
                    MockVerifier::failing(&fixture.name)
                } else {
                    fixture
                        .answers
                        .iter()
                        .fold(MockVerifier::answering(&fixture.name, &fixture.default), |v, (claim, answer)| {
                            v.with_answer(claim, answer)
                        })
                };
                Arc::new(verifier) as Arc<dyn Verifier>
            })
            .collect()
    }

    pub fn sources(&self) -> Vec<Arc<dyn KnowledgeSource>> {
        self.sources
            .iter()
            .cloned()
            .map(|spec| Arc::new(FixtureSource::from(spec)) as Arc<dyn KnowledgeSource>)
            .collect()
    }
}

/// Claims from a text file, one per non-empty line. Lines starting with `#` are skipped.
pub fn read_claims(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read claims file {}", path.display()))?;
    Ok(parse_claims(&text))
}

pub fn parse_claims(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Annotated questions for the `evaluate` command.
#[derive(Debug, Deserialize)]
pub struct Dataset {
    pub questions: Vec<DatasetQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetQuestion {
    pub id: String,
    #[serde(default)]
    pub question: Option<String>,
    /// Model that wrote the answer; excluded from its own verification.
    #[serde(default)]
    pub model: String,
    pub claims: Vec<String>,
    /// Claim id (`C1`, `C2`, ...) to manual label.
    #[serde(default)]
    pub annotations: BTreeMap<String, Annotation>,
}

impl Dataset {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid dataset {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimcheck_core::knowledge::IdScheme;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "verifiers": [
            { "name": "openai", "answers": { "Claim A.": "Yes" } },
            { "name": "anthropic", "default": "No" },
            { "name": "gemini", "failing": true }
        ],
        "sources": [
            { "name": "wikidata", "scheme": "wikidata",
              "facts": [ { "entity": "Q937", "property": "P569", "values": ["1879-03-14T00:00:00Z"] } ] }
        ]
    }"#;

    #[tokio::test]
    async fn test_fixture_verifiers() {
        let file: FixtureFile = serde_json::from_str(FIXTURE).unwrap();
        let verifiers = file.verifiers();
        assert_eq!(verifiers.len(), 3);

        let batch = vec!["Claim A.".to_string(), "Claim B.".to_string()];
        assert_eq!(verifiers[0].verify_batch(&batch).await.unwrap(), vec!["Yes", "Uncertain"]);
        assert_eq!(verifiers[1].verify_batch(&batch).await.unwrap(), vec!["No", "No"]);
        assert!(verifiers[2].verify_batch(&batch).await.is_err());
    }

    #[tokio::test]
    async fn test_fixture_sources() {
        let file: FixtureFile = serde_json::from_str(FIXTURE).unwrap();
        let sources = file.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].scheme(), IdScheme::Wikidata);
        assert_eq!(
            sources[0].query("Q937", "P569").await.unwrap(),
            vec!["1879-03-14T00:00:00Z"]
        );
    }

    #[test]
    fn test_parse_claims_skips_blank_and_comments() {
        let text = "# response from gpt-4o\nEinstein was born in 1879.\n\n  Python was released in 1991.  \n";
        assert_eq!(
            parse_claims(text),
            vec!["Einstein was born in 1879.", "Python was released in 1991."]
        );
    }

    #[tokio::test]
    async fn test_shipped_demo_fixture() {
        use claimcheck_core::config::ClaimCheckConfig;
        use claimcheck_core::pipeline::Pipeline;
        use claimcheck_core::types::{ExternalStatus, RiskLevel};

        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        let file = FixtureFile::load(&dir.join("demo.json")).unwrap();
        let claims = read_claims(&dir.join("claims.txt")).unwrap();
        assert_eq!(claims.len(), 5);

        let pipeline =
            Pipeline::new(&ClaimCheckConfig::default(), file.verifiers(), file.sources()).unwrap();
        let result = pipeline.run(&claims, "deepseek").await.unwrap();

        let risks: Vec<Option<RiskLevel>> = result.records.iter().map(|r| r.risk_level()).collect();
        assert_eq!(
            risks,
            vec![
                Some(RiskLevel::Low),
                Some(RiskLevel::Low),
                Some(RiskLevel::High),
                Some(RiskLevel::Low),
                Some(RiskLevel::Low),
            ]
        );
        let checked: Vec<(&str, ExternalStatus)> = result
            .external_checks
            .iter()
            .map(|c| (c.claim_id.as_str(), c.report.status))
            .collect();
        assert_eq!(
            checked,
            vec![("C2", ExternalStatus::Unclear), ("C3", ExternalStatus::Contradicts)]
        );

        let dataset = Dataset::load(&dir.join("dataset.json")).unwrap();
        assert_eq!(dataset.questions.len(), 2);
    }

    #[test]
    fn test_dataset_parse() {
        let dataset: Dataset = serde_json::from_str(
            r#"{ "questions": [ { "id": "q1", "model": "openai", "claims": ["x"],
                 "annotations": { "C1": "correct" } } ] }"#,
        )
        .unwrap();
        assert_eq!(dataset.questions[0].annotations["C1"], Annotation::Correct);
        assert!(dataset.questions[0].question.is_none());
    }
}

//! In-memory knowledge source backed by a fixed fact table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{IdScheme, KnowledgeSource};
use crate::error::SourceError;

/// A knowledge source answering from a lookup table. Used in tests and offline runs.
#[derive(Debug)]
pub struct FixtureSource {
    name: String,
    scheme: IdScheme,
    facts: HashMap<(String, String), Vec<String>>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixtureSource {
    pub fn new(name: &str, scheme: IdScheme) -> Self {
        Self {
            name: name.to_string(),
            scheme,
            facts: HashMap::new(),
            failing: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source whose every query fails.
    pub fn failing(name: &str, scheme: IdScheme) -> Self {
        Self {
            failing: true,
            ..Self::new(name, scheme)
        }
    }

    pub fn with_values(mut self, entity_id: &str, property_id: &str, values: &[&str]) -> Self {
        self.facts.insert(
            (entity_id.to_string(), property_id.to_string()),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Sleep before answering each query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of queries received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for FixtureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> IdScheme {
        self.scheme
    }

    async fn query(&self, entity_id: &str, property_id: &str) -> Result<Vec<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(SourceError::Unavailable {
                source_name: self.name.clone(),
            });
        }
        Ok(self
            .facts
            .get(&(entity_id.to_string(), property_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Serialized form of a fixture source, as stored in fixture files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSourceSpec {
    pub name: String,
    pub scheme: IdScheme,
    #[serde(default)]
    pub failing: bool,
    #[serde(default)]
    pub facts: Vec<FixtureFact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureFact {
    pub entity: String,
    pub property: String,
    pub values: Vec<String>,
}

impl From<FixtureSourceSpec> for FixtureSource {
    fn from(spec: FixtureSourceSpec) -> Self {
        let mut source = if spec.failing {
            FixtureSource::failing(&spec.name, spec.scheme)
        } else {
            FixtureSource::new(&spec.name, spec.scheme)
        };
        for fact in spec.facts {
            source
                .facts
                .insert((fact.entity, fact.property), fact.values);
        }
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_lookup() {
        let source = FixtureSource::new("wikidata", IdScheme::Wikidata)
            .with_values("Q937", "P569", &["1879-03-14T00:00:00Z"]);
        let values = source.query("Q937", "P569").await.unwrap();
        assert_eq!(values, vec!["1879-03-14T00:00:00Z"]);
        assert!(source.query("Q937", "P570").await.unwrap().is_empty());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fixture_failing() {
        let source = FixtureSource::failing("dbpedia", IdScheme::Dbpedia);
        let err = source.query("Albert_Einstein", "dbo:birthDate").await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_fixture_from_spec() {
        let spec: FixtureSourceSpec = serde_json::from_value(serde_json::json!({
            "name": "dbpedia",
            "scheme": "dbpedia",
            "facts": [
                {"entity": "Isaac_Newton", "property": "dbo:birthDate", "values": ["1643-01-04"]}
            ]
        }))
        .unwrap();
        let source = FixtureSource::from(spec);
        assert_eq!(source.scheme(), IdScheme::Dbpedia);
        assert_eq!(
            source.query("Isaac_Newton", "dbo:birthDate").await.unwrap(),
            vec!["1643-01-04"]
        );
    }
}

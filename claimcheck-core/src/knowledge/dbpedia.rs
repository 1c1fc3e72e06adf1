//! DBpedia SPARQL knowledge source.

use async_trait::async_trait;
use reqwest::Client;

use super::{IdScheme, KnowledgeSource, sparql};
use crate::config::ExternalConfig;
use crate::error::SourceError;

const NAME: &str = "dbpedia";

/// Queries `dbpedia.org/sparql` by resource name and `dbo:` property.
pub struct DbpediaSource {
    client: Client,
    endpoint: String,
    user_agent: String,
}

impl DbpediaSource {
    pub fn new(config: &ExternalConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.dbpedia_endpoint.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Build the SELECT for one resource/property pair. The resource is written
    /// as a full IRI since names like `Python_(programming_language)` are not
    /// valid prefixed names.
    pub fn build_query(resource: &str, property_id: &str) -> String {
        format!(
            r#"PREFIX dbo: <http://dbpedia.org/ontology/>
SELECT ?value WHERE {{
  <http://dbpedia.org/resource/{resource}> {property_id} ?value .
}}"#
        )
    }
}

fn is_safe_resource(resource: &str) -> bool {
    !resource.is_empty()
        && resource
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '(' | ')' | '-' | ',' | '.' | '\''))
}

fn is_safe_property(property: &str) -> bool {
    property
        .strip_prefix("dbo:")
        .is_some_and(|local| !local.is_empty() && local.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[async_trait]
impl KnowledgeSource for DbpediaSource {
    fn name(&self) -> &str {
        NAME
    }

    fn scheme(&self) -> IdScheme {
        IdScheme::Dbpedia
    }

    async fn query(&self, entity_id: &str, property_id: &str) -> Result<Vec<String>, SourceError> {
        if !is_safe_resource(entity_id) || !is_safe_property(property_id) {
            return Err(SourceError::InvalidQuery {
                source_name: NAME.to_string(),
                message: format!("'{entity_id}'/'{property_id}' are not DBpedia identifiers"),
            });
        }
        let query = Self::build_query(entity_id, property_id);
        sparql::select(&self.client, NAME, &self.endpoint, &self.user_agent, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_uses_full_iri() {
        let query = DbpediaSource::build_query("Python_(programming_language)", "dbo:publicationDate");
        assert!(query.contains("<http://dbpedia.org/resource/Python_(programming_language)>"));
        assert!(query.contains("dbo:publicationDate ?value"));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_safe_resource("World_War_II"));
        assert!(!is_safe_resource("Einstein> ?p ?o . <x"));
        assert!(is_safe_property("dbo:birthPlace"));
        assert!(!is_safe_property("P569"));
        assert!(!is_safe_property("dbo:"));
    }

    #[tokio::test]
    async fn test_query_rejects_wikidata_property() {
        let source = DbpediaSource::new(&ExternalConfig::default());
        let err = source.query("Isaac_Newton", "P569").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidQuery { .. }));
    }
}

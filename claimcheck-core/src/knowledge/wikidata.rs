//! Wikidata SPARQL knowledge source.

use async_trait::async_trait;
use reqwest::Client;

use super::{IdScheme, KnowledgeSource, sparql};
use crate::config::ExternalConfig;
use crate::error::SourceError;

const NAME: &str = "wikidata";

/// Queries `query.wikidata.org` by Q-id and P-id.
pub struct WikidataSource {
    client: Client,
    endpoint: String,
    user_agent: String,
}

impl WikidataSource {
    pub fn new(config: &ExternalConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.wikidata_endpoint.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Build the SELECT for one entity/property pair.
    ///
    /// Places resolve to English labels; awards are narrowed to Nobel prizes and
    /// return the point-in-time qualifier so the year can be compared.
    pub fn build_query(entity_id: &str, property_id: &str) -> String {
        match property_id {
            "P19" => format!(
                r#"SELECT ?placeLabel WHERE {{
  wd:{entity_id} wdt:P19 ?place .
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
}}"#
            ),
            "P166" => format!(
                r#"SELECT ?year WHERE {{
  wd:{entity_id} p:P166 ?statement .
  ?statement ps:P166 ?award ;
             pq:P585 ?year .
  ?award rdfs:label ?label .
  FILTER(LANG(?label) = "en" && CONTAINS(LCASE(STR(?label)), "nobel"))
}}"#
            ),
            _ => format!(
                r#"SELECT ?value WHERE {{
  wd:{entity_id} wdt:{property_id} ?value .
}}"#
            ),
        }
    }
}

fn is_wikidata_id(id: &str, prefix: char) -> bool {
    let mut chars = id.chars();
    chars.next() == Some(prefix) && id.len() > 1 && chars.all(|c| c.is_ascii_digit())
}

#[async_trait]
impl KnowledgeSource for WikidataSource {
    fn name(&self) -> &str {
        NAME
    }

    fn scheme(&self) -> IdScheme {
        IdScheme::Wikidata
    }

    async fn query(&self, entity_id: &str, property_id: &str) -> Result<Vec<String>, SourceError> {
        if !is_wikidata_id(entity_id, 'Q') || !is_wikidata_id(property_id, 'P') {
            return Err(SourceError::InvalidQuery {
                source_name: NAME.to_string(),
                message: format!("'{entity_id}'/'{property_id}' are not Wikidata ids"),
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
    fn test_build_query_date() {
        let query = WikidataSource::build_query("Q937", "P569");
        assert!(query.contains("wd:Q937 wdt:P569 ?value"));
    }

    #[test]
    fn test_build_query_place_uses_labels() {
        let query = WikidataSource::build_query("Q935", "P19");
        assert!(query.contains("?placeLabel"));
        assert!(query.contains("wikibase:label"));
    }

    #[test]
    fn test_build_query_nobel_filters_award() {
        let query = WikidataSource::build_query("Q937", "P166");
        assert!(query.contains("pq:P585 ?year"));
        assert!(query.contains("\"nobel\""));
    }

    #[test]
    fn test_id_validation() {
        assert!(is_wikidata_id("Q937", 'Q'));
        assert!(is_wikidata_id("P19", 'P'));
        assert!(!is_wikidata_id("Q", 'Q'));
        assert!(!is_wikidata_id("Q9 . ?x", 'Q'));
        assert!(!is_wikidata_id("Albert_Einstein", 'Q'));
    }

    #[tokio::test]
    async fn test_query_rejects_foreign_ids() {
        let source = WikidataSource::new(&ExternalConfig::default());
        let err = source.query("Albert_Einstein", "dbo:birthDate").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidQuery { .. }));
    }
}

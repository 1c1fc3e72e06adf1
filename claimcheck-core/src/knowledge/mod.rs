//! External knowledge-graph corroboration.
//!
//! A claim is matched against a small entity registry, reduced to checkable
//! fact patterns, and each pattern is looked up in every configured
//! [`KnowledgeSource`]. Per-source verdicts are combined by majority vote in
//! [`ExternalConsensusVerifier`].

pub mod consensus;
pub mod dbpedia;
pub mod entities;
pub mod fixture;
pub mod sparql;
pub mod wikidata;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

pub use consensus::{ExternalConsensusVerifier, ExternalReport, SourceReport, consensus};
pub use dbpedia::DbpediaSource;
pub use entities::{Entity, FactKind, FactPattern, detect_entity, extract_fact_patterns};
pub use fixture::{FixtureFact, FixtureSource, FixtureSourceSpec};
pub use wikidata::WikidataSource;

/// Identifier scheme a knowledge source uses for entities and properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// `Q937`, `P569`
    Wikidata,
    /// `Albert_Einstein`, `dbo:birthDate`
    Dbpedia,
}

impl IdScheme {
    pub fn entity_id(&self, entity: &Entity) -> &'static str {
        match self {
            IdScheme::Wikidata => entity.wikidata_id,
            IdScheme::Dbpedia => entity.dbpedia_id,
        }
    }

    pub fn property_id(&self, kind: FactKind) -> &'static str {
        match self {
            IdScheme::Wikidata => kind.wikidata_property(),
            IdScheme::Dbpedia => kind.dbpedia_property(),
        }
    }
}

/// A structured knowledge source that can look up property values for an entity.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Which identifiers this source understands.
    fn scheme(&self) -> IdScheme;

    /// This source's identifier for `entity`.
    fn entity_id(&self, entity: &Entity) -> &'static str {
        self.scheme().entity_id(entity)
    }

    /// This source's identifier for a fact kind.
    fn property_id(&self, kind: FactKind) -> &'static str {
        self.scheme().property_id(kind)
    }

    /// All values of `property_id` for `entity_id`. An empty list is a valid answer.
    async fn query(&self, entity_id: &str, property_id: &str) -> Result<Vec<String>, SourceError>;
}

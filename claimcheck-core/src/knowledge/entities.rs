//! Entity registry and fact-pattern extraction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A known entity with its identifier in each supported knowledge source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Lowercase phrase whose presence in a claim selects this entity.
    pub trigger: &'static str,
    pub name: &'static str,
    pub wikidata_id: &'static str,
    pub dbpedia_id: &'static str,
}

/// Registry order decides which entity wins when several triggers match.
pub static REGISTRY: &[Entity] = &[
    Entity {
        trigger: "einstein",
        name: "Albert Einstein",
        wikidata_id: "Q937",
        dbpedia_id: "Albert_Einstein",
    },
    Entity {
        trigger: "newton",
        name: "Isaac Newton",
        wikidata_id: "Q935",
        dbpedia_id: "Isaac_Newton",
    },
    Entity {
        trigger: "python",
        name: "Python (programming language)",
        wikidata_id: "Q28865",
        dbpedia_id: "Python_(programming_language)",
    },
    Entity {
        trigger: "world war",
        name: "World War II",
        wikidata_id: "Q362",
        dbpedia_id: "World_War_II",
    },
    Entity {
        trigger: "shakespeare",
        name: "William Shakespeare",
        wikidata_id: "Q692",
        dbpedia_id: "William_Shakespeare",
    },
    Entity {
        trigger: "darwin",
        name: "Charles Darwin",
        wikidata_id: "Q1035",
        dbpedia_id: "Charles_Darwin",
    },
];

/// The property a fact pattern asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    BirthDate,
    BirthPlace,
    DeathDate,
    NobelYear,
    WorkDate,
}

impl FactKind {
    /// Date kinds compare on the year only.
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            FactKind::BirthDate | FactKind::DeathDate | FactKind::NobelYear | FactKind::WorkDate
        )
    }

    pub fn wikidata_property(&self) -> &'static str {
        match self {
            FactKind::BirthDate => "P569",
            FactKind::BirthPlace => "P19",
            FactKind::DeathDate => "P570",
            FactKind::NobelYear => "P166",
            FactKind::WorkDate => "P571",
        }
    }

    pub fn dbpedia_property(&self) -> &'static str {
        match self {
            FactKind::BirthDate => "dbo:birthDate",
            FactKind::BirthPlace => "dbo:birthPlace",
            FactKind::DeathDate => "dbo:deathDate",
            FactKind::NobelYear => "dbo:award",
            FactKind::WorkDate => "dbo:publicationDate",
        }
    }
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactKind::BirthDate => write!(f, "birth_date"),
            FactKind::BirthPlace => write!(f, "birth_place"),
            FactKind::DeathDate => write!(f, "death_date"),
            FactKind::NobelYear => write!(f, "nobel_year"),
            FactKind::WorkDate => write!(f, "work_date"),
        }
    }
}

/// A checkable micro-fact extracted from a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactPattern {
    pub kind: FactKind,
    pub expected: String,
}

impl FactPattern {
    fn new(kind: FactKind, expected: &str) -> Self {
        Self {
            kind,
            expected: expected.to_string(),
        }
    }

    /// Whether any returned value confirms this pattern.
    pub fn matches(&self, values: &[String]) -> bool {
        let expected = self.expected.to_lowercase();
        values.iter().any(|raw| {
            let value = raw.to_lowercase();
            if self.kind.is_date() {
                ANY_YEAR
                    .find(&value)
                    .is_some_and(|year| year.as_str() == expected)
            } else if self.kind == FactKind::BirthPlace {
                value.contains(&expected)
                    || expected
                        .split_whitespace()
                        .any(|token| token.chars().count() > 3 && value.contains(token))
            } else {
                value.contains(&expected)
            }
        })
    }
}

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[6-9]\d{2}|20[0-2]\d)\b").expect("year pattern"));

static NOBEL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20[0-2]\d)\b").expect("nobel year pattern"));

static PLACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin ([A-Z][a-zA-Z ]*?)(?:[,.;]|\s+(?:in|on|at|and)\s|$)").expect("place pattern")
});

static ANY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("any year pattern"));

const BIRTH_CUES: &[&str] = &["born", "birth"];
const DEATH_CUES: &[&str] = &["died", "death"];
const WORK_CUES: &[&str] = &["theory", "developed", "published", "wrote"];

/// The first registry entity whose trigger occurs in the claim.
pub fn detect_entity(claim: &str) -> Option<&'static Entity> {
    let lower = claim.to_lowercase();
    REGISTRY.iter().find(|entity| lower.contains(entity.trigger))
}

/// Every checkable fact in the claim, in a stable order.
pub fn extract_fact_patterns(claim: &str) -> Vec<FactPattern> {
    let lower = claim.to_lowercase();
    let has_cue = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));
    let years = |re: &Regex| -> Vec<String> {
        re.captures_iter(claim)
            .map(|cap| cap[1].to_string())
            .collect()
    };

    let mut patterns = Vec::new();

    if has_cue(BIRTH_CUES) {
        for year in years(&*YEAR) {
            patterns.push(FactPattern::new(FactKind::BirthDate, &year));
        }
        for cap in PLACE.captures_iter(claim) {
            let place = cap[1].trim();
            if !place.is_empty() {
                patterns.push(FactPattern::new(FactKind::BirthPlace, place));
            }
        }
    }

    if has_cue(DEATH_CUES) {
        for year in years(&*YEAR) {
            patterns.push(FactPattern::new(FactKind::DeathDate, &year));
        }
    }

    if lower.contains("nobel") {
        for year in years(&*NOBEL_YEAR) {
            patterns.push(FactPattern::new(FactKind::NobelYear, &year));
        }
    }

    if has_cue(WORK_CUES) {
        for year in years(&*YEAR) {
            patterns.push(FactPattern::new(FactKind::WorkDate, &year));
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_entity_case_insensitive() {
        let entity = detect_entity("ALBERT EINSTEIN developed relativity").unwrap();
        assert_eq!(entity.wikidata_id, "Q937");
        assert_eq!(entity.dbpedia_id, "Albert_Einstein");
    }

    #[test]
    fn test_detect_entity_registry_order_wins() {
        // Both "newton" and "einstein" occur; einstein is registered first.
        let entity = detect_entity("Newton's laws were refined by Einstein.").unwrap();
        assert_eq!(entity.name, "Albert Einstein");
    }

    #[test]
    fn test_detect_entity_multiword_trigger() {
        let entity = detect_entity("World War II ended in 1945.").unwrap();
        assert_eq!(entity.wikidata_id, "Q362");
    }

    #[test]
    fn test_detect_entity_none() {
        assert!(detect_entity("Marie Curie won two Nobel prizes.").is_none());
    }

    #[test]
    fn test_birth_year_and_place() {
        let patterns = extract_fact_patterns("Albert Einstein was born in 1879 in Ulm, Germany.");
        assert_eq!(
            patterns,
            vec![
                FactPattern::new(FactKind::BirthDate, "1879"),
                FactPattern::new(FactKind::BirthPlace, "Ulm"),
            ]
        );
    }

    #[test]
    fn test_place_stops_before_following_preposition() {
        let patterns = extract_fact_patterns("Newton was born in Woolsthorpe in 1643.");
        assert!(patterns.contains(&FactPattern::new(FactKind::BirthPlace, "Woolsthorpe")));
        assert!(patterns.contains(&FactPattern::new(FactKind::BirthDate, "1643")));
    }

    #[test]
    fn test_nobel_year_range() {
        let patterns = extract_fact_patterns("Einstein won the Nobel Prize in Physics in 1921.");
        assert_eq!(patterns, vec![FactPattern::new(FactKind::NobelYear, "1921")]);

        // 1899 is outside the Nobel range and there is no other cue.
        assert!(extract_fact_patterns("Einstein's Nobel dream began in 1899.").is_empty());
    }

    #[test]
    fn test_death_and_work_cues() {
        let patterns = extract_fact_patterns("Darwin published his theory in 1859 and died in 1882.");
        let kinds: Vec<FactKind> = patterns.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FactKind::DeathDate,
                FactKind::DeathDate,
                FactKind::WorkDate,
                FactKind::WorkDate
            ]
        );
    }

    #[test]
    fn test_year_outside_range_ignored() {
        assert!(extract_fact_patterns("Shakespeare was born in 1564.").is_empty());
    }

    #[test]
    fn test_no_cue_no_patterns() {
        assert!(extract_fact_patterns("Python is a popular language.").is_empty());
    }

    #[test]
    fn test_date_match_uses_first_year() {
        let pattern = FactPattern::new(FactKind::BirthDate, "1879");
        assert!(pattern.matches(&["1879-03-14T00:00:00Z".to_string()]));
        assert!(!pattern.matches(&["1878-03-14T00:00:00Z".to_string()]));
        assert!(!pattern.matches(&[]));
    }

    #[test]
    fn test_place_match_on_token_overlap() {
        let pattern = FactPattern::new(FactKind::BirthPlace, "Ulm");
        assert!(pattern.matches(&["Ulm".to_string()]));
        let pattern = FactPattern::new(FactKind::BirthPlace, "Ulm Germany");
        assert!(pattern.matches(&["http://dbpedia.org/resource/Germany".to_string()]));
        // Tokens of three characters or fewer never count as overlap.
        assert!(!pattern.matches(&["Ulm an der Donau".to_string()]));
        let short = FactPattern::new(FactKind::BirthPlace, "Rio de Janeiro");
        assert!(!short.matches(&["Sao Paulo".to_string()]));
    }

    #[test]
    fn test_property_ids() {
        assert_eq!(FactKind::BirthPlace.wikidata_property(), "P19");
        assert_eq!(FactKind::WorkDate.dbpedia_property(), "dbo:publicationDate");
        assert!(FactKind::NobelYear.is_date());
        assert!(!FactKind::BirthPlace.is_date());
    }
}

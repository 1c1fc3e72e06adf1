//! # claimcheck core
//!
//! Claim-level hallucination detection. A response's claims are judged by a
//! priority-ordered panel of verifier models, disagreements are escalated to a
//! third verifier, medium-risk claims are corroborated against knowledge graphs,
//! and every claim receives a weighted confidence score.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod knowledge;
pub mod pipeline;
pub mod providers;
pub mod risk;
pub mod scoring;
pub mod types;
pub mod verifier;
pub mod voting;

// Re-export commonly used types at the crate root.
pub use config::{ClaimCheckConfig, VerifierConfig, VerifierProvider, load_config, load_config_from};
pub use error::{CheckError, ConfigError, Result, SourceError, VerifierError};
pub use evaluation::{AggregateEvaluation, Annotation, BinaryMetrics, QuestionEvaluation};
pub use knowledge::{
    DbpediaSource, ExternalConsensusVerifier, ExternalReport, FixtureSource, IdScheme,
    KnowledgeSource, WikidataSource,
};
pub use pipeline::{ExternalCheck, Pipeline, PipelineResult};
pub use risk::RiskSummary;
pub use scoring::{ClaimScore, ConfidenceBreakdown, ConfidenceLabel, ConfidenceScorer};
pub use types::{ClaimRecord, ExternalStatus, OpinionOutcome, RiskLevel, Verdict, VerifierOpinion};
pub use verifier::{MockVerifier, Verifier};
pub use voting::{PrioritizedVoting, VotingOutcome};

//! Keyword triage for symptom queries
//!
//! Everything here is a pure function of the query text, except the relevance
//! classifier which may consult a remote oracle when no local keyword matches.

pub mod normalize;
pub mod relevance;
pub mod remedies;
pub mod risk;

pub use normalize::normalize;
pub use relevance::{
    classify, fallback_keyword_in, is_health_related, parse_remote_verdict, RelevanceOracle,
    Verdict, VerdictSource, FALLBACK_KEYWORDS,
};
pub use remedies::{matched_symptom, remedies_for, KnownSymptom, RemedyBundle, RemedyCategory};
pub use risk::{risk_score, RiskLevel, RISK_KEYWORDS};

//! Health-relevance classification
//!
//! Obvious symptom queries are accepted locally by keyword. Anything else is
//! handed to a [`RelevanceOracle`] (the remote language model in production)
//! whose yes/no reply decides the verdict.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Terms whose presence accepts a query without asking the remote oracle
pub const FALLBACK_KEYWORDS: [&str; 7] = [
    "fever",
    "pain",
    "sore throat",
    "vomit",
    "headache",
    "body pain",
    "cough",
];

/// Remote judge for queries the keyword list cannot decide
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Return the oracle's free-text yes/no judgment for the query
    async fn judge(&self, query: &str) -> Result<String, Self::Error>;
}

/// Where a verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum VerdictSource {
    /// A fallback keyword matched locally
    LocalKeyword { keyword: &'static str },
    /// The remote oracle was consulted
    Remote,
}

/// Outcome of the relevance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub health_related: bool,
    #[serde(flatten)]
    pub source: VerdictSource,
}

/// First fallback keyword contained in the query, if any
pub fn fallback_keyword_in(query: &str) -> Option<&'static str> {
    let lower = query.to_lowercase();
    FALLBACK_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lower.contains(keyword))
}

/// Interpret the oracle's reply: negative iff it contains "no" anywhere.
///
/// This is a substring test, so replies such as "not sure" or "I don't know"
/// also count as negative.
pub fn parse_remote_verdict(reply: &str) -> bool {
    !reply.to_lowercase().contains("no")
}

/// Decide whether a query is health-related, reporting how the decision was made.
///
/// Oracle failures are returned unchanged; there is no default verdict on error.
pub async fn classify<O>(query: &str, oracle: &O) -> Result<Verdict, O::Error>
where
    O: RelevanceOracle + ?Sized,
{
    if let Some(keyword) = fallback_keyword_in(query) {
        debug!("Relevance accepted locally on keyword '{}'", keyword);
        return Ok(Verdict {
            health_related: true,
            source: VerdictSource::LocalKeyword { keyword },
        });
    }

    let reply = oracle.judge(query).await?;
    let health_related = parse_remote_verdict(&reply);
    debug!(
        "Relevance decided remotely: {} (reply: {})",
        health_related,
        reply.chars().take(80).collect::<String>()
    );

    Ok(Verdict {
        health_related,
        source: VerdictSource::Remote,
    })
}

/// Boolean form of [`classify`]
pub async fn is_health_related<O>(query: &str, oracle: &O) -> Result<bool, O::Error>
where
    O: RelevanceOracle + ?Sized,
{
    classify(query, oracle).await.map(|v| v.health_related)
}

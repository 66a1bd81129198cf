//! Keyword-based risk estimate.

use serde::Serialize;

/// Alarm keywords, each counted at most once
pub const RISK_KEYWORDS: [&str; 5] = ["fever", "cough", "chest pain", "vomit", "bleeding"];

const POINTS_PER_KEYWORD: usize = 20;
const MAX_SCORE: usize = 100;

/// Score a query in [0, 100]: 20 points per distinct alarm keyword present.
pub fn risk_score(query: &str) -> u8 {
    let lower = query.to_lowercase();
    let hits = RISK_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count();
    (hits * POINTS_PER_KEYWORD).min(MAX_SCORE) as u8
}

/// Display band for a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0 => Self::None,
            1..=40 => Self::Low,
            41..=79 => Self::Moderate,
            _ => Self::High,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

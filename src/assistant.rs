//! One question-to-answer cycle: normalize, check relevance, fetch advice,
//! then attach the local risk estimate and remedy suggestions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::llm_client::{LlmClient, LlmError};
use crate::stt_client::{load_wav, RecognitionError, SttClient};
use crate::triage::{
    classify, matched_symptom, normalize, remedies_for, risk_score, KnownSymptom, RemedyBundle,
    RiskLevel, Verdict,
};

/// General advice appended to every answer
pub const FIRST_AID_NOTE: &str =
    "Stay hydrated, rest well, and consult a doctor if symptoms get worse.";

/// Shown when a query is judged not health-related
pub const REJECTION_MESSAGE: &str =
    "Not a health-related query. Please ask about symptoms or conditions.";

/// Failure of one cycle; the assistant itself stays usable
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Error while validating: {0}")]
    Validation(#[source] LlmError),

    #[error("Failed to fetch response: {0}")]
    Advice(#[source] LlmError),

    #[error("Speech recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Everything shown for an accepted query
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub query: String,
    pub normalized_query: String,
    pub verdict: Verdict,
    pub advice: String,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub symptom: Option<KnownSymptom>,
    pub remedies: RemedyBundle,
    pub first_aid: String,
    pub model_used: String,
    pub generated_at: DateTime<Utc>,
}

/// Result of a cycle that did not fail
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Nothing left after normalization
    Empty,
    NotHealthRelated { normalized_query: String },
    Answered(Box<Report>),
}

impl QueryOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Answered(report) => Some(report),
            _ => None,
        }
    }
}

/// Assemble a report from the remote advice and the local triage
pub fn build_report(
    query: &str,
    normalized_query: &str,
    verdict: Verdict,
    advice: String,
    model_used: &str,
) -> Report {
    let score = risk_score(normalized_query);
    Report {
        query: query.to_string(),
        normalized_query: normalized_query.to_string(),
        verdict,
        advice,
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        symptom: matched_symptom(normalized_query),
        remedies: remedies_for(normalized_query),
        first_aid: FIRST_AID_NOTE.to_string(),
        model_used: model_used.to_string(),
        generated_at: Utc::now(),
    }
}

/// Question-answering pipeline bound to one configuration
pub struct Assistant {
    config: Config,
    llm: LlmClient,
    stt: SttClient,
}

impl Assistant {
    pub fn new(config: Config) -> Result<Self, AssistantError> {
        let llm = LlmClient::from_config(&config).map_err(|e| AssistantError::Config(e.to_string()))?;
        let stt = SttClient::from_config(&config).map_err(|e| AssistantError::Config(e.to_string()))?;
        Ok(Self { config, llm, stt })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one cycle for a typed or transcribed query
    pub async fn handle_query(&self, raw: &str) -> Result<QueryOutcome, AssistantError> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            debug!("Query empty after normalization");
            return Ok(QueryOutcome::Empty);
        }

        let verdict = classify(&normalized, &self.llm)
            .await
            .map_err(AssistantError::Validation)?;
        if !verdict.health_related {
            info!("Query rejected as not health-related");
            return Ok(QueryOutcome::NotHealthRelated {
                normalized_query: normalized,
            });
        }

        let advice = self
            .llm
            .generate_advice(&normalized)
            .await
            .map_err(AssistantError::Advice)?;

        let report = build_report(raw, &normalized, verdict, advice, self.llm.model());
        info!(
            "Answered query (risk {}%, symptom {:?})",
            report.risk_score, report.symptom
        );
        Ok(QueryOutcome::Answered(Box::new(report)))
    }

    /// Transcribe a WAV file
    pub async fn transcribe_file(&self, path: &Path) -> Result<String, AssistantError> {
        let clip = load_wav(path)?;
        let transcript = self.stt.transcribe(&clip).await?;
        info!(
            "Transcribed {:?}: {} chars",
            path,
            transcript.chars().count()
        );
        Ok(transcript)
    }

    /// Transcribe a WAV file and answer it; returns the transcript with the outcome
    pub async fn handle_voice_file(
        &self,
        path: &Path,
    ) -> Result<(String, QueryOutcome), AssistantError> {
        let transcript = self.transcribe_file(path).await?;
        let outcome = self.handle_query(&transcript).await?;
        Ok((transcript, outcome))
    }

    /// Record from the configured input device and transcribe
    #[cfg(feature = "microphone")]
    pub async fn record_and_transcribe(&self) -> Result<String, AssistantError> {
        let device = self.config.input_device_id.clone();
        let duration = self.config.record_duration();
        info!("Listening for {:?}", duration);

        let clip = tokio::task::spawn_blocking(move || {
            crate::audio::record_clip(device.as_deref(), duration)
        })
        .await
        .map_err(|e| RecognitionError::Audio(format!("Recording task failed: {}", e)))??;

        Ok(self.stt.transcribe(&clip).await?)
    }

    /// Record from the microphone and answer what was said
    #[cfg(feature = "microphone")]
    pub async fn handle_microphone(&self) -> Result<(String, QueryOutcome), AssistantError> {
        let transcript = self.record_and_transcribe().await?;
        let outcome = self.handle_query(&transcript).await?;
        Ok((transcript, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::{RemedyCategory, VerdictSource};

    fn keyword_verdict(keyword: &'static str) -> Verdict {
        Verdict {
            health_related: true,
            source: VerdictSource::LocalKeyword { keyword },
        }
    }

    #[test]
    fn test_build_report_uses_normalized_query() {
        let report = build_report(
            "Bodypain and FEVER",
            "body pain and fever",
            keyword_verdict("fever"),
            "Rest.".to_string(),
            "llama3-8b-8192",
        );
        assert_eq!(report.query, "Bodypain and FEVER");
        assert_eq!(report.risk_score, 20);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.symptom, Some(KnownSymptom::Fever));
        assert_eq!(
            report.remedies.get(RemedyCategory::Allopathic).unwrap(),
            ["Paracetamol", "Ibuprofen"]
        );
        assert_eq!(report.first_aid, FIRST_AID_NOTE);
    }

    #[test]
    fn test_build_report_without_known_symptom() {
        let report = build_report(
            "sore throat",
            "sore throat",
            keyword_verdict("sore throat"),
            String::new(),
            "m",
        );
        assert_eq!(report.risk_score, 0);
        assert_eq!(report.risk_level, RiskLevel::None);
        assert!(report.symptom.is_none());
        assert!(report.remedies.is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(QueryOutcome::Empty).unwrap();
        assert_eq!(json["outcome"], "empty");

        let json = serde_json::to_value(QueryOutcome::NotHealthRelated {
            normalized_query: "weather".to_string(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "not_health_related");
        assert_eq!(json["normalized_query"], "weather");

        let report = build_report("cough", "cough", keyword_verdict("cough"), "x".into(), "m");
        let json = serde_json::to_value(QueryOutcome::Answered(Box::new(report))).unwrap();
        assert_eq!(json["outcome"], "answered");
        assert_eq!(json["risk_score"], 20);
        assert_eq!(json["risk_level"], "low");
        assert_eq!(json["symptom"], "cough");
        assert_eq!(json["verdict"]["source"], "local_keyword");
        assert_eq!(json["verdict"]["keyword"], "cough");
        assert_eq!(json["remedies"]["homeopathic"][0], "Drosera");
    }

    #[test]
    fn test_assistant_requires_api_key() {
        let result = Assistant::new(Config::default());
        assert!(matches!(result, Err(AssistantError::Config(_))));
    }

    #[tokio::test]
    async fn test_blank_query_is_empty_without_network() {
        let mut config = Config::default();
        config.api_key = Some("test".to_string());
        // unroutable: any request would fail the test
        config.api_base_url = "http://127.0.0.1:1".to_string();
        let assistant = Assistant::new(config).unwrap();

        let outcome = assistant.handle_query("   \t ").await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Empty));
        assert!(outcome.report().is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_is_typed() {
        let mut config = Config::default();
        config.api_key = Some("test".to_string());
        config.api_base_url = "http://127.0.0.1:1".to_string();
        config.request_timeout_secs = 2;
        let assistant = Assistant::new(config).unwrap();

        let err = assistant.handle_query("what's the weather").await.unwrap_err();
        assert!(matches!(err, AssistantError::Validation(_)));
        assert!(err.to_string().starts_with("Error while validating"));
    }
}

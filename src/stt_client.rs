//! Speech-to-text client for the OpenAI-compatible `/v1/audio/transcriptions` endpoint
//!
//! Audio is uploaded as a mono 16-bit WAV. Recordings can come from a file on
//! disk or, with the `microphone` feature, from a live input device.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::{
    build_client, calculate_backoff, is_retryable_error, is_retryable_status, validate_base_url,
};

/// Speech recognition failures
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("Could not read audio: {0}")]
    Audio(String),

    #[error("No speech recognized")]
    NoSpeech,

    #[error("{0}")]
    InvalidUrl(String),

    #[error("Failed to send transcription request: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transcription service returned error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<hound::Error> for RecognitionError {
    fn from(err: hound::Error) -> Self {
        Self::Audio(err.to_string())
    }
}

/// Response from the transcription endpoint
#[derive(Debug, Clone, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Mono audio normalized to [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Encode f32 samples as a mono 16-bit PCM WAV file in memory
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, RecognitionError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * 32767.0) as i16)?;
        }
        writer.finalize()?;
    }

    Ok(buffer.into_inner())
}

/// Read a WAV file into a mono clip, keeping only the first channel
pub fn load_wav(path: &Path) -> Result<AudioClip, RecognitionError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| RecognitionError::Audio(format!("{:?}: {}", path, e)))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<f32>, hound::Error>>()?
        }
    };

    let samples = interleaved.into_iter().step_by(channels).collect();
    let clip = AudioClip::new(samples, spec.sample_rate);

    debug!(
        "Loaded {:?}: {:.2}s at {} Hz ({} channel(s))",
        path,
        clip.duration_secs(),
        clip.sample_rate,
        channels
    );

    Ok(clip)
}

/// Transcription client
#[derive(Debug)]
pub struct SttClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    language: String,
    max_attempts: u32,
}

impl SttClient {
    /// Create a new transcription client with URL validation
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        language: &str,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, RecognitionError> {
        let base_url =
            validate_base_url(base_url, "Transcription").map_err(RecognitionError::InvalidUrl)?;
        let client = build_client(timeout)?;

        info!("SttClient created for {} with model {}", base_url, model);

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
            language: language.to_string(),
            max_attempts: max_attempts.max(1),
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self, RecognitionError> {
        Self::new(
            &config.api_base_url,
            config.api_key.as_deref().unwrap_or_default(),
            &config.transcription_model,
            &config.language,
            config.request_timeout(),
            config.max_attempts,
        )
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.api_key.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// Build the multipart form for one upload
    fn build_form(&self, wav_bytes: Vec<u8>) -> Result<reqwest::multipart::Form, RecognitionError> {
        let file_part = reqwest::multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("temperature", "0.0");

        if self.language != "auto" && !self.language.is_empty() {
            form = form.text("language", self.language.clone());
        }

        Ok(form)
    }

    /// Transcribe a clip, returning the trimmed transcript.
    ///
    /// Empty audio or an empty transcript is reported as [`RecognitionError::NoSpeech`].
    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String, RecognitionError> {
        if clip.is_empty() {
            return Err(RecognitionError::NoSpeech);
        }

        let wav_bytes = encode_wav(&clip.samples, clip.sample_rate)?;
        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        debug!(
            "Transcribing {} samples ({:.2}s) via {}",
            clip.samples.len(),
            clip.duration_secs(),
            url
        );

        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = calculate_backoff(attempt - 1);
                warn!(
                    "Transcription attempt {} failed, retrying in {:?}",
                    attempt, backoff
                );
                tokio::time::sleep(backoff).await;
            }

            let form = self.build_form(wav_bytes.clone())?;

            match self
                .client
                .post(&url)
                .headers(self.auth_headers())
                .multipart(form)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let result: TranscriptionResponse = response
                            .json()
                            .await
                            .map_err(|e| RecognitionError::Parse(e.to_string()))?;
                        let text = result.text.trim().to_string();
                        debug!("Transcription result: {} chars", text.chars().count());
                        if text.is_empty() {
                            return Err(RecognitionError::NoSpeech);
                        }
                        return Ok(text);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = RecognitionError::Status { status, body };
                    if is_retryable_status(status) {
                        last_error = Some(err);
                        continue;
                    }
                    error!("Transcription failed: {}", err);
                    return Err(err);
                }
                Err(e) => {
                    if is_retryable_error(&e) {
                        last_error = Some(RecognitionError::Network(e));
                        continue;
                    }
                    return Err(RecognitionError::Network(e));
                }
            }
        }

        let err = last_error.unwrap_or(RecognitionError::NoSpeech);
        error!(
            "Transcription failed after {} attempt(s): {}",
            self.max_attempts, err
        );
        Err(err)
    }
}

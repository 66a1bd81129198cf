//! Health query assistant
//!
//! Typed or spoken questions are normalized, checked for health relevance
//! (locally by keyword, otherwise by a remote language model), answered with
//! remote advice, and enriched with a keyword risk estimate and canned remedy
//! suggestions. Answers can be read aloud through system speech programs.

pub mod assistant;
#[cfg(feature = "microphone")]
pub mod audio;
pub mod config;
mod http;
pub mod llm_client;
pub mod report;
pub mod speech;
pub mod stt_client;
pub mod triage;


pub use assistant::{
    build_report, Assistant, AssistantError, QueryOutcome, Report, FIRST_AID_NOTE,
    REJECTION_MESSAGE,
};
pub use config::{Config, SpeechConfig};
pub use llm_client::{LlmClient, LlmError};
pub use speech::{PlaybackHandle, Speaker, SpeechError};
pub use stt_client::{encode_wav, load_wav, AudioClip, RecognitionError, SttClient};

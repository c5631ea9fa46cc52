//! Thin request/response clients for the external OpenAI services the
//! pipeline chains together: chat completions (titles and scripts), speech
//! synthesis, and word-level transcription.

pub mod chat;
pub mod stt;
pub mod tts;

pub use chat::ChatClient;
pub use stt::{Narration, SttClient};
pub use tts::TtsClient;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OpenAiConfig;

/// Chat message for completion requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub(crate) fn build_http_client(config: &OpenAiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;
    Ok(client)
}

pub(crate) fn require_api_key(config: &OpenAiConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("OpenAI API key not configured (set OPENAI_API_KEY)"))
}

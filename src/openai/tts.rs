use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{build_http_client, require_api_key};
use crate::config::{OpenAiConfig, TtsConfig};

/// Speech-synthesis client: turns a narration script into an audio file.
pub struct TtsClient {
    api: OpenAiConfig,
    config: TtsConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
    response_format: String,
}

impl TtsClient {
    pub fn new(api: OpenAiConfig, config: TtsConfig) -> Result<Self> {
        require_api_key(&api)?;
        let client = build_http_client(&api)?;
        Ok(Self {
            api,
            config,
            client,
        })
    }

    /// Synthesize narration audio and write it to `output_path`.
    pub async fn synthesize(&self, text: &str, output_path: &Path) -> Result<PathBuf> {
        if text.trim().is_empty() {
            return Err(anyhow!("cannot synthesize speech from an empty script"));
        }

        let api_key = require_api_key(&self.api)?;
        let url = format!("{}/audio/speech", self.api.base_url);

        let request = SpeechRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
            voice: self.config.voice.clone(),
            response_format: self.config.format.clone(),
        };

        debug!("Sending speech synthesis request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("speech synthesis API error {}: {}", status, text));
        }

        let audio_bytes = response.bytes().await?;
        if audio_bytes.is_empty() {
            return Err(anyhow!("speech synthesis returned no audio data"));
        }

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output_path, &audio_bytes).await?;

        info!(
            "🎵 Narration audio written: {} ({} bytes)",
            output_path.display(),
            audio_bytes.len()
        );
        Ok(output_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_client_requires_api_key() {
        let api = OpenAiConfig {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 5,
        };
        assert!(TtsClient::new(api, Config::default().tts).is_err());
    }

    #[tokio::test]
    async fn test_empty_script_is_rejected_before_any_request() {
        let api = OpenAiConfig {
            api_key: Some("test-key".to_string()),
            base_url: "http://localhost:1".to_string(),
            timeout_seconds: 1,
        };
        let client = TtsClient::new(api, Config::default().tts).unwrap();
        let err = client
            .synthesize("   ", Path::new("/tmp/never-written.mp3"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty script"));
    }
}

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::{build_http_client, require_api_key};
use crate::config::{OpenAiConfig, SttConfig};
use crate::timeline::WordTiming;

/// Transcription output consumed by the timeline builder: full text, total
/// narration duration, and per-word timing windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narration {
    pub text: String,
    pub duration: f64,
    pub words: Vec<WordTiming>,
}

/// Word-level transcription client (verbose_json with word timestamps).
pub struct SttClient {
    api: OpenAiConfig,
    config: SttConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    duration: f64,
    #[serde(default)]
    words: Vec<WordTiming>,
}

impl SttClient {
    pub fn new(api: OpenAiConfig, config: SttConfig) -> Result<Self> {
        require_api_key(&api)?;
        let client = build_http_client(&api)?;
        Ok(Self {
            api,
            config,
            client,
        })
    }

    /// Upload the narration audio and return its word-timed transcription.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<Narration> {
        let api_key = require_api_key(&self.api)?;
        let url = format!("{}/audio/transcriptions", self.api.base_url);

        let audio_data = tokio::fs::read(audio_path).await.map_err(|e| {
            anyhow!("failed to read audio file {}: {}", audio_path.display(), e)
        })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "speech.mp3".to_string());

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")?,
            )
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        debug!("Uploading {} for transcription", audio_path.display());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("transcription API error {}: {}", status, text));
        }

        let body = response.text().await?;
        let narration = parse_verbose_json(&body)?;

        info!(
            "🎤 Transcribed {:.2}s of narration into {} words",
            narration.duration,
            narration.words.len()
        );
        Ok(narration)
    }
}

/// Parse a verbose_json transcription payload into a `Narration`.
fn parse_verbose_json(body: &str) -> Result<Narration> {
    let parsed: VerboseTranscription =
        serde_json::from_str(body).map_err(|e| anyhow!("malformed transcription response: {e}"))?;
    Ok(Narration {
        text: parsed.text,
        duration: parsed.duration,
        words: parsed.words,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_parse_verbose_json_with_word_timestamps() {
        let body = r#"{
            "task": "transcribe",
            "language": "english",
            "duration": 3.5,
            "text": "Today is a wonderful day",
            "words": [
                {"word": "Today", "start": 0.0, "end": 0.36},
                {"word": "is", "start": 0.36, "end": 0.58},
                {"word": "a", "start": 0.58, "end": 0.78},
                {"word": "wonderful", "start": 0.78, "end": 1.16},
                {"word": "day", "start": 1.16, "end": 1.52}
            ]
        }"#;

        let narration = parse_verbose_json(body).unwrap();
        assert_eq!(narration.duration, 3.5);
        assert_eq!(narration.words.len(), 5);
        assert_eq!(narration.words[0].word, "Today");
        assert_eq!(narration.words[4].end, 1.52);
    }

    #[test]
    fn test_parse_verbose_json_without_words_yields_empty_list() {
        let body = r#"{"duration": 1.0, "text": "silence"}"#;
        let narration = parse_verbose_json(body).unwrap();
        assert!(narration.words.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        assert!(parse_verbose_json("not json").is_err());
        assert!(parse_verbose_json(r#"{"text": "missing duration"}"#).is_err());
    }

    #[test]
    fn test_client_requires_api_key() {
        let api = OpenAiConfig {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 5,
        };
        assert!(SttClient::new(api, Config::default().stt).is_err());
    }
}

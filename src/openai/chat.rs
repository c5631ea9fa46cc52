use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_http_client, require_api_key, ChatMessage};
use crate::config::{ChatConfig, OpenAiConfig};

/// Chat-completions client used for title and script generation.
pub struct ChatClient {
    api: OpenAiConfig,
    config: ChatConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatClient {
    pub fn new(api: OpenAiConfig, config: ChatConfig) -> Result<Self> {
        require_api_key(&api)?;
        let client = build_http_client(&api)?;
        Ok(Self {
            api,
            config,
            client,
        })
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let api_key = require_api_key(&self.api)?;
        let url = format!("{}/chat/completions", self.api.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending chat completion request to {}", url);

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
            return Err(anyhow!("chat completion API error {}: {}", status, text));
        }

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .first()
            .ok_or_else(|| anyhow!("no choices in chat completion response"))?
            .message
            .content
            .trim()
            .to_string();

        Ok(content)
    }

    /// Generate a batch of candidate video titles for a topic.
    pub async fn generate_titles(&self, topic: &str) -> Result<Vec<String>> {
        let messages = vec![
            ChatMessage::system(
                "You are an expert in SEO and content creation, specializing in \
                 generating catchy and engaging YouTube short titles that attract \
                 viewers and rank well on search engines.",
            ),
            ChatMessage::user(format!(
                "Provide a list of YouTube short titles focused on {topic}, with no \
                 introductory or closing remarks, and without numbering the titles."
            )),
        ];

        let raw = self.complete(messages).await?;
        let titles = clean_titles(&raw);
        if titles.is_empty() {
            return Err(anyhow!("title generation returned no usable titles"));
        }

        info!("✍️ Generated {} candidate titles for '{}'", titles.len(), topic);
        Ok(titles)
    }

    /// Generate a 20-30 second narration script for a title.
    pub async fn generate_script(&self, title: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(
                "You are a skilled scriptwriter for YouTube shorts, focusing on \
                 engaging and informative content.",
            ),
            ChatMessage::user(format!(
                "Write a 20-30 second YouTube short related to '{title}'. Do not \
                 include headings like 'Hook', 'Beginning', 'Middle', 'End' - just \
                 the script. Do not quote anyone in the script. The ending should \
                 be an open-ended question."
            )),
        ];

        let script = self.complete(messages).await?;
        if script.is_empty() {
            return Err(anyhow!("script generation returned empty content"));
        }

        info!("📝 Generated script for '{}' ({} characters)", title, script.len());
        Ok(script)
    }
}

/// Normalize raw model output into one clean title per line: list dashes
/// stripped, doubled spaces collapsed, blank lines dropped.
fn clean_titles(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.replace('-', "").replace("  ", " "))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_titles_strips_dashes_and_blank_lines() {
        let raw = "- Stoic Mindset Hacks\n\n-  Mental Toughness 101\n";
        let titles = clean_titles(raw);
        assert_eq!(titles, vec!["Stoic Mindset Hacks", "Mental Toughness 101"]);
    }

    #[test]
    fn test_clean_titles_empty_input() {
        assert!(clean_titles("").is_empty());
        assert!(clean_titles("\n\n").is_empty());
    }

    #[test]
    fn test_client_requires_api_key() {
        let api = OpenAiConfig {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 5,
        };
        assert!(ChatClient::new(api, crate::config::Config::default().chat).is_err());
    }
}

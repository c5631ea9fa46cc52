use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::timeline::{CaptionStyle, Rgb};

/// Configuration for the shorts generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shared OpenAI API access settings
    pub api: OpenAiConfig,

    /// Title and script generation settings
    pub chat: ChatConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// Word-level transcription settings
    pub stt: SttConfig,

    /// Video composition and encoding settings
    pub render: RenderConfig,

    /// Working files and output locations
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; usually supplied via OPENAI_API_KEY
    pub api_key: Option<String>,

    /// Base URL for all API calls
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model for title and script generation
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Speech synthesis model
    pub model: String,

    /// Voice preset
    pub voice: String,

    /// Audio container format for the narration
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Transcription model
    pub model: String,

    /// Language hint for transcription
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output frame width
    pub width: u32,

    /// Output frame height
    pub height: u32,

    /// Background fill color
    pub background_color: Rgb,

    /// Caption styling, uniform across one video
    pub caption: CaptionStyle,

    /// Video codec passed to the encoder
    pub codec: String,

    /// Output frame rate
    pub frame_rate: u32,

    /// Encoder worker threads; defaults to the logical CPU count
    pub threads: usize,

    /// Encoder binary location
    pub ffmpeg_binary: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory for intermediate hand-off files
    pub temp_dir: PathBuf,

    /// Directory for finished videos
    pub output_dir: PathBuf,

    /// Unused-titles queue file name (inside temp_dir)
    pub titles_file: String,

    /// Generated-scripts log file name (inside temp_dir)
    pub scripts_file: String,

    /// Keep intermediate files after a successful render
    pub keep_temp_files: bool,
}

impl Config {
    /// Load configuration, trying an explicit path first, then the usual
    /// locations, falling back to defaults plus environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit_path {
            candidates.push(path.to_path_buf());
        }
        candidates.push(PathBuf::from("shortgen.toml"));
        candidates.push(PathBuf::from("config/shortgen.toml"));

        for path in &candidates {
            match std::fs::read_to_string(path) {
                Ok(config_str) => match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        if explicit_path == Some(path.as_path()) {
                            return Err(anyhow!(
                                "failed to parse config file {}: {}",
                                path.display(),
                                e
                            ));
                        }
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                },
                Err(_) => {
                    if explicit_path == Some(path.as_path()) {
                        return Err(anyhow!("config file not found: {}", path.display()));
                    }
                }
            }
        }

        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override settings from environment variables.
    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                self.api.api_key = Some(api_key);
            }
        }

        if let Ok(base_url) = std::env::var("SHORTGEN_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(output_dir) = std::env::var("SHORTGEN_OUTPUT_DIR") {
            self.pipeline.output_dir = PathBuf::from(output_dir);
        }

        if let Ok(threads) = std::env::var("SHORTGEN_THREADS") {
            if let Ok(threads) = threads.parse() {
                self.render.threads = threads;
            }
        }

        if let Ok(ffmpeg) = std::env::var("SHORTGEN_FFMPEG") {
            self.render.ffmpeg_binary = PathBuf::from(ffmpeg);
        }
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration before any pipeline work starts.
    pub fn validate(&self) -> Result<()> {
        if self.render.frame_rate == 0 {
            return Err(anyhow!("render.frame_rate must be greater than 0"));
        }
        if self.render.threads == 0 {
            return Err(anyhow!("render.threads must be at least 1"));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(anyhow!("render.width and render.height must be non-zero"));
        }
        if self.render.width % 2 != 0 || self.render.height % 2 != 0 {
            return Err(anyhow!("render.width and render.height must be even"));
        }
        if self.api.base_url.is_empty() {
            return Err(anyhow!("api.base_url must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: OpenAiConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                timeout_seconds: 120,
            },
            chat: ChatConfig {
                model: "gpt-4o-mini".to_string(),
                max_tokens: 1024,
                temperature: 0.7,
            },
            tts: TtsConfig {
                model: "tts-1".to_string(),
                voice: "alloy".to_string(),
                format: "mp3".to_string(),
            },
            stt: SttConfig {
                model: "whisper-1".to_string(),
                language: None,
            },
            render: RenderConfig {
                width: 1080,
                height: 1920,
                background_color: Rgb::WHITE,
                caption: CaptionStyle::default(),
                codec: "libx264".to_string(),
                frame_rate: 24,
                threads: num_cpus::get(),
                ffmpeg_binary: PathBuf::from("ffmpeg"),
            },
            pipeline: PipelineConfig {
                temp_dir: PathBuf::from("./temp"),
                output_dir: PathBuf::from("./output"),
                titles_file: "youtube_titles.txt".to_string(),
                scripts_file: "youtube_scripts.jsonl".to_string(),
                keep_temp_files: true,
            },
        }
    }
}

/// Configuration builder for programmatic config creation.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api.api_key = Some(api_key.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.output_dir = dir.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.temp_dir = dir.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.render.threads = threads;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.config.render.frame_rate = frame_rate;
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.render.codec = codec.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

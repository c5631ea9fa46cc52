use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::openai::{ChatClient, Narration, SttClient, TtsClient};
use crate::render::{CancelToken, Compositor, RenderJob, RenderProgress};
use crate::state::{ScriptEntry, ScriptLog, TitleQueue};
use crate::timeline::{build_timeline, AudioTrack, BackgroundElement};

/// Stages of one end-to-end generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStage {
    Titles,
    Script,
    Speech,
    Words,
    Render,
}

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub title: String,
    pub script: String,
    pub audio_path: PathBuf,
    pub video_path: PathBuf,
    pub word_count: usize,
    pub duration: f64,
    pub processing_time: Duration,
    pub stages_completed: Vec<PipelineStage>,
}

/// Sequential generation pipeline: topic in, captioned video out.
///
/// Each stage hands its result to the next through files in the temp dir,
/// so titles generated in one run can be consumed by later runs.
pub struct ShortsPipeline {
    config: Config,
    chat: ChatClient,
    tts: TtsClient,
    stt: SttClient,
    compositor: Compositor,
    titles: TitleQueue,
    scripts: ScriptLog,
}

impl ShortsPipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let chat = ChatClient::new(config.api.clone(), config.chat.clone())?;
        let tts = TtsClient::new(config.api.clone(), config.tts.clone())?;
        let stt = SttClient::new(config.api.clone(), config.stt.clone())?;

        let titles = TitleQueue::new(config.pipeline.temp_dir.join(&config.pipeline.titles_file));
        let scripts = ScriptLog::new(config.pipeline.temp_dir.join(&config.pipeline.scripts_file));

        Ok(Self {
            config,
            chat,
            tts,
            stt,
            compositor: Compositor::new(),
            titles,
            scripts,
        })
    }

    /// Forward render progress updates to the given channel. Previously
    /// handed-out cancel tokens stay valid.
    pub fn with_progress(mut self, progress: mpsc::Sender<RenderProgress>) -> Self {
        self.compositor = self.compositor.with_progress(progress);
        self
    }

    /// Token that aborts the render stage when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.compositor.cancel_token()
    }

    /// Run the full pipeline for a topic and return the produced artifacts.
    pub async fn run(&self, topic: &str) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let mut stages_completed = Vec::new();

        tokio::fs::create_dir_all(&self.config.pipeline.temp_dir).await?;
        tokio::fs::create_dir_all(&self.config.pipeline.output_dir).await?;

        // Stage 1: candidate titles for the topic, queued for this and
        // future runs.
        let generated = self.chat.generate_titles(topic).await?;
        self.titles.append(&generated).await?;
        stages_completed.push(PipelineStage::Titles);

        // Stage 2: script for the first unused title.
        let title = self
            .titles
            .pop_first()
            .await?
            .ok_or_else(|| anyhow!("no unused titles available for topic '{topic}'"))?;
        let script = self.chat.generate_script(&title).await?;
        self.scripts
            .append(&ScriptEntry {
                title: title.clone(),
                script: script.clone(),
            })
            .await?;
        stages_completed.push(PipelineStage::Script);

        // Stage 3: narration audio.
        let audio_path = self
            .config
            .pipeline
            .temp_dir
            .join(format!("speech.{}", self.config.tts.format));
        self.tts.synthesize(&script, &audio_path).await?;
        stages_completed.push(PipelineStage::Speech);

        // Stage 4: word timings from the narration we just synthesized.
        let narration = self.stt.transcribe(&audio_path).await?;
        self.persist_transcription(&narration).await?;
        stages_completed.push(PipelineStage::Words);

        // Stage 5: compose and encode the captioned video.
        let video_path = self.video_output_path(&title);
        let captions = build_timeline(&narration.words, &self.config.render.caption);
        let background = BackgroundElement {
            width: self.config.render.width,
            height: self.config.render.height,
            color: self.config.render.background_color,
            duration: narration.duration,
        };
        let job = RenderJob::new(&video_path)
            .with_codec(self.config.render.codec.clone())
            .with_frame_rate(self.config.render.frame_rate)
            .with_thread_count(self.config.render.threads)
            .with_ffmpeg_binary(self.config.render.ffmpeg_binary.clone());

        self.compositor
            .render_video(&background, &captions, &AudioTrack::new(&audio_path), &job)
            .await
            .with_context(|| format!("rendering '{}' failed", title))?;
        stages_completed.push(PipelineStage::Render);

        if !self.config.pipeline.keep_temp_files {
            self.cleanup_intermediates(&audio_path).await;
        }

        let result = PipelineResult {
            title,
            script,
            audio_path,
            video_path,
            word_count: narration.words.len(),
            duration: narration.duration,
            processing_time: start_time.elapsed(),
            stages_completed,
        };

        info!(
            "🎉 Finished '{}': {:.2}s video, {} captions, in {:.2}s",
            result.title,
            result.duration,
            result.word_count,
            result.processing_time.as_secs_f64()
        );
        Ok(result)
    }

    async fn persist_transcription(&self, narration: &Narration) -> Result<()> {
        let path = self.config.pipeline.temp_dir.join("transcription.json");
        let json = serde_json::to_string_pretty(narration)?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }

    async fn cleanup_intermediates(&self, audio_path: &std::path::Path) {
        // The title queue and script log are durable state and always kept.
        for path in [
            audio_path.to_path_buf(),
            self.config.pipeline.temp_dir.join("transcription.json"),
        ] {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove temp file {}: {}", path.display(), e);
                }
            }
        }
    }

    fn video_output_path(&self, title: &str) -> PathBuf {
        self.config
            .pipeline
            .output_dir
            .join(format!("{}.mp4", slugify(title)))
    }
}

/// File-name-safe slug from a video title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(64);
    if slug.is_empty() {
        slug.push_str("short");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        ConfigBuilder::new()
            .with_api_key("test-key")
            .with_temp_dir(dir.path().join("temp"))
            .with_output_dir(dir.path().join("output"))
            .build()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Stoic Mindset Hacks!"), "stoic-mindset-hacks");
        assert_eq!(slugify("  Why? Because."), "why-because");
        assert_eq!(slugify("!!!"), "short");
    }

    #[test]
    fn test_slugify_truncates_long_titles() {
        let long = "word ".repeat(40);
        assert!(slugify(&long).len() <= 64);
    }

    #[test]
    fn test_pipeline_requires_api_key() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.api.api_key = None;
        assert!(ShortsPipeline::new(config).is_err());
    }

    #[test]
    fn test_pipeline_rejects_invalid_render_config() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.render.threads = 0;
        assert!(ShortsPipeline::new(config).is_err());
    }

    #[test]
    fn test_cancel_token_survives_progress_attachment() {
        let dir = TempDir::new().unwrap();
        let pipeline = ShortsPipeline::new(test_config(&dir)).unwrap();

        let token = pipeline.cancel_token();
        let (tx, _rx) = mpsc::channel(4);
        let pipeline = pipeline.with_progress(tx);

        token.cancel();
        assert!(pipeline.cancel_token().is_cancelled());
    }

    #[test]
    fn test_video_output_path_uses_slug() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let pipeline = ShortsPipeline::new(config).unwrap();
        let path = pipeline.video_output_path("Mental Toughness 101");
        assert!(path.ends_with("mental-toughness-101.mp4"));
    }
}

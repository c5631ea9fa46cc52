//! shortgen - automated short-form video generation
//!
//! Chains a text-generation API, a text-to-speech API, and an ffmpeg-based
//! compositor to turn a topic string into a vertical video with burned-in,
//! word-synchronized captions.

pub mod config;
pub mod openai;
pub mod pipeline;
pub mod render;
pub mod state;
pub mod timeline;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::openai::{ChatClient, Narration, SttClient, TtsClient};
pub use crate::pipeline::{PipelineResult, PipelineStage, ShortsPipeline};
pub use crate::render::{CancelToken, Compositor, RenderError, RenderJob, RenderProgress};
pub use crate::state::{ScriptEntry, ScriptLog, TitleQueue};
pub use crate::timeline::{
    build_timeline, AudioTrack, BackgroundElement, CaptionElement, CaptionStyle, Rgb, WordTiming,
};

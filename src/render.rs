use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::timeline::{AudioTrack, BackgroundElement, CaptionElement};

/// Errors surfaced by the compositor. Validation failures are reported
/// before any encoding work starts; encoding failures never leave a
/// partial file at the destination path.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("invalid render configuration: {0}")]
    Configuration(String),

    #[error("audio resource unavailable: {0}")]
    Resource(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("render cancelled")]
    Cancelled,

    #[error("io error during render: {0}")]
    Io(#[from] std::io::Error),
}

/// Cooperative cancellation flag, checked between encoder progress ticks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Linear progress signal for one render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderProgress {
    /// Seconds of output encoded so far.
    pub seconds_done: f64,
    /// Fraction of the total output duration, in `[0, 1]`.
    pub fraction: f64,
}

/// Export parameters for a single encode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub output_path: PathBuf,
    pub codec: String,
    pub frame_rate: u32,
    pub thread_count: usize,
    /// Encoder binary location, threaded in explicitly rather than read
    /// from process-global state.
    pub ffmpeg_binary: PathBuf,
}

impl RenderJob {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            codec: "libx264".to_string(),
            frame_rate: 24,
            thread_count: num_cpus::get(),
            ffmpeg_binary: PathBuf::from("ffmpeg"),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_ffmpeg_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.ffmpeg_binary = binary.into();
        self
    }

    fn validate(&self, background: &BackgroundElement) -> Result<(), RenderError> {
        if self.frame_rate == 0 {
            return Err(RenderError::Configuration(
                "frame rate must be greater than 0".to_string(),
            ));
        }
        if self.thread_count == 0 {
            return Err(RenderError::Configuration(
                "thread count must be at least 1".to_string(),
            ));
        }
        if self.codec.trim().is_empty() {
            return Err(RenderError::Configuration("codec must not be empty".to_string()));
        }
        if background.width == 0 || background.height == 0 {
            return Err(RenderError::Configuration(
                "background size must be non-zero".to_string(),
            ));
        }
        if background.width % 2 != 0 || background.height % 2 != 0 {
            // yuv420p output requires even dimensions.
            return Err(RenderError::Configuration(
                "background width and height must be even".to_string(),
            ));
        }
        if !background.duration.is_finite() || background.duration <= 0.0 {
            return Err(RenderError::Configuration(
                "background duration must be a positive number of seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merges a background, caption overlays, and one audio track into a single
/// encoded video file.
///
/// The output's playable duration always equals `background.duration`:
/// longer audio is cut at that point, shorter audio is padded with silence.
/// Output is written to a temp file in the destination directory and renamed
/// into place only on success, so a failed or cancelled render leaves the
/// filesystem untouched.
#[derive(Default)]
pub struct Compositor {
    cancel: CancelToken,
    progress: Option<mpsc::Sender<RenderProgress>>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a channel that receives linear progress updates during encoding.
    pub fn with_progress(mut self, progress: mpsc::Sender<RenderProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Token that aborts an in-flight render when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn render_video(
        &self,
        background: &BackgroundElement,
        captions: &[CaptionElement],
        audio: &AudioTrack,
        job: &RenderJob,
    ) -> Result<(), RenderError> {
        job.validate(background)?;

        match tokio::fs::metadata(&audio.path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(RenderError::Resource(format!(
                    "audio path is not a file: {}",
                    audio.path.display()
                )))
            }
            Err(e) => {
                return Err(RenderError::Resource(format!(
                    "cannot open audio file {}: {}",
                    audio.path.display(),
                    e
                )))
            }
        }

        let out_dir = match job.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&out_dir).await?;

        // Encode next to the final path so the publish rename stays on one
        // filesystem. The guard removes the temp file on every failure path.
        let suffix = match job.output_path.extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => ".mp4".to_string(),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".shortgen-")
            .suffix(&suffix)
            .tempfile_in(&out_dir)?;

        let args = build_ffmpeg_args(background, captions, audio, job, tmp.path());

        info!(
            "🎬 Rendering {}x{} video, {:.2}s, {} captions, {} threads",
            background.width,
            background.height,
            background.duration,
            captions.len(),
            job.thread_count
        );
        debug!("ffmpeg args: {}", args.join(" "));

        let mut child = tokio::process::Command::new(&job.ffmpeg_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RenderError::Encoding(format!(
                    "failed to start encoder '{}': {}",
                    job.ffmpeg_binary.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::Encoding("encoder stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::Encoding("encoder stderr unavailable".to_string()))?;

        // Drain stderr concurrently with the progress reader. A chatty
        // encoder can fill the stderr pipe mid-encode and block; nothing
        // may wait on stdout while stderr is full.
        let stderr_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut stderr = stderr;
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            if self.cancel.is_cancelled() {
                warn!("render cancelled, stopping encoder");
                let _ = child.start_kill();
                let _ = child.wait().await;
                stderr_task.abort();
                return Err(RenderError::Cancelled);
            }
            if let Some(value) = line.strip_prefix("out_time_ms=") {
                if let Ok(micros) = value.trim().parse::<i64>() {
                    let seconds_done = (micros as f64 / 1_000_000.0).max(0.0);
                    let fraction = (seconds_done / background.duration).clamp(0.0, 1.0);
                    if let Some(tx) = &self.progress {
                        let _ = tx.try_send(RenderProgress {
                            seconds_done,
                            fraction,
                        });
                    }
                    debug!("encode progress: {:.1}%", fraction * 100.0);
                }
            }
        }

        let status = child.wait().await?;
        let stderr_buf = stderr_task.await.unwrap_or_default();
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_buf);
            return Err(RenderError::Encoding(format!(
                "encoder exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        tmp.persist(&job.output_path)
            .map_err(|e| RenderError::Io(e.error))?;

        info!("✅ Video written to {}", job.output_path.display());
        Ok(())
    }
}

/// Assemble the full encoder invocation. The layered timeline is realized as
/// a solid color source with one chained drawtext filter per caption, each
/// gated to its visibility window. Filter order follows caption input order.
fn build_ffmpeg_args(
    background: &BackgroundElement,
    captions: &[CaptionElement],
    audio: &AudioTrack,
    job: &RenderJob,
    out_path: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-y".into(),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        format!(
            "color=c={}:s={}x{}:r={}:d={:.3}",
            background.color.to_ffmpeg(),
            background.width,
            background.height,
            job.frame_rate,
            background.duration
        ),
        "-i".into(),
        audio.path.to_string_lossy().into_owned(),
    ];

    if captions.is_empty() {
        args.extend(["-map".into(), "0:v".into()]);
    } else {
        args.extend([
            "-filter_complex".into(),
            caption_filter(captions),
            "-map".into(),
            "[v]".into(),
        ]);
    }
    args.extend(["-map".into(), "1:a".into()]);

    // Output duration is authoritative: apad fills short audio with
    // silence, -t cuts everything at the background duration.
    args.extend([
        "-af".into(),
        "apad".into(),
        "-t".into(),
        format!("{:.3}", background.duration),
        "-r".into(),
        job.frame_rate.to_string(),
        "-c:v".into(),
        job.codec.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "aac".into(),
        "-threads".into(),
        job.thread_count.to_string(),
    ]);

    if matches!(
        out_path.extension().and_then(|e| e.to_str()),
        Some("mp4") | Some("mov") | Some("m4v")
    ) {
        args.extend(["-movflags".into(), "+faststart".into()]);
    }

    args.push(out_path.to_string_lossy().into_owned());
    args
}

/// One drawtext per caption, comma-chained in input order so later captions
/// draw on top of earlier ones.
fn caption_filter(captions: &[CaptionElement]) -> String {
    let mut filter = String::from("[0:v]");
    for (i, caption) in captions.iter().enumerate() {
        if i > 0 {
            filter.push(',');
        }
        filter.push_str(&caption_drawtext(caption));
    }
    filter.push_str("[v]");
    filter
}

fn caption_drawtext(caption: &CaptionElement) -> String {
    let font = match &caption.style.font_file {
        Some(file) => format!("fontfile={}", escape_drawtext(&file.to_string_lossy())),
        None => format!("font={}", escape_drawtext(&caption.style.font)),
    };
    format!(
        "drawtext=text={}:{}:fontsize={}:fontcolor={}:x=(w-text_w)/2:y={}:enable='between(t\\,{:.3}\\,{:.3})'",
        escape_drawtext(&caption.text),
        font,
        caption.style.size,
        caption.style.color,
        caption.style.y,
        caption.visible_from,
        caption.visible_until,
    )
}

/// Escape text for a drawtext option inside a filtergraph. The value passes
/// through two parsers (the filtergraph splitter, then the option parser),
/// so quotes and option separators need double escaping.
fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\\\\"),
            '\'' => out.push_str(r"\\\'"),
            ':' => out.push_str(r"\\:"),
            '%' => out.push_str(r"\\%"),
            ',' => out.push_str(r"\,"),
            ';' => out.push_str(r"\;"),
            '[' => out.push_str(r"\["),
            ']' => out.push_str(r"\]"),
            '=' => out.push_str(r"\="),
            _ => out.push(c),
        }
    }
    out
}

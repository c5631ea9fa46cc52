use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One transcribed word with its timing window, in seconds from the start
/// of the narration. Produced by the speech-to-text collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// RGB color, serialized as `{ r, g, b }` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Hex form understood by ffmpeg color arguments.
    pub fn to_ffmpeg(self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Visual style shared by every caption in one render job.
/// Per-word styling is intentionally not supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    /// Font family name, resolved through fontconfig by the encoder.
    pub font: String,
    /// Explicit font file. Takes precedence over `font` when set.
    pub font_file: Option<PathBuf>,
    pub size: u32,
    /// ffmpeg color expression, e.g. "black" or "0x202020".
    pub color: String,
    /// Vertical placement of the caption row; horizontally centered.
    pub y: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_file: None,
            size: 48,
            color: "black".to_string(),
            y: 1600,
        }
    }
}

/// A single word overlay, visible only within its `[visible_from, visible_until)`
/// window. Derived 1:1 from a `WordTiming` and consumed by the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionElement {
    pub text: String,
    pub visible_from: f64,
    pub visible_until: f64,
    pub style: CaptionStyle,
}

/// Full-frame, full-duration solid fill behind all captions.
///
/// `duration` is the total narration duration supplied by the caller. It is
/// authoritative for the rendered video's length; it is never derived from
/// the caption list and never reconciled against audio file metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundElement {
    pub width: u32,
    pub height: u32,
    pub color: Rgb,
    pub duration: f64,
}

/// Reference to the narration audio attached to the composed timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
}

impl AudioTrack {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Convert word timings into caption elements, one per word, in input order.
///
/// Input order is the compositor's z-order, so it is preserved exactly.
/// Overlapping windows are kept as independent layers; a window with
/// `end < start` is clamped to zero duration rather than rejected.
pub fn build_timeline(words: &[WordTiming], style: &CaptionStyle) -> Vec<CaptionElement> {
    words
        .iter()
        .map(|w| CaptionElement {
            text: w.word.clone(),
            visible_from: w.start,
            visible_until: w.end.max(w.start),
            style: style.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(word: &str, start: f64, end: f64) -> WordTiming {
        WordTiming {
            word: word.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_empty_input_produces_empty_timeline() {
        let captions = build_timeline(&[], &CaptionStyle::default());
        assert!(captions.is_empty());
    }

    #[test]
    fn test_one_element_per_word_preserving_order_and_windows() {
        let words = vec![
            word("Today", 0.0, 0.36),
            word("is", 0.36, 0.58),
            word("a", 0.58, 0.78),
            word("wonderful", 0.78, 1.16),
        ];
        let captions = build_timeline(&words, &CaptionStyle::default());

        assert_eq!(captions.len(), words.len());
        for (caption, timing) in captions.iter().zip(&words) {
            assert_eq!(caption.text, timing.word);
            assert_eq!(caption.visible_from, timing.start);
            assert_eq!(caption.visible_until, timing.end);
        }
    }

    #[test]
    fn test_overlapping_words_are_kept_as_independent_layers() {
        let words = vec![word("A", 0.0, 1.0), word("B", 0.5, 1.5)];
        let captions = build_timeline(&words, &CaptionStyle::default());

        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].visible_until, 1.0);
        assert_eq!(captions[1].visible_from, 0.5);
    }

    #[test]
    fn test_degenerate_window_is_clamped_to_zero_duration() {
        let captions = build_timeline(&[word("oops", 2.0, 1.5)], &CaptionStyle::default());
        assert_eq!(captions[0].visible_from, 2.0);
        assert_eq!(captions[0].visible_until, 2.0);
    }

    #[test]
    fn test_equal_start_and_end_passes_through() {
        let captions = build_timeline(&[word("blink", 1.0, 1.0)], &CaptionStyle::default());
        assert_eq!(captions[0].visible_from, captions[0].visible_until);
    }

    #[test]
    fn test_uniform_style_applied_to_all_captions() {
        let style = CaptionStyle {
            size: 64,
            color: "white".to_string(),
            ..CaptionStyle::default()
        };
        let captions = build_timeline(&[word("x", 0.0, 0.5), word("y", 0.5, 1.0)], &style);
        assert!(captions.iter().all(|c| c.style == style));
    }

    #[test]
    fn test_rgb_to_ffmpeg_hex() {
        assert_eq!(Rgb::WHITE.to_ffmpeg(), "0xFFFFFF");
        assert_eq!(Rgb { r: 16, g: 32, b: 255 }.to_ffmpeg(), "0x1020FF");
    }
}

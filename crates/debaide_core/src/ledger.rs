//! crates/debaide_core/src/ledger.rs
//!
//! Building blocks for the append-only segment ledgers shared by practice
//! sessions and battles: kind validation and the duration policy.

use crate::domain::{SegmentDraft, SegmentKind};
use crate::error::{ArenaError, ArenaResult};
use crate::ports::Transcription;

/// Speaking rate used to estimate how long a text segment would take to deliver.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Parses a client-supplied segment kind.
pub fn parse_kind(raw: &str) -> ArenaResult<SegmentKind> {
    raw.trim().parse()
}

/// `word_count / 150 * 60` seconds.
pub fn estimate_duration(transcript: &str) -> f64 {
    let words = transcript.split_whitespace().count() as f64;
    words / WORDS_PER_MINUTE * 60.0
}

/// Prefers a measured duration and falls back to the word-count estimate when
/// the measurement is missing or zero.
pub fn resolve_duration(measured: Option<f64>, transcript: &str) -> f64 {
    match measured {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
        _ => estimate_duration(transcript),
    }
}

impl SegmentDraft {
    /// A text-only submission. Duration is always the estimate.
    pub fn from_text(kind: SegmentKind, text: &str) -> ArenaResult<Self> {
        if text.trim().is_empty() {
            return Err(ArenaError::InvalidInput("Text cannot be empty".to_string()));
        }
        Ok(Self {
            kind,
            transcript: text.to_string(),
            audio_url: None,
            duration: estimate_duration(text),
        })
    }

    /// An audio submission. The transcription is accepted as-is, placeholders included.
    pub fn from_transcription(kind: SegmentKind, audio_url: String, transcription: Transcription) -> Self {
        let duration = resolve_duration(Some(transcription.duration_seconds), &transcription.text);
        Self {
            kind,
            transcript: transcription.text,
            audio_url: Some(audio_url),
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_hundred_words_take_two_minutes() {
        let text = vec!["word"; 300].join(" ");
        assert_eq!(estimate_duration(&text), 120.0);
    }

    #[test]
    fn zero_measurement_falls_back_to_estimate() {
        let text = vec!["argument"; 75].join(" ");
        assert_eq!(resolve_duration(Some(0.0), &text), 30.0);
        assert_eq!(resolve_duration(None, &text), 30.0);
        assert_eq!(resolve_duration(Some(42.5), &text), 42.5);
    }

    #[test]
    fn text_drafts_reject_blank_input() {
        assert!(matches!(
            SegmentDraft::from_text(SegmentKind::Opening, "   \n"),
            Err(ArenaError::InvalidInput(_))
        ));
        let draft = SegmentDraft::from_text(SegmentKind::Closing, "In conclusion we win").unwrap();
        assert_eq!(draft.audio_url, None);
        assert_eq!(draft.duration, 4.0 / 150.0 * 60.0);
    }

    #[test]
    fn transcription_drafts_keep_placeholders() {
        let draft = SegmentDraft::from_transcription(
            SegmentKind::Rebuttal,
            "/storage/audio/s1/rebuttal_x.webm".to_string(),
            Transcription::placeholder(),
        );
        assert_eq!(draft.duration, 5.0);
        assert!(draft.transcript.starts_with("[Transcription failed"));
    }

    #[test]
    fn kind_parsing_is_strict() {
        assert_eq!(parse_kind(" opening ").unwrap(), SegmentKind::Opening);
        assert!(matches!(parse_kind("Opening"), Err(ArenaError::InvalidKind(_))));
    }
}

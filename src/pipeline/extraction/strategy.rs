//! Extraction path selection.
//!
//! Two paths exist: a cheap text completion over extracted document text, and
//! a costlier vision completion over a rendered page image. A 0–100 quality
//! signal decides between them — but no reliable signal is computable for
//! scanned PDFs (the primary input format), so in practice the decision is
//! the vision-fallback flag. The scoring formula for real text quality is
//! deliberately not guessed here; `select_path` just makes the threshold
//! logic unit-testable once a scorer exists.

use serde::Serialize;
use std::fmt;

/// Default quality gate: signals below this escalate to vision.
pub const DEFAULT_QUALITY_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    Text,
    Vision,
}

impl fmt::Display for ExtractionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Vision => write!(f, "vision"),
        }
    }
}

/// Select the extraction path for a document.
///
/// Pure function — no I/O, no side effects.
///
/// - `quality: None` (no computable signal): vision iff the fallback is
///   enabled, else text.
/// - `quality: Some(q)`: strict less-than — `q < threshold` escalates to
///   vision (when enabled); at or above threshold the text result stands.
pub fn select_path(quality: Option<u8>, threshold: u8, vision_enabled: bool) -> ExtractionPath {
    if !vision_enabled {
        return ExtractionPath::Text;
    }
    match quality {
        None => ExtractionPath::Vision,
        Some(q) if q < threshold => ExtractionPath::Vision,
        Some(_) => ExtractionPath::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_signal_selects_vision_when_enabled() {
        assert_eq!(
            select_path(None, DEFAULT_QUALITY_THRESHOLD, true),
            ExtractionPath::Vision
        );
    }

    #[test]
    fn no_signal_falls_back_to_text_when_disabled() {
        assert_eq!(
            select_path(None, DEFAULT_QUALITY_THRESHOLD, false),
            ExtractionPath::Text
        );
    }

    #[test]
    fn below_threshold_escalates() {
        assert_eq!(select_path(Some(79), 80, true), ExtractionPath::Vision);
        assert_eq!(select_path(Some(0), 80, true), ExtractionPath::Vision);
    }

    #[test]
    fn at_threshold_accepts_text() {
        // Strict less-than: a score equal to the threshold stays on text
        assert_eq!(select_path(Some(80), 80, true), ExtractionPath::Text);
        assert_eq!(select_path(Some(100), 80, true), ExtractionPath::Text);
    }

    #[test]
    fn disabled_fallback_never_selects_vision() {
        for q in [None, Some(0), Some(50), Some(100)] {
            assert_eq!(select_path(q, 80, false), ExtractionPath::Text);
        }
    }

    #[test]
    fn path_display() {
        assert_eq!(format!("{}", ExtractionPath::Text), "text");
        assert_eq!(format!("{}", ExtractionPath::Vision), "vision");
    }
}

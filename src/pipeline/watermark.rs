//! Watermark detection for text blocks.
//!
//! Two independent signals, either one is enough:
//!
//! * **Text**: the block's first span contains a stamp marker (an ISO date,
//!   a revision or document-code literal, the "issue date" phrase).
//! * **Rotation**: the block was drawn with a rotated text matrix. Body text
//!   is never rotated in the documents this targets; diagonal stamps are.

use crate::config::DEFAULT_WATERMARK_PATTERN;
use crate::error::Pdf2MdError;
use crate::model::TextBlock;
use regex::{Regex, RegexBuilder};

/// Angles within this many radians of zero count as horizontal.
const ANGLE_TOLERANCE: f64 = 1e-6;

/// Why a block was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkReason {
    Pattern,
    Rotated,
}

/// Decides whether a text block is a watermark.
#[derive(Debug, Clone)]
pub struct WatermarkDetector {
    pattern: Regex,
}

impl Default for WatermarkDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WATERMARK_PATTERN).expect("default watermark pattern compiles")
    }
}

impl WatermarkDetector {
    /// Compile `pattern` case-insensitively.
    pub fn new(pattern: &str) -> Result<Self, Pdf2MdError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Pdf2MdError::InvalidConfig(format!("watermark pattern: {e}")))?;
        Ok(Self { pattern })
    }

    pub fn is_watermark(&self, block: &TextBlock) -> bool {
        self.reason(block).is_some()
    }

    /// The first signal that fires, text before rotation.
    pub fn reason(&self, block: &TextBlock) -> Option<WatermarkReason> {
        if let Some(span) = block.first_line_span() {
            if self.pattern.is_match(&span.text) {
                return Some(WatermarkReason::Pattern);
            }
        }

        if let Some(t) = block.transform {
            let angle = f64::from(t[1]).atan2(f64::from(t[0]));
            if angle.abs() > ANGLE_TOLERANCE {
                return Some(WatermarkReason::Rotated);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Span, TextLine};

    fn block(text: &str) -> TextBlock {
        TextBlock::new(
            0,
            BBox::new(100.0, 300.0, 300.0, 312.0),
            vec![TextLine::new(vec![Span::new(text, "Helvetica", 10.0)])],
        )
    }

    #[test]
    fn iso_date_is_a_watermark() {
        let d = WatermarkDetector::default();
        assert_eq!(
            d.reason(&block("2023-11-05 revision")),
            Some(WatermarkReason::Pattern)
        );
    }

    #[test]
    fn literal_markers_match_case_insensitively() {
        let d = WatermarkDetector::default();
        assert!(d.is_watermark(&block("Mã tài liệu td003")));
        assert!(d.is_watermark(&block("lần ban hành: 02")));
        assert!(d.is_watermark(&block("copy_al race internal")));
    }

    #[test]
    fn rotated_block_is_a_watermark_regardless_of_text() {
        let d = WatermarkDetector::default();
        let angle = std::f32::consts::FRAC_PI_4;
        let rotated = block("Ordinary words")
            .with_transform([angle.cos(), angle.sin(), -angle.sin(), angle.cos(), 0.0, 0.0]);
        assert_eq!(d.reason(&rotated), Some(WatermarkReason::Rotated));
    }

    #[test]
    fn horizontal_plain_text_is_kept() {
        let d = WatermarkDetector::default();
        assert!(!d.is_watermark(&block("Ordinary horizontal text")));
        let identity = block("Ordinary horizontal text").with_transform([1.0, 0.0, 0.0, 1.0, 72.0, 700.0]);
        assert!(!d.is_watermark(&identity));
    }

    #[test]
    fn only_the_first_span_is_inspected() {
        let d = WatermarkDetector::default();
        let b = TextBlock::new(
            0,
            BBox::default(),
            vec![TextLine::new(vec![
                Span::new("Issued on ", "Helvetica", 10.0),
                Span::new("2024-01-01", "Helvetica", 10.0),
            ])],
        );
        assert!(!d.is_watermark(&b));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        assert!(matches!(
            WatermarkDetector::new("[").unwrap_err(),
            Pdf2MdError::InvalidConfig(_)
        ));
    }
}

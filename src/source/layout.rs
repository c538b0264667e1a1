//! Block reconstruction from positioned text runs.
//!
//! pdfium reports text as a flat list of page objects, each one run of text
//! in one font. The classifier works on blocks (paragraph-sized groups of
//! lines), so the pdfium source rebuilds them here:
//!
//! 1. Runs drawn with a rotated matrix become single-run blocks carrying
//!    their transform; the watermark detector rejects them downstream.
//! 2. The remaining runs are swept top to bottom and joined into lines when
//!    they overlap vertically. A horizontal gap wider than a few em splits
//!    the line, which keeps side-by-side columns apart.
//! 3. Lines are stacked into blocks when they overlap horizontally, sit close
//!    vertically and share a font size.
//!
//! Runs found inside form XObjects reach this module already mapped to page
//! space with [`concat`] and [`map_bbox`].

use crate::model::{BBox, Span, TextBlock, TextLine, Transform};
use tracing::trace;

/// Runs overlapping by at least this fraction of the shorter run's height
/// belong to the same line.
const LINE_OVERLAP_MIN: f32 = 0.5;

/// A gap wider than this many font sizes between two runs on one line
/// starts a new line segment.
const COLUMN_GAP_EMS: f32 = 2.5;

/// A gap wider than this fraction of the font size between two runs is a
/// word break.
const WORD_GAP_EMS: f32 = 0.15;

/// Maximum vertical gap between consecutive lines of one block, in line
/// heights.
const BLOCK_GAP_LINES: f32 = 0.8;

/// Maximum font-size difference (points) between lines of one block.
const BLOCK_SIZE_TOLERANCE: f32 = 1.0;

/// Angles below this are treated as horizontal text.
const ROTATION_EPSILON: f32 = 1e-6;

/// One run of text with its position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedSpan {
    pub span: Span,
    pub bbox: BBox,
}

impl PositionedSpan {
    pub fn new(span: Span, bbox: BBox) -> Self {
        Self { span, bbox }
    }

    fn is_rotated(&self) -> bool {
        self.span
            .origin
            .map(|t| t[1].atan2(t[0]).abs() > ROTATION_EPSILON)
            .unwrap_or(false)
    }
}

#[derive(Debug)]
struct Line {
    spans: Vec<PositionedSpan>,
    bbox: BBox,
}

impl Line {
    fn start(span: PositionedSpan) -> Self {
        Self {
            bbox: span.bbox,
            spans: vec![span],
        }
    }

    fn push(&mut self, span: PositionedSpan) {
        self.bbox = self.bbox.union(&span.bbox);
        self.spans.push(span);
    }

    fn size(&self) -> f32 {
        self.spans.first().map(|s| s.span.size).unwrap_or(0.0)
    }

    fn accepts(&self, span: &PositionedSpan) -> bool {
        let overlap = self.bbox.vertical_overlap(&span.bbox);
        let shorter = self.bbox.height().min(span.bbox.height()).max(0.01);
        overlap / shorter >= LINE_OVERLAP_MIN
    }

    /// Sort runs left to right and split wherever the gap is column-sized.
    fn into_segments(mut self) -> Vec<Line> {
        self.spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let mut segments: Vec<Line> = Vec::new();
        for span in self.spans {
            match segments.last_mut() {
                Some(seg)
                    if span.bbox.x0 - seg.bbox.x1
                        <= COLUMN_GAP_EMS * span.span.size.max(seg.size()) =>
                {
                    seg.push(span)
                }
                _ => segments.push(Line::start(span)),
            }
        }
        segments
    }

    /// Spans of the line, with space spans inserted at word-sized gaps.
    fn into_spans(self) -> Vec<Span> {
        let mut out: Vec<Span> = Vec::with_capacity(self.spans.len());
        let mut prev_x1: Option<f32> = None;
        for ps in self.spans {
            if let (Some(x1), Some(last)) = (prev_x1, out.last()) {
                let gap = ps.bbox.x0 - x1;
                if gap > WORD_GAP_EMS * ps.span.size
                    && !ends_with_space(&last.text)
                    && !ps.span.text.starts_with(char::is_whitespace)
                {
                    out.push(Span::space());
                }
            }
            prev_x1 = Some(ps.bbox.x1);
            out.push(ps.span);
        }
        out
    }
}

#[derive(Debug)]
struct Block {
    lines: Vec<Line>,
    bbox: BBox,
}

impl Block {
    fn accepts(&self, line: &Line) -> bool {
        let Some(last) = self.lines.last() else {
            return false;
        };
        let gap = line.bbox.y0 - last.bbox.y1;
        let height = last.bbox.height().max(line.bbox.height()).max(0.01);
        last.bbox.horizontal_overlap(&line.bbox) > 0.0
            && gap <= BLOCK_GAP_LINES * height
            && gap >= -LINE_OVERLAP_MIN * height
            && (last.size() - line.size()).abs() <= BLOCK_SIZE_TOLERANCE
    }

    fn into_text_block(self, page: usize) -> TextBlock {
        let count = self.lines.len();
        let lines = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let mut spans = line.into_spans();
                // Lines of one block are read as continuous text.
                if i + 1 < count && spans.last().is_some_and(|s| !ends_with_space(&s.text)) {
                    spans.push(Span::space());
                }
                TextLine::new(spans)
            })
            .collect();
        TextBlock::new(page, self.bbox, lines)
    }
}

fn ends_with_space(text: &str) -> bool {
    text.ends_with(char::is_whitespace)
}

/// Matrix product `inner × outer`: the transform that applies `inner`
/// first, then `outer`. A form XObject's content is drawn with
/// `concat(child, form)`.
pub fn concat(inner: &Transform, outer: &Transform) -> Transform {
    let [a1, b1, c1, d1, e1, f1] = *inner;
    let [a2, b2, c2, d2, e2, f2] = *outer;
    [
        a1 * a2 + b1 * c2,
        a1 * b2 + b1 * d2,
        c1 * a2 + d1 * c2,
        c1 * b2 + d1 * d2,
        e1 * a2 + f1 * c2 + e2,
        e1 * b2 + f1 * d2 + f2,
    ]
}

/// Axis-aligned box enclosing `bbox` after mapping its corners through `m`.
pub fn map_bbox(bbox: &BBox, m: &Transform) -> BBox {
    let [a, b, c, d, e, f] = *m;
    let corners = [
        (bbox.x0, bbox.y0),
        (bbox.x1, bbox.y0),
        (bbox.x0, bbox.y1),
        (bbox.x1, bbox.y1),
    ]
    .map(|(x, y)| (a * x + c * y + e, b * x + d * y + f));

    corners.iter().skip(1).fold(
        BBox::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1),
        |acc, &(x, y)| BBox::new(acc.x0.min(x), acc.y0.min(y), acc.x1.max(x), acc.y1.max(y)),
    )
}

/// Group the positioned runs of one page into text blocks.
///
/// Empty runs are discarded. Output blocks are in top-to-bottom order of
/// their first line; rotated runs follow as standalone blocks.
pub fn group_into_blocks(page: usize, spans: Vec<PositionedSpan>) -> Vec<TextBlock> {
    let (rotated, mut upright): (Vec<_>, Vec<_>) = spans
        .into_iter()
        .filter(|s| !s.span.text.is_empty())
        .partition(PositionedSpan::is_rotated);

    upright.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    // ── Lines ──
    let mut rows: Vec<Line> = Vec::new();
    for span in upright {
        match rows.last_mut() {
            Some(row) if row.accepts(&span) => row.push(span),
            _ => rows.push(Line::start(span)),
        }
    }
    let mut lines: Vec<Line> = rows.into_iter().flat_map(Line::into_segments).collect();
    lines.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));

    // ── Blocks ──
    let mut blocks: Vec<Block> = Vec::new();
    for line in lines {
        match blocks.iter_mut().rev().find(|b| b.accepts(&line)) {
            Some(block) => {
                block.bbox = block.bbox.union(&line.bbox);
                block.lines.push(line);
            }
            None => blocks.push(Block {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    let mut out: Vec<TextBlock> = blocks.into_iter().map(|b| b.into_text_block(page)).collect();

    for ps in rotated {
        let transform = ps.span.origin;
        let mut block = TextBlock::new(page, ps.bbox, vec![TextLine::new(vec![ps.span])]);
        block.transform = transform;
        out.push(block);
    }

    trace!("Page {}: grouped into {} blocks", page + 1, out.len());
    out
}

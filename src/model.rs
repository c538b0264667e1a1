//! Layout and document model shared by every pipeline stage.
//!
//! ```text
//! TextBlock ─┬─ TextLine ─┬─ Span
//!            │            └─ Span
//!            └─ TextLine ── Span          ImageElement ── ImageRef
//!
//!                   ▼ classify / sort / merge ▼
//!
//!             StructuredDocument = [ClassifiedElement]
//! ```
//!
//! Coordinates are page points with the origin at the top-left corner and
//! `y` growing downward, so `y0` is the top edge of a box.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ── Geometry ─────────────────────────────────────────────────────────────

/// Axis-aligned bounding box in page coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Length of the overlap of the two boxes projected on the x axis.
    pub fn horizontal_overlap(&self, other: &BBox) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Length of the overlap of the two boxes projected on the y axis.
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }
}

/// 2-D affine transform `[a, b, c, d, e, f]` as stored in PDF content streams.
pub type Transform = [f32; 6];

// ── Spans, lines, blocks ─────────────────────────────────────────────────

/// Style bits attached to a [`Span`].
///
/// Bit values follow the common PDF text-extraction convention
/// (superscript = 1, italic = 2, serif = 4, monospace = 8, bold = 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleFlags(u32);

impl StyleFlags {
    pub const SUPERSCRIPT: StyleFlags = StyleFlags(1);
    pub const ITALIC: StyleFlags = StyleFlags(1 << 1);
    pub const SERIF: StyleFlags = StyleFlags(1 << 2);
    pub const MONOSPACE: StyleFlags = StyleFlags(1 << 3);
    pub const BOLD: StyleFlags = StyleFlags(1 << 4);

    pub const fn empty() -> Self {
        StyleFlags(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: StyleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StyleFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for StyleFlags {
    type Output = StyleFlags;

    fn bitor(self, rhs: StyleFlags) -> StyleFlags {
        StyleFlags(self.0 | rhs.0)
    }
}

/// Inline run of text sharing one font, size and style.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub font: String,
    pub size: f32,
    #[serde(default)]
    pub flags: StyleFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Transform>,
}

impl Span {
    pub fn new(text: impl Into<String>, font: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            font: font.into(),
            size,
            flags: StyleFlags::empty(),
            origin: None,
        }
    }

    /// Whitespace-only pseudo-span used to keep words apart when runs are
    /// concatenated.
    pub fn space() -> Self {
        Self {
            text: " ".to_string(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_origin(mut self, origin: Transform) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Bold is decided by the font name, the only signal consistently
    /// present across producers.
    pub fn is_bold(&self) -> bool {
        self.font.to_lowercase().contains("bold")
    }

    pub fn is_italic(&self) -> bool {
        self.font.to_lowercase().contains("italic")
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One line of a text block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextLine {
    pub spans: Vec<Span>,
}

impl TextLine {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }
}

/// Geometric grouping of lines produced by the source layout analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: BBox,
    /// 0-indexed page number.
    pub page: usize,
    /// Present when the block was drawn with a non-identity text matrix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl TextBlock {
    pub fn new(page: usize, bbox: BBox, lines: Vec<TextLine>) -> Self {
        Self {
            lines,
            bbox,
            page,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// The first span of the first line, if the first line has any span.
    pub fn first_line_span(&self) -> Option<&Span> {
        self.lines.first().and_then(|l| l.spans.first())
    }

    /// All spans of the block in line order.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }

    pub fn into_spans(self) -> Vec<Span> {
        self.lines.into_iter().flat_map(|l| l.spans).collect()
    }
}

// ── Images ───────────────────────────────────────────────────────────────

/// Opaque handle used to fetch an image's pixels back from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// 0-indexed page number.
    pub page: usize,
    /// Source-defined position of the image among the page's objects.
    pub object: usize,
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}#{}", self.page + 1, self.object)
    }
}

/// An image placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub bbox: BBox,
    pub page: usize,
    pub reference: ImageRef,
    /// Pixel dimensions of the embedded image; 0 when the source could not
    /// read them without decoding.
    pub width: u32,
    pub height: u32,
    /// The image carries a soft mask (transparency). Carried, never filtered on.
    #[serde(default)]
    pub smask: bool,
}

// ── Classification ───────────────────────────────────────────────────────

/// Semantic role assigned to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    H1,
    H2,
    /// Level-2 heading rendered without numbering removal. Reserved: the
    /// classifier never emits it.
    H2NoNum,
    H3,
    /// List item.
    Li,
    /// Paragraph.
    P,
    Caption,
    Image,
}

impl Tag {
    pub fn is_heading(self) -> bool {
        matches!(self, Tag::H1 | Tag::H2 | Tag::H2NoNum | Tag::H3)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tag::H1 => "H1",
            Tag::H2 => "H2",
            Tag::H2NoNum => "H2_NO_NUM",
            Tag::H3 => "H3",
            Tag::Li => "LI",
            Tag::P => "P",
            Tag::Caption => "CAPTION",
            Tag::Image => "image",
        };
        f.write_str(s)
    }
}

/// Payload of a classified element: text spans or an image, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Text { tag: Tag, spans: Vec<Span> },
    Image { image: ImageElement },
}

/// The unit flowing from classification to rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedElement {
    pub content: Content,
    pub bbox: BBox,
    pub page: usize,
}

impl ClassifiedElement {
    /// Returns `None` when `spans` is empty so every text element has content.
    pub fn text(tag: Tag, spans: Vec<Span>, bbox: BBox, page: usize) -> Option<Self> {
        if spans.is_empty() {
            return None;
        }
        Some(Self {
            content: Content::Text { tag, spans },
            bbox,
            page,
        })
    }

    pub fn image(image: ImageElement) -> Self {
        Self {
            bbox: image.bbox,
            page: image.page,
            content: Content::Image { image },
        }
    }

    pub fn tag(&self) -> Tag {
        match &self.content {
            Content::Text { tag, .. } => *tag,
            Content::Image { .. } => Tag::Image,
        }
    }

    pub fn spans(&self) -> &[Span] {
        match &self.content {
            Content::Text { spans, .. } => spans,
            Content::Image { .. } => &[],
        }
    }

    /// Reading-order comparison: page, then top edge, then left edge.
    pub fn reading_order(&self, other: &Self) -> Ordering {
        self.page
            .cmp(&other.page)
            .then_with(|| self.bbox.y0.total_cmp(&other.bbox.y0))
            .then_with(|| self.bbox.x0.total_cmp(&other.bbox.x0))
    }
}

/// Final ordered, merged element list consumed by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub elements: Vec<ClassifiedElement>,
}

impl StructuredDocument {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassifiedElement> {
        self.elements.iter()
    }

    /// Number of elements carrying `tag`.
    pub fn count(&self, tag: Tag) -> usize {
        self.elements.iter().filter(|e| e.tag() == tag).count()
    }
}

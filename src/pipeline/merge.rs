//! Reading order and paragraph reassembly.
//!
//! Layout analysis tends to cut one paragraph into several blocks (a page
//! break, a line with a different leading). After sorting, consecutive
//! paragraph elements are glued back together.

use crate::model::{ClassifiedElement, Content, Span, StructuredDocument, Tag};
use tracing::debug;

/// Stable sort into reading order: page, then top edge, then left edge.
pub fn sort_reading_order(elements: &mut [ClassifiedElement]) {
    elements.sort_by(|a, b| a.reading_order(b));
}

/// Merge every maximal run of consecutive `P` elements into one.
///
/// A space span is inserted between the spans of adjacent blocks. The merged
/// element keeps the bbox and page of the first block of its run; anything
/// that is not a paragraph passes through and ends the run.
pub fn merge_paragraphs(elements: Vec<ClassifiedElement>) -> Vec<ClassifiedElement> {
    let before = elements.len();
    let mut out: Vec<ClassifiedElement> = Vec::with_capacity(before);
    let mut run_open = false;

    for element in elements {
        let is_paragraph = element.tag() == Tag::P;
        if is_paragraph && run_open {
            if let (Some(last), Content::Text { spans, .. }) = (out.last_mut(), element.content) {
                if let Content::Text { spans: acc, .. } = &mut last.content {
                    acc.push(Span::space());
                    acc.extend(spans);
                }
            }
            continue;
        }
        run_open = is_paragraph;
        out.push(element);
    }

    debug!("Merged paragraphs: {} -> {} elements", before, out.len());
    out
}

/// Sort then merge, producing the document handed to the renderer.
pub fn build_document(mut elements: Vec<ClassifiedElement>) -> StructuredDocument {
    sort_reading_order(&mut elements);
    StructuredDocument {
        elements: merge_paragraphs(elements),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, ImageElement, ImageRef};

    fn text(tag: Tag, s: &str, page: usize, y0: f32, x0: f32) -> ClassifiedElement {
        ClassifiedElement::text(
            tag,
            vec![Span::new(s, "Helvetica", 10.0)],
            BBox::new(x0, y0, x0 + 100.0, y0 + 12.0),
            page,
        )
        .unwrap()
    }

    fn image(page: usize, y0: f32) -> ClassifiedElement {
        ClassifiedElement::image(ImageElement {
            bbox: BBox::new(50.0, y0, 250.0, y0 + 100.0),
            page,
            reference: ImageRef { page, object: 0 },
            width: 200,
            height: 100,
            smask: false,
        })
    }

    fn joined(e: &ClassifiedElement) -> String {
        e.spans().iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn consecutive_paragraphs_join_with_spaces() {
        let doc = build_document(vec![
            text(Tag::P, "Hello", 0, 200.0, 50.0),
            text(Tag::P, "World", 0, 220.0, 50.0),
            text(Tag::P, "!", 0, 240.0, 50.0),
        ]);
        assert_eq!(doc.len(), 1);
        assert_eq!(joined(&doc.elements[0]), "Hello World !");
        assert_eq!(doc.elements[0].bbox.y0, 200.0);
    }

    #[test]
    fn non_paragraphs_break_runs() {
        let doc = build_document(vec![
            text(Tag::P, "a", 0, 200.0, 50.0),
            text(Tag::Li, "• item", 0, 220.0, 50.0),
            text(Tag::P, "b", 0, 240.0, 50.0),
            image(0, 300.0),
            text(Tag::P, "c", 0, 420.0, 50.0),
        ]);
        let tags: Vec<Tag> = doc.iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec![Tag::P, Tag::Li, Tag::P, Tag::Image, Tag::P]);
    }

    #[test]
    fn sorting_orders_pages_then_top_then_left() {
        let doc = build_document(vec![
            text(Tag::H1, "page two", 1, 100.0, 50.0),
            text(Tag::H2, "right", 0, 300.0, 300.0),
            text(Tag::H2, "left", 0, 300.0, 50.0),
            text(Tag::H1, "top", 0, 150.0, 400.0),
        ]);
        let order: Vec<String> = doc.iter().map(joined).collect();
        assert_eq!(order, vec!["top", "left", "right", "page two"]);
    }

    #[test]
    fn paragraphs_merge_across_pages() {
        let doc = build_document(vec![
            text(Tag::P, "end of page", 0, 700.0, 50.0),
            text(Tag::P, "continued", 1, 120.0, 50.0),
        ]);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.elements[0].page, 0);
        assert_eq!(joined(&doc.elements[0]), "end of page continued");
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut elements = vec![
            text(Tag::H1, "first", 0, 100.0, 50.0),
            text(Tag::H2, "second", 0, 100.0, 50.0),
        ];
        sort_reading_order(&mut elements);
        assert_eq!(joined(&elements[0]), "first");
    }
}

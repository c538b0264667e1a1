//! Block classification: one semantic [`Tag`] per text block.
//!
//! The decision is an ordered list of [`Rule`]s evaluated against the
//! block's first span; the first rule that matches wins. Each rule can be
//! exercised on its own, and reordering is a matter of moving one entry.
//!
//! | # | Rule | Tag |
//! |---|------|-----|
//! | 1 | text starts with `Hình N.` | CAPTION |
//! | 2 | bold font, size ≥ 14 or `N. ` | H1 |
//! | 3 | bold font, size ≥ 12 or `N.N ` | H2 |
//! | 4 | bold font, size ≥ 11 | H3 |
//! | 5 | bullet, dash, `a)` / `b)` or `N.` marker | LI |
//! | – | anything else | P |
//!
//! Sizes are rounded to the nearest integer before comparison.

use crate::model::{Span, Tag, TextBlock};
use regex::{Regex, RegexBuilder};

/// Features of a block's first span that every rule reads.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadFeatures<'a> {
    /// Trimmed text of the first span.
    pub text: &'a str,
    /// Font name, lowercased.
    pub font: String,
    /// Font size rounded to the nearest integer.
    pub size: i32,
}

impl<'a> LeadFeatures<'a> {
    pub fn of(span: &'a Span) -> Self {
        Self {
            text: span.text.trim(),
            font: span.font.to_lowercase(),
            size: span.size.round() as i32,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font.contains("bold")
    }
}

/// Compiled patterns shared by the rules.
#[derive(Debug, Clone)]
pub struct Patterns {
    /// `Hình 3.` at the start, any case.
    pub caption: Regex,
    /// `1. ` — a one-level section number followed by whitespace.
    pub section: Regex,
    /// `1.2 ` — a two-level section number followed by whitespace.
    pub subsection: Regex,
    /// `1.` — a numbered list marker.
    pub numbered: Regex,
}

impl Default for Patterns {
    fn default() -> Self {
        Self {
            caption: RegexBuilder::new(r"^hình \d+\.")
                .case_insensitive(true)
                .build()
                .expect("caption pattern compiles"),
            section: Regex::new(r"^\d+\.\s").expect("section pattern compiles"),
            subsection: Regex::new(r"^\d+\.\d+\s").expect("subsection pattern compiles"),
            numbered: Regex::new(r"^\d+\.").expect("numbered pattern compiles"),
        }
    }
}

type Predicate = fn(&LeadFeatures<'_>, &Patterns) -> bool;

/// One classification rule.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub tag: Tag,
    pub matches: Predicate,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .finish()
    }
}

const LIST_MARKERS: [&str; 5] = ["•", "*", "-", "a)", "b)"];

fn is_caption(f: &LeadFeatures<'_>, p: &Patterns) -> bool {
    p.caption.is_match(f.text)
}

fn is_h1(f: &LeadFeatures<'_>, p: &Patterns) -> bool {
    f.is_bold() && (f.size >= 14 || p.section.is_match(f.text))
}

fn is_h2(f: &LeadFeatures<'_>, p: &Patterns) -> bool {
    f.is_bold() && (f.size >= 12 || p.subsection.is_match(f.text))
}

fn is_h3(f: &LeadFeatures<'_>, _: &Patterns) -> bool {
    f.is_bold() && f.size >= 11
}

fn is_list_item(f: &LeadFeatures<'_>, p: &Patterns) -> bool {
    LIST_MARKERS.iter().any(|m| f.text.starts_with(m)) || p.numbered.is_match(f.text)
}

/// The rule chain in priority order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "caption",
            tag: Tag::Caption,
            matches: is_caption,
        },
        Rule {
            name: "bold-h1",
            tag: Tag::H1,
            matches: is_h1,
        },
        Rule {
            name: "bold-h2",
            tag: Tag::H2,
            matches: is_h2,
        },
        Rule {
            name: "bold-h3",
            tag: Tag::H3,
            matches: is_h3,
        },
        Rule {
            name: "list-item",
            tag: Tag::Li,
            matches: is_list_item,
        },
    ]
}

/// Assigns a [`Tag`] to text blocks.
#[derive(Debug, Clone)]
pub struct BlockClassifier {
    rules: Vec<Rule>,
    patterns: Patterns,
}

impl Default for BlockClassifier {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

impl BlockClassifier {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            patterns: Patterns::default(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a block. Blocks without spans are paragraphs.
    pub fn classify(&self, block: &TextBlock) -> Tag {
        match block.spans().next() {
            Some(first) => self.classify_lead(first),
            None => Tag::P,
        }
    }

    /// Classify from the first span alone.
    pub fn classify_lead(&self, first: &Span) -> Tag {
        let features = LeadFeatures::of(first);
        self.rules
            .iter()
            .find(|rule| (rule.matches)(&features, &self.patterns))
            .map(|rule| rule.tag)
            .unwrap_or(Tag::P)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, TextLine};

    fn classify(text: &str, font: &str, size: f32) -> Tag {
        BlockClassifier::default().classify_lead(&Span::new(text, font, size))
    }

    #[test]
    fn bold_large_numbered_is_h1() {
        assert_eq!(classify("1. Introduction", "Arial-Bold", 15.0), Tag::H1);
    }

    #[test]
    fn bold_numbered_section_is_h1_at_any_size() {
        assert_eq!(classify("2. Scope", "Arial,Bold", 10.0), Tag::H1);
    }

    #[test]
    fn bold_twelve_point_subsection_is_h2() {
        assert_eq!(classify("1.1 Background", "Arial-Bold", 12.0), Tag::H2);
        assert_eq!(classify("3.4 Notes", "Times-Bold", 9.0), Tag::H2);
    }

    #[test]
    fn bold_eleven_point_is_h3() {
        assert_eq!(classify("Remarks", "Helvetica-Bold", 11.2), Tag::H3);
    }

    #[test]
    fn size_is_rounded_before_thresholds() {
        assert_eq!(classify("Title", "Helvetica-Bold", 13.6), Tag::H1);
        assert_eq!(classify("Title", "Helvetica-Bold", 13.4), Tag::H2);
    }

    #[test]
    fn small_bold_text_falls_through() {
        assert_eq!(classify("Note", "Helvetica-Bold", 9.0), Tag::P);
        assert_eq!(classify("- bold bullet", "Helvetica-Bold", 9.0), Tag::Li);
    }

    #[test]
    fn list_markers() {
        assert_eq!(classify("• item one", "Helvetica", 10.0), Tag::Li);
        assert_eq!(classify("* starred", "Helvetica", 10.0), Tag::Li);
        assert_eq!(classify("- dashed", "Helvetica", 10.0), Tag::Li);
        assert_eq!(classify("a) first", "Helvetica", 10.0), Tag::Li);
        assert_eq!(classify("b) second", "Helvetica", 10.0), Tag::Li);
        assert_eq!(classify("3.step", "Helvetica", 10.0), Tag::Li);
    }

    #[test]
    fn plain_sentence_is_paragraph() {
        assert_eq!(classify("Just a sentence.", "Helvetica", 10.0), Tag::P);
        assert_eq!(classify("c) not a marker", "Helvetica", 10.0), Tag::P);
    }

    #[test]
    fn caption_wins_regardless_of_style() {
        assert_eq!(classify("Hình 1. A chart", "Helvetica", 10.0), Tag::Caption);
        assert_eq!(classify("HÌNH 12. Sơ đồ", "Arial-Bold", 16.0), Tag::Caption);
        assert_eq!(classify("  hình 3. leading space", "Helvetica", 10.0), Tag::Caption);
    }

    #[test]
    fn only_first_span_counts() {
        let block = TextBlock::new(
            0,
            BBox::default(),
            vec![TextLine::new(vec![
                Span::new("Plain start ", "Helvetica", 10.0),
                Span::new("Hình 1.", "Helvetica-Bold", 16.0),
            ])],
        );
        assert_eq!(BlockClassifier::default().classify(&block), Tag::P);
    }

    #[test]
    fn first_span_may_sit_on_a_later_line() {
        let block = TextBlock::new(
            0,
            BBox::default(),
            vec![
                TextLine::new(vec![]),
                TextLine::new(vec![Span::new("• item", "Helvetica", 10.0)]),
            ],
        );
        assert_eq!(BlockClassifier::default().classify(&block), Tag::Li);
    }

    #[test]
    fn empty_block_is_paragraph() {
        let block = TextBlock::new(0, BBox::default(), vec![]);
        assert_eq!(BlockClassifier::default().classify(&block), Tag::P);
    }

    #[test]
    fn rules_can_be_reordered() {
        let mut rules = default_rules();
        rules.retain(|r| r.name != "caption");
        let c = BlockClassifier::with_rules(rules);
        assert_eq!(c.classify_lead(&Span::new("Hình 1. x", "Helvetica", 10.0)), Tag::P);
        assert_eq!(c.rules().len(), 4);
    }
}

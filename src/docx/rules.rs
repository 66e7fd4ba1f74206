//! Formatting rules model and the block-type → style resolver
//!
//! [`FormattingRules`] is the externally supplied style specification
//! (deserialized from the JSON the surrounding service passes in) and is
//! treated as read-only. [`resolve`] maps a classified paragraph role onto
//! a concrete [`StyleTarget`]; the match is exhaustive over the closed
//! [`BlockType`] enum, so adding a variant without deciding its style is a
//! compile error.

use serde::{Deserialize, Serialize};

use super::bibliography::NumberingScheme;

/// Paragraph role assigned by the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[serde(rename = "title_page")]
    TitlePage,
    #[serde(rename = "toc")]
    Toc,
    #[serde(rename = "toc_entry")]
    TocEntry,
    #[serde(rename = "heading_1")]
    Heading1,
    #[serde(rename = "heading_2")]
    Heading2,
    #[serde(rename = "heading_3")]
    Heading3,
    #[serde(rename = "heading_4")]
    Heading4,
    #[serde(rename = "body_text")]
    BodyText,
    #[serde(rename = "list_item")]
    ListItem,
    #[serde(rename = "quote")]
    Quote,
    #[serde(rename = "figure")]
    Figure,
    #[serde(rename = "figure_caption")]
    FigureCaption,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "table_caption")]
    TableCaption,
    #[serde(rename = "formula")]
    Formula,
    #[serde(rename = "bibliography_title")]
    BibliographyTitle,
    #[serde(rename = "bibliography_entry")]
    BibliographyEntry,
    #[serde(rename = "appendix_title")]
    AppendixTitle,
    #[serde(rename = "appendix_content")]
    AppendixContent,
    #[serde(rename = "footnote")]
    Footnote,
    #[serde(rename = "page_number")]
    PageNumber,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "unknown")]
    Unknown,
}

impl BlockType {
    /// All 23 variants, for exhaustive resolver tests.
    pub const ALL: [BlockType; 23] = [
        BlockType::TitlePage,
        BlockType::Toc,
        BlockType::TocEntry,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::Heading4,
        BlockType::BodyText,
        BlockType::ListItem,
        BlockType::Quote,
        BlockType::Figure,
        BlockType::FigureCaption,
        BlockType::Table,
        BlockType::TableCaption,
        BlockType::Formula,
        BlockType::BibliographyTitle,
        BlockType::BibliographyEntry,
        BlockType::AppendixTitle,
        BlockType::AppendixContent,
        BlockType::Footnote,
        BlockType::PageNumber,
        BlockType::Empty,
        BlockType::Unknown,
    ];
}

/// Paragraph alignment, serialized with the rules document's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
    Justify,
}

impl Alignment {
    /// The `w:jc` attribute value. Note WordprocessingML spells justified
    /// alignment as `both`.
    pub fn jc_val(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
            Alignment::Justify => "both",
        }
    }
}

/// Page geometry rules. Margins in millimetres.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRules {
    pub margins: PageMargins,
}

/// Page margins in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMargins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        // Common academic defaults: wide binding margin on the left.
        PageMargins {
            top: 20.0,
            bottom: 20.0,
            left: 30.0,
            right: 15.0,
        }
    }
}

/// Body text style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRules {
    pub font_family: String,
    /// Font size in points.
    pub font_size: f64,
    /// Line spacing multiplier (1.0 = single).
    pub line_spacing: f64,
    /// First-line indent in millimetres.
    pub first_line_indent: f64,
    pub alignment: Alignment,
}

impl Default for TextRules {
    fn default() -> Self {
        TextRules {
            font_family: "Times New Roman".to_string(),
            font_size: 14.0,
            line_spacing: 1.5,
            first_line_indent: 12.5,
            alignment: Alignment::Justify,
        }
    }
}

/// Style overrides for one heading level. Unset fields fall back to the
/// body text style; `bold` falls back to `true`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub alignment: Option<Alignment>,
    /// Space before the heading in points.
    pub space_before: Option<f64>,
    /// Space after the heading in points.
    pub space_after: Option<f64>,
}

/// Per-level heading styles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingRules {
    pub level1: Option<HeadingStyle>,
    pub level2: Option<HeadingStyle>,
    pub level3: Option<HeadingStyle>,
    pub level4: Option<HeadingStyle>,
}

impl HeadingRules {
    fn level(&self, level: u8) -> Option<&HeadingStyle> {
        match level {
            1 => self.level1.as_ref(),
            2 => self.level2.as_ref(),
            3 => self.level3.as_ref(),
            _ => self.level4.as_ref(),
        }
    }
}

/// Style for a special element class (bibliography, captions, footnotes).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

/// Special-element styles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialRules {
    pub bibliography: Option<SpecialStyle>,
    pub captions: Option<SpecialStyle>,
    pub footnotes: Option<SpecialStyle>,
}

/// The externally supplied formatting specification. Read-only: the engine
/// never mutates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingRules {
    pub page: PageRules,
    pub text: TextRules,
    pub headings: HeadingRules,
    pub special: SpecialRules,
    /// Requested bibliography numbering style, if any.
    pub bibliography_numbering: Option<NumberingScheme>,
}

/// Resolved style for one paragraph. Every field optional; `None` means
/// "leave that aspect of the paragraph alone".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleTarget {
    pub font_family: Option<String>,
    /// Points.
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub alignment: Option<Alignment>,
    /// Millimetres. `Some(0.0)` means "remove any first-line indent".
    pub first_line_indent: Option<f64>,
    /// Millimetres. Sets both `w:hanging` and `w:left`.
    pub hanging_indent: Option<f64>,
    /// Line spacing multiplier.
    pub line_spacing: Option<f64>,
    /// Points.
    pub space_before: Option<f64>,
    /// Points.
    pub space_after: Option<f64>,
}

/// Hanging indent applied to bibliography entries, in millimetres.
const BIBLIOGRAPHY_HANGING_INDENT_MM: f64 = 8.0;

/// Footnote font size fallback when the rules omit one, in points.
const FOOTNOTE_FALLBACK_SIZE_PT: f64 = 10.0;

/// Map a block type onto a concrete style target.
///
/// Returns `None` for non-text or structurally fragile content
/// (`empty`, `unknown`, `table`, `formula`, `figure`): those paragraphs are
/// never touched.
pub fn resolve(block_type: BlockType, rules: &FormattingRules) -> Option<StyleTarget> {
    match block_type {
        // Never touch non-text or structurally fragile content.
        BlockType::Empty
        | BlockType::Unknown
        | BlockType::Table
        | BlockType::Formula
        | BlockType::Figure => None,

        BlockType::BodyText | BlockType::AppendixContent => Some(body_target(rules)),

        BlockType::Heading1 => Some(heading_target(rules, 1)),
        BlockType::Heading2 => Some(heading_target(rules, 2)),
        BlockType::Heading3 => Some(heading_target(rules, 3)),
        BlockType::Heading4 => Some(heading_target(rules, 4)),

        BlockType::ListItem => Some(body_target(rules)),

        BlockType::Quote => Some(StyleTarget {
            italic: Some(true),
            ..body_target(rules)
        }),

        BlockType::BibliographyEntry => {
            let bib = rules.special.bibliography.as_ref();
            Some(StyleTarget {
                font_family: Some(
                    bib.and_then(|s| s.font_family.clone())
                        .unwrap_or_else(|| rules.text.font_family.clone()),
                ),
                font_size: Some(
                    bib.and_then(|s| s.font_size).unwrap_or(rules.text.font_size),
                ),
                alignment: Some(Alignment::Justify),
                first_line_indent: Some(0.0),
                hanging_indent: Some(BIBLIOGRAPHY_HANGING_INDENT_MM),
                line_spacing: Some(rules.text.line_spacing),
                ..StyleTarget::default()
            })
        }

        BlockType::FigureCaption | BlockType::TableCaption => {
            let captions = rules.special.captions.as_ref();
            Some(StyleTarget {
                font_family: Some(
                    captions
                        .and_then(|s| s.font_family.clone())
                        .unwrap_or_else(|| rules.text.font_family.clone()),
                ),
                font_size: Some(
                    captions
                        .and_then(|s| s.font_size)
                        .unwrap_or(rules.text.font_size),
                ),
                bold: captions.and_then(|s| s.bold),
                italic: captions.and_then(|s| s.italic),
                alignment: Some(Alignment::Center),
                first_line_indent: Some(0.0),
                line_spacing: Some(rules.text.line_spacing),
                ..StyleTarget::default()
            })
        }

        BlockType::BibliographyTitle | BlockType::AppendixTitle => {
            // Section titles get level-1 heading treatment.
            let style = rules.headings.level(1);
            Some(StyleTarget {
                font_family: Some(
                    style
                        .and_then(|s| s.font_family.clone())
                        .unwrap_or_else(|| rules.text.font_family.clone()),
                ),
                font_size: Some(
                    style
                        .and_then(|s| s.font_size)
                        .unwrap_or(rules.text.font_size),
                ),
                bold: Some(style.and_then(|s| s.bold).unwrap_or(true)),
                alignment: Some(Alignment::Center),
                first_line_indent: Some(0.0),
                line_spacing: Some(rules.text.line_spacing),
                ..StyleTarget::default()
            })
        }

        BlockType::TitlePage => Some(StyleTarget {
            font_family: Some(rules.text.font_family.clone()),
            font_size: Some(rules.text.font_size),
            alignment: Some(Alignment::Center),
            first_line_indent: Some(0.0),
            ..StyleTarget::default()
        }),

        BlockType::Toc | BlockType::TocEntry => Some(StyleTarget {
            font_family: Some(rules.text.font_family.clone()),
            font_size: Some(rules.text.font_size),
            alignment: Some(Alignment::Left),
            first_line_indent: Some(0.0),
            line_spacing: Some(rules.text.line_spacing),
            ..StyleTarget::default()
        }),

        BlockType::Footnote => {
            let footnotes = rules.special.footnotes.as_ref();
            Some(StyleTarget {
                font_family: Some(
                    footnotes
                        .and_then(|s| s.font_family.clone())
                        .unwrap_or_else(|| rules.text.font_family.clone()),
                ),
                font_size: Some(
                    footnotes
                        .and_then(|s| s.font_size)
                        .unwrap_or(FOOTNOTE_FALLBACK_SIZE_PT),
                ),
                alignment: Some(Alignment::Justify),
                first_line_indent: Some(0.0),
                line_spacing: Some(1.0),
                ..StyleTarget::default()
            })
        }

        BlockType::PageNumber => Some(StyleTarget {
            font_family: Some(rules.text.font_family.clone()),
            font_size: Some(rules.text.font_size),
            alignment: Some(Alignment::Center),
            first_line_indent: Some(0.0),
            ..StyleTarget::default()
        }),
    }
}

fn body_target(rules: &FormattingRules) -> StyleTarget {
    StyleTarget {
        font_family: Some(rules.text.font_family.clone()),
        font_size: Some(rules.text.font_size),
        alignment: Some(rules.text.alignment),
        first_line_indent: Some(rules.text.first_line_indent),
        line_spacing: Some(rules.text.line_spacing),
        ..StyleTarget::default()
    }
}

fn heading_target(rules: &FormattingRules, level: u8) -> StyleTarget {
    let style = rules.headings.level(level);
    StyleTarget {
        font_family: Some(
            style
                .and_then(|s| s.font_family.clone())
                .unwrap_or_else(|| rules.text.font_family.clone()),
        ),
        font_size: Some(
            style
                .and_then(|s| s.font_size)
                .unwrap_or(rules.text.font_size),
        ),
        // Headings are bold unless the rules explicitly turn it off.
        bold: Some(style.and_then(|s| s.bold).unwrap_or(true)),
        italic: style.and_then(|s| s.italic),
        alignment: Some(style.and_then(|s| s.alignment).unwrap_or(Alignment::Left)),
        first_line_indent: Some(0.0),
        line_spacing: Some(rules.text.line_spacing),
        space_before: style.and_then(|s| s.space_before),
        space_after: style.and_then(|s| s.space_after),
        ..StyleTarget::default()
    }
}

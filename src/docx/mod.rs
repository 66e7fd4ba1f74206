//! OOXML in-place formatting for Word documents (.docx)
//!
//! This module reformats an academic .docx to match an externally supplied
//! rules document. The main document part (`word/document.xml`) is parsed
//! into an order-preserving tree, paragraph and run properties are mutated
//! according to a per-paragraph block classification, page margins are
//! applied once, bibliography entries get Unicode-level normalization, and
//! the archive is repacked with every other part untouched.
//!
//! Classifications and bibliography entries come from an external
//! classifier; this module consumes them read-only and never crashes on
//! stale or out-of-range indices.
//!
//! # Example
//!
//! ```rust,no_run
//! use normdoc_core::docx::{format_document, BlockType, Classification, FormattingRules};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doc = std::fs::read("thesis.docx")?;
//!     let rules = FormattingRules::default();
//!     let classifications = vec![
//!         Classification { paragraph_index: 0, block_type: BlockType::Heading1 },
//!         Classification { paragraph_index: 1, block_type: BlockType::BodyText },
//!     ];
//!     let formatted = format_document(&doc, &rules, &classifications, &[])?;
//!     std::fs::write("thesis_formatted.docx", formatted)?;
//!     Ok(())
//! }
//! ```

mod error;
pub mod bibliography;
pub mod engine;
pub mod rules;
pub mod units;
pub mod xml_tree;

pub use bibliography::{normalize_text, renumber, BibliographyEntry, Language, NumberingScheme};
pub use engine::{DocxFormatter, ParagraphPosition};
pub use error::DocxError;
pub use rules::{
    resolve, Alignment, BlockType, FormattingRules, HeadingRules, HeadingStyle, PageMargins,
    PageRules, SpecialRules, SpecialStyle, StyleTarget, TextRules,
};
pub use xml_tree::{Element, NodeId, XmlNode, XmlTree};

use serde::{Deserialize, Serialize};

/// One classified paragraph, as produced by the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub paragraph_index: usize,
    pub block_type: BlockType,
}

/// Format a whole document in one pass.
///
/// Pipeline: load → page margins → per-paragraph formatting → bibliography
/// normalization → save. Strictly linear; the first fatal error aborts the
/// call and nothing is written. Archive entries other than
/// `word/document.xml` pass through unmodified.
pub fn format_document(
    doc_bytes: &[u8],
    rules: &FormattingRules,
    classifications: &[Classification],
    bibliography_entries: &[BibliographyEntry],
) -> Result<Vec<u8>, DocxError> {
    let mut formatter = DocxFormatter::load(doc_bytes)?;

    formatter.apply_page_margins(rules);
    for classification in classifications {
        formatter.apply_formatting(classification.paragraph_index, classification.block_type, rules);
    }
    for (i, entry) in bibliography_entries.iter().enumerate() {
        formatter.normalize_bibliography_entry(entry, rules.bibliography_numbering, i + 1);
    }

    formatter.save()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_deserializes_from_classifier_json() {
        let parsed: Vec<Classification> = serde_json::from_str(
            r#"[{"paragraph_index":0,"block_type":"heading_1"},
                {"paragraph_index":1,"block_type":"body_text"}]"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].block_type, BlockType::Heading1);
        assert_eq!(parsed[1].paragraph_index, 1);
    }

    #[test]
    fn test_format_document_rejects_non_archive() {
        let err = format_document(b"", &FormattingRules::default(), &[], &[]);
        assert!(err.is_err());
    }
}

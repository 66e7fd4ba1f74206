//! Paragraph formatting engine
//!
//! [`DocxFormatter`] holds one document's archive entries and its parsed
//! `word/document.xml` tree, applies per-paragraph formatting and page
//! margins, and repacks the archive. Every archive entry other than the
//! main document part round-trips byte-for-byte. One formatter handles
//! exactly one document: load → mutate → save, strictly linear.

use std::io::{Cursor, Read, Write};

use log::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::bibliography::{normalize_text, renumber, BibliographyEntry, NumberingScheme};
use super::error::DocxError;
use super::rules::{resolve, BlockType, FormattingRules, StyleTarget};
use super::units::{line_spacing_to_twips, mm_to_twips, pt_to_half_points, pt_to_twips};
use super::xml_tree::{NodeId, XmlTree};

/// Part name of the main document inside the OPC package.
const DOCUMENT_PART: &str = "word/document.xml";

/// One raw archive entry, kept in original order.
#[derive(Debug, Clone)]
struct ArchiveEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// Position of one top-level body paragraph.
///
/// `paragraph_index` counts `w:p` elements that are direct children of
/// `w:body`, in body traversal order; paragraphs nested inside tables are
/// not indexed, matching the plain-text extraction the classifier sees.
#[derive(Debug, Clone, Copy)]
pub struct ParagraphPosition {
    pub node: NodeId,
    /// Position among all body children, paragraphs or not.
    pub body_index: usize,
    pub paragraph_index: usize,
}

/// In-place formatter for one .docx document.
#[derive(Debug)]
pub struct DocxFormatter {
    entries: Vec<ArchiveEntry>,
    tree: XmlTree,
    body: NodeId,
    paragraphs: Vec<ParagraphPosition>,
}

impl DocxFormatter {
    /// Open the archive, parse `word/document.xml` and index paragraphs.
    ///
    /// Fails with [`DocxError::Zip`] if the bytes are not an archive,
    /// [`DocxError::PartNotFound`] if the main part is missing and
    /// [`DocxError::MissingBody`] if the document root or body cannot be
    /// located.
    pub fn load(doc_bytes: &[u8]) -> Result<Self, DocxError> {
        let reader = Cursor::new(doc_bytes);
        let mut archive = ZipArchive::new(reader)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            if !is_dir {
                file.read_to_end(&mut data)?;
            }
            entries.push(ArchiveEntry { name, data, is_dir });
        }

        let document_xml = entries
            .iter()
            .find(|e| e.name == DOCUMENT_PART)
            .map(|e| e.data.as_slice())
            .ok_or_else(|| DocxError::PartNotFound(DOCUMENT_PART.to_string()))?;

        let tree = XmlTree::parse(document_xml)?;
        let root = tree
            .root_element()
            .filter(|&id| tree.element(id).is_some_and(|e| e.name == "w:document"))
            .ok_or(DocxError::MissingBody)?;
        let body = tree.find_child(root, "w:body").ok_or(DocxError::MissingBody)?;

        let paragraphs = index_paragraphs(&tree, body);

        Ok(DocxFormatter {
            entries,
            tree,
            body,
            paragraphs,
        })
    }

    /// Positions of all indexed paragraphs.
    pub fn paragraphs(&self) -> &[ParagraphPosition] {
        &self.paragraphs
    }

    /// Read access to the document tree, mainly for assertions in tests.
    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Apply the resolved style for `block_type` to one paragraph.
    ///
    /// An out-of-range index is a no-op: the classification is best-effort
    /// external output and must never abort the pipeline. Block types in
    /// the untouched set resolve to no target and are skipped.
    pub fn apply_formatting(
        &mut self,
        paragraph_index: usize,
        block_type: BlockType,
        rules: &FormattingRules,
    ) {
        let Some(pos) = self.paragraphs.get(paragraph_index) else {
            debug!("classification for out-of-range paragraph {paragraph_index}; skipping");
            return;
        };
        let paragraph = pos.node;
        let Some(target) = resolve(block_type, rules) else {
            debug!("block type {block_type:?} is untouched; skipping paragraph {paragraph_index}");
            return;
        };

        self.apply_paragraph_properties(paragraph, &target);
        self.apply_run_properties(paragraph, &target);
    }

    fn apply_paragraph_properties(&mut self, paragraph: NodeId, target: &StyleTarget) {
        let ppr = self.tree.ensure_ppr(paragraph);

        if let Some(alignment) = target.alignment {
            self.tree
                .set_ordered_prop(ppr, "w:jc", &[("w:val", alignment.jc_val())]);
        }

        if let Some(indent) = target.first_line_indent {
            if indent > 0.0 {
                let twips = mm_to_twips(indent).to_string();
                self.tree
                    .set_ordered_prop(ppr, "w:ind", &[("w:firstLine", &twips)]);
            } else if let Some(ind) = self.tree.find_child(ppr, "w:ind") {
                // Exactly zero: drop only the firstLine attribute so any
                // other indent attributes survive.
                self.tree.remove_attr(ind, "w:firstLine");
            }
        }

        if let Some(hanging) = target.hanging_indent {
            let twips = mm_to_twips(hanging).to_string();
            self.tree.set_ordered_prop(
                ppr,
                "w:ind",
                &[("w:hanging", &twips), ("w:left", &twips)],
            );
        }

        if let Some(multiplier) = target.line_spacing {
            let line = line_spacing_to_twips(multiplier).to_string();
            self.tree.set_ordered_prop(
                ppr,
                "w:spacing",
                &[("w:line", &line), ("w:lineRule", "auto")],
            );
        }

        // Merged into any existing w:spacing node, never replacing it.
        if let Some(before) = target.space_before {
            let twips = pt_to_twips(before).to_string();
            self.tree
                .set_ordered_prop(ppr, "w:spacing", &[("w:before", &twips)]);
        }
        if let Some(after) = target.space_after {
            let twips = pt_to_twips(after).to_string();
            self.tree
                .set_ordered_prop(ppr, "w:spacing", &[("w:after", &twips)]);
        }
    }

    fn apply_run_properties(&mut self, paragraph: NodeId, target: &StyleTarget) {
        for run in self.tree.find_children(paragraph, "w:r") {
            let rpr = self.tree.ensure_rpr(run);

            if let Some(family) = &target.font_family {
                self.tree.set_ordered_prop(
                    rpr,
                    "w:rFonts",
                    &[("w:ascii", family), ("w:hAnsi", family), ("w:cs", family)],
                );
            }

            if let Some(size) = target.font_size {
                let half_points = pt_to_half_points(size).to_string();
                self.tree
                    .set_ordered_prop(rpr, "w:sz", &[("w:val", &half_points)]);
                self.tree
                    .set_ordered_prop(rpr, "w:szCs", &[("w:val", &half_points)]);
            }

            self.apply_toggle(rpr, target.bold, "w:b", "w:bCs");
            self.apply_toggle(rpr, target.italic, "w:i", "w:iCs");
        }
    }

    /// Tri-state bold/italic: `Some(true)` adds a bare toggle element if
    /// absent, `Some(false)` removes it and its complex-script companion,
    /// `None` leaves the run untouched.
    fn apply_toggle(&mut self, rpr: NodeId, state: Option<bool>, tag: &str, cs_tag: &str) {
        match state {
            Some(true) => {
                if self.tree.find_child(rpr, tag).is_none() {
                    self.tree.append_element(rpr, tag);
                }
            }
            Some(false) => {
                self.tree.remove_children(rpr, tag);
                self.tree.remove_children(rpr, cs_tag);
            }
            None => {}
        }
    }

    /// Apply page margins to the document's section properties.
    ///
    /// Lookup order: `w:sectPr` as a direct body child, then inside the
    /// last paragraph's `w:pPr`, else a fresh one appended to the body.
    pub fn apply_page_margins(&mut self, rules: &FormattingRules) {
        let sect_pr = self.find_or_create_sect_pr();
        let margins = &rules.page.margins;
        let top = mm_to_twips(margins.top).to_string();
        let bottom = mm_to_twips(margins.bottom).to_string();
        let left = mm_to_twips(margins.left).to_string();
        let right = mm_to_twips(margins.right).to_string();
        self.tree.set_ordered_prop(
            sect_pr,
            "w:pgMar",
            &[
                ("w:top", &top),
                ("w:bottom", &bottom),
                ("w:left", &left),
                ("w:right", &right),
            ],
        );
    }

    fn find_or_create_sect_pr(&mut self) -> NodeId {
        if let Some(id) = self.tree.find_child(self.body, "w:sectPr") {
            return id;
        }
        if let Some(last) = self.paragraphs.last() {
            if let Some(ppr) = self.tree.find_child(last.node, "w:pPr") {
                if let Some(id) = self.tree.find_child(ppr, "w:sectPr") {
                    return id;
                }
            }
        }
        self.tree.append_element(self.body, "w:sectPr")
    }

    /// Normalize one bibliography entry's text in place.
    ///
    /// The paragraph's text is concatenated across every `w:t` of every
    /// run, normalized, then written back into the first `w:t`; the other
    /// `w:t` nodes are emptied. Run boundaries and formatting stay where
    /// they were — only text content is consolidated. No-op when the
    /// normalized text equals the original.
    pub fn normalize_bibliography_entry(
        &mut self,
        entry: &BibliographyEntry,
        numbering: Option<NumberingScheme>,
        ordinal: usize,
    ) {
        let Some(pos) = self.paragraphs.get(entry.paragraph_index) else {
            debug!(
                "bibliography entry for out-of-range paragraph {}; skipping",
                entry.paragraph_index
            );
            return;
        };
        let paragraph = pos.node;

        // Descendant search so runs nested in hyperlinks are included.
        let text_nodes: Vec<NodeId> = self.tree.find_descendants(paragraph, "w:t");
        if text_nodes.is_empty() {
            return;
        }

        let original: String = text_nodes
            .iter()
            .map(|&t| self.tree.get_text(t))
            .collect();
        let mut normalized = normalize_text(&original, entry.language);
        if let Some(scheme) = numbering {
            normalized = renumber(&normalized, scheme, ordinal);
        }
        if normalized == original {
            return;
        }

        self.tree.set_text(text_nodes[0], &normalized);
        for &t in &text_nodes[1..] {
            self.tree.set_text(t, "");
        }
    }

    /// Serialize the mutated tree and repack the archive.
    ///
    /// `word/document.xml` is replaced; every other entry is written back
    /// from its original bytes, DEFLATE-compressed, in original order.
    pub fn save(&self) -> Result<Vec<u8>, DocxError> {
        let document_xml = self.tree.build()?;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.trim_end_matches('/'), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            if entry.name == DOCUMENT_PART {
                writer.write_all(&document_xml)?;
            } else {
                writer.write_all(&entry.data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

fn index_paragraphs(tree: &XmlTree, body: NodeId) -> Vec<ParagraphPosition> {
    let mut paragraphs = Vec::new();
    let Some(body_el) = tree.element(body) else {
        return paragraphs;
    };
    let mut paragraph_index = 0;
    for (body_index, &child) in body_el.children.iter().enumerate() {
        if tree.element(child).is_some_and(|e| e.name == "w:p") {
            paragraphs.push(ParagraphPosition {
                node: child,
                body_index,
                paragraph_index,
            });
            paragraph_index += 1;
        }
    }
    paragraphs
}

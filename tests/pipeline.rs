//! End-to-end pipeline properties, run against a synthetic in-memory .docx.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use normdoc_core::docx::{
    format_document, BibliographyEntry, BlockType, Classification, DocxFormatter,
    FormattingRules, Language, NumberingScheme, XmlTree,
};

const DOCUMENT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:body>"#,
    r#"<w:p><w:r><w:t>ВВЕДЕНИЕ</w:t></w:r></w:p>"#,
    r#"<w:p><w:pPr><w:spacing w:after="120"/></w:pPr><w:r><w:t>Основной текст работы.</w:t></w:r></w:p>"#,
    r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>ячейка</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
    r#"<w:p><w:r><w:t>Формула E=mc2</w:t></w:r></w:p>"#,
    "<w:p><w:r><w:t>Иванов И. И. \"Наука\"</w:t></w:r><w:r><w:t> 10 мм \u{2014} текст</w:t></w:r></w:p>",
    r#"</w:body></w:document>"#,
);

fn build_docx(document_xml: &str) -> Vec<u8> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();

    writer.start_file("_rels/.rels", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#)
        .unwrap();

    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document_xml.as_bytes()).unwrap();

    writer.start_file("word/styles.xml", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0"?><w:styles xmlns:w="ns"/>"#)
        .unwrap();

    writer.start_file("word/media/image1.png", options).unwrap();
    writer.write_all(&[0x89, 0x50, 0x4E, 0x47, 0x00, 0x01]).unwrap();

    writer.finish().unwrap().into_inner()
}

fn extract(archive_bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

fn classifications() -> Vec<Classification> {
    vec![
        Classification {
            paragraph_index: 0,
            block_type: BlockType::Heading1,
        },
        Classification {
            paragraph_index: 1,
            block_type: BlockType::BodyText,
        },
        Classification {
            paragraph_index: 2,
            block_type: BlockType::Formula,
        },
        Classification {
            paragraph_index: 3,
            block_type: BlockType::BibliographyEntry,
        },
    ]
}

fn bibliography() -> Vec<BibliographyEntry> {
    vec![BibliographyEntry {
        paragraph_index: 3,
        raw_text: "Иванов И. И. \"Наука\" 10 мм \u{2014} текст".to_string(),
        language: Language::Ru,
    }]
}

#[test]
fn full_pipeline_runs_and_preserves_untouched_parts() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(
        &doc,
        &FormattingRules::default(),
        &classifications(),
        &bibliography(),
    )
    .unwrap();

    // Every part other than word/document.xml is byte-identical.
    for name in [
        "[Content_Types].xml",
        "_rels/.rels",
        "word/styles.xml",
        "word/media/image1.png",
    ] {
        assert_eq!(extract(&doc, name), extract(&out, name), "{name} changed");
    }
    assert_ne!(
        extract(&doc, "word/document.xml"),
        extract(&out, "word/document.xml")
    );
}

#[test]
fn pipeline_is_idempotent() {
    let doc = build_docx(DOCUMENT_XML);
    let rules = FormattingRules::default();
    let once = format_document(&doc, &rules, &classifications(), &bibliography()).unwrap();
    let twice = format_document(&once, &rules, &classifications(), &bibliography()).unwrap();
    assert_eq!(
        extract(&once, "word/document.xml"),
        extract(&twice, "word/document.xml")
    );
}

#[test]
fn sibling_order_is_preserved() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(
        &doc,
        &FormattingRules::default(),
        &classifications(),
        &bibliography(),
    )
    .unwrap();

    let tree = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();
    let document = tree.root_element().unwrap();
    let body = tree.find_child(document, "w:body").unwrap();
    let names: Vec<String> = tree
        .element(body)
        .unwrap()
        .children
        .iter()
        .filter_map(|&c| tree.element(c).map(|e| e.name.clone()))
        .collect();
    // Paragraphs, table and the appended sectPr, in order.
    assert_eq!(
        names,
        vec!["w:p", "w:p", "w:tbl", "w:p", "w:p", "w:sectPr"]
    );
}

#[test]
fn formula_paragraph_is_untouched() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(
        &doc,
        &FormattingRules::default(),
        &classifications(),
        &bibliography(),
    )
    .unwrap();

    let tree = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();
    let document = tree.root_element().unwrap();
    let body = tree.find_child(document, "w:body").unwrap();
    let formula = tree.find_children(body, "w:p")[2];
    // No pPr was ever created for the skipped paragraph.
    assert!(tree.find_child(formula, "w:pPr").is_none());
    assert_eq!(tree.get_text(formula), "Формула E=mc2");
}

#[test]
fn margins_written_in_twips() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(&doc, &FormattingRules::default(), &[], &[]).unwrap();

    let tree = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();
    let document = tree.root_element().unwrap();
    let body = tree.find_child(document, "w:body").unwrap();
    let sect_pr = tree.find_child(body, "w:sectPr").unwrap();
    let pg_mar = tree.find_child(sect_pr, "w:pgMar").unwrap();
    assert_eq!(tree.get_attr(pg_mar, "w:top"), Some("1134"));
    assert_eq!(tree.get_attr(pg_mar, "w:bottom"), Some("1134"));
    assert_eq!(tree.get_attr(pg_mar, "w:left"), Some("1701"));
    assert_eq!(tree.get_attr(pg_mar, "w:right"), Some("850"));
}

#[test]
fn empty_classification_leaves_paragraphs_unchanged() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(&doc, &FormattingRules::default(), &[], &[]).unwrap();

    let before = XmlTree::parse(&extract(&doc, "word/document.xml")).unwrap();
    let after = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();

    let paragraphs = |tree: &XmlTree| {
        let document = tree.root_element().unwrap();
        let body = tree.find_child(document, "w:body").unwrap();
        tree.find_children(body, "w:p")
    };

    let before_ps = paragraphs(&before);
    let after_ps = paragraphs(&after);
    assert_eq!(before_ps.len(), after_ps.len());
    for (&b, &a) in before_ps.iter().zip(after_ps.iter()) {
        assert_eq!(before.get_text(b), after.get_text(a));
        // No property nodes appeared on untouched paragraphs.
        assert_eq!(
            before.find_child(b, "w:pPr").is_some(),
            after.find_child(a, "w:pPr").is_some()
        );
    }
    // Margins are still applied.
    let document = after.root_element().unwrap();
    let body = after.find_child(document, "w:body").unwrap();
    assert!(after.find_child(body, "w:sectPr").is_some());
}

#[test]
fn spacing_merge_not_replace() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(
        &doc,
        &FormattingRules::default(),
        &classifications(),
        &[],
    )
    .unwrap();

    let tree = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();
    let document = tree.root_element().unwrap();
    let body = tree.find_child(document, "w:body").unwrap();
    let body_text = tree.find_children(body, "w:p")[1];
    let ppr = tree.find_child(body_text, "w:pPr").unwrap();
    let spacing = tree.find_child(ppr, "w:spacing").unwrap();
    // Pre-existing after="120" survives the line-spacing merge.
    assert_eq!(tree.get_attr(spacing, "w:after"), Some("120"));
    assert_eq!(tree.get_attr(spacing, "w:line"), Some("360"));
    assert_eq!(tree.get_attr(spacing, "w:lineRule"), Some("auto"));
}

#[test]
fn bibliography_normalized_deterministically() {
    let doc = build_docx(DOCUMENT_XML);
    let out = format_document(
        &doc,
        &FormattingRules::default(),
        &classifications(),
        &bibliography(),
    )
    .unwrap();

    let tree = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();
    let document = tree.root_element().unwrap();
    let body = tree.find_child(document, "w:body").unwrap();
    let bib = tree.find_children(body, "w:p")[3];
    let text = tree.get_text(bib);

    assert!(text.contains("И.\u{a0}И."), "initials NBSP missing: {text}");
    assert!(text.contains("«Наука»"), "angular quotes missing: {text}");
    assert!(text.contains("10\u{a0}мм"), "unit NBSP missing: {text}");
    assert!(text.contains('\u{2013}'), "en dash missing: {text}");
    assert!(!text.contains('\u{2014}'), "em dash survived: {text}");
}

#[test]
fn bibliography_renumbering_applies_requested_scheme() {
    let doc_xml = concat!(
        r#"<w:document xmlns:w="ns"><w:body>"#,
        r#"<w:p><w:r><w:t>3. Первая запись</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>Вторая запись</w:t></w:r></w:p>"#,
        r#"</w:body></w:document>"#,
    );
    let doc = build_docx(doc_xml);
    let mut rules = FormattingRules::default();
    rules.bibliography_numbering = Some(NumberingScheme::Bracket);
    let entries = vec![
        BibliographyEntry {
            paragraph_index: 0,
            raw_text: String::new(),
            language: Language::Ru,
        },
        BibliographyEntry {
            paragraph_index: 1,
            raw_text: String::new(),
            language: Language::Ru,
        },
    ];
    let out = format_document(&doc, &rules, &[], &entries).unwrap();

    let tree = XmlTree::parse(&extract(&out, "word/document.xml")).unwrap();
    let document = tree.root_element().unwrap();
    let body = tree.find_child(document, "w:body").unwrap();
    let paragraphs = tree.find_children(body, "w:p");
    assert_eq!(tree.get_text(paragraphs[0]), "[1] Первая запись");
    assert_eq!(tree.get_text(paragraphs[1]), "[2] Вторая запись");
}

#[test]
fn out_of_range_inputs_never_fail_the_pipeline() {
    let doc = build_docx(DOCUMENT_XML);
    let wild = vec![
        Classification {
            paragraph_index: 4000,
            block_type: BlockType::BodyText,
        },
        Classification {
            paragraph_index: 0,
            block_type: BlockType::Heading1,
        },
    ];
    let stale_bib = vec![BibliographyEntry {
        paragraph_index: 999,
        raw_text: String::new(),
        language: Language::Unset,
    }];
    assert!(format_document(&doc, &FormattingRules::default(), &wild, &stale_bib).is_ok());
}

#[test]
fn corrupt_document_xml_is_fatal() {
    let doc = build_docx("<w:document><w:body><w:p></w:document>");
    assert!(format_document(&doc, &FormattingRules::default(), &[], &[]).is_err());
}

#[test]
fn loader_counts_paragraphs_like_the_classifier() {
    let doc = build_docx(DOCUMENT_XML);
    let formatter = DocxFormatter::load(&doc).unwrap();
    // Four top-level paragraphs; the table-nested one is excluded.
    assert_eq!(formatter.paragraphs().len(), 4);
}

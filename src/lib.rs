pub mod docx;

pub use docx::{
    format_document, BibliographyEntry, BlockType, Classification, DocxError, DocxFormatter,
    FormattingRules, Language, NumberingScheme,
};

//! Error types for the .docx formatting engine

/// Errors that can occur while loading, mutating or repacking a document.
///
/// Everything here is fatal for the transformation as a whole: the archive
/// cannot be opened, a required part is missing, or the document XML is
/// structurally broken. Recoverable conditions (out-of-range paragraph
/// index, skipped block types) never surface as errors; they are logged and
/// skipped inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed XML: {0}")]
    MalformedXml(String),
    #[error("Package part not found: {0}")]
    PartNotFound(String),
    #[error("Document body not found in word/document.xml")]
    MissingBody,
}

impl From<quick_xml::Error> for DocxError {
    fn from(err: quick_xml::Error) -> Self {
        DocxError::MalformedXml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DocxError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DocxError::MalformedXml(err.to_string())
    }
}

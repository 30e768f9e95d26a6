//! Error types for document text extraction.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during document text extraction.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to load the PDF or interpret a page.
    #[error("PDF parsing error: {0}")]
    PdfParseError(String),

    /// Failed to parse the DOCX document structure.
    #[error("DOCX parsing error: {0}")]
    DocxParseError(String),

    /// ZIP archive error (for DOCX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for DOCX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// License key missing, malformed, or conflicting.
    #[error("License error: {0}")]
    LicenseError(String),

    /// Text content was not valid in the expected encoding.
    #[error("Encoding error: {0}")]
    EncodingError(String),
}

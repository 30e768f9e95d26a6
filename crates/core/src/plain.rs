//! Plain-text reader.

use crate::error::{Error, Result};
use crate::types::{Document, DocumentFormat, ExtractedPage};
use std::io::Read;

/// Reads a UTF-8 text file verbatim into a single-page document.
pub struct PlainTextReader;

impl PlainTextReader {
    /// Create a new plain-text reader.
    pub fn new() -> Self {
        Self
    }

    /// Read the whole input. The content is stored as one line, unmodified.
    pub fn parse<R: Read>(&self, mut reader: R, filename: &str) -> Result<Document> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let content = String::from_utf8(bytes)
            .map_err(|e| Error::EncodingError(format!("{} is not valid UTF-8: {}", filename, e)))?;

        log::debug!("Read {} bytes of plain text from {}", content.len(), filename);

        let mut document = Document::new(filename, DocumentFormat::Txt);
        document.add_page(ExtractedPage::with_lines(1, vec![content]));
        Ok(document)
    }
}

impl Default for PlainTextReader {
    fn default() -> Self {
        Self::new()
    }
}

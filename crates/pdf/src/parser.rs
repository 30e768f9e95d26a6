//! PDF file parser implementation.

use crate::content::{extract_page_fragments_with, Granularity};
use doctext_core::{Document, DocumentFormat, Error, ExtractedPage, Result, RunMerger};
use std::io::Read;

/// Parser for PDF files.
pub struct PdfParser {
    merger: RunMerger,
    granularity: Granularity,
}

impl PdfParser {
    /// Create a new PDF parser with the default merger.
    pub fn new() -> Self {
        Self {
            merger: RunMerger::new(),
            granularity: Granularity::String,
        }
    }

    /// Set what a single fragment covers before merging.
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Use a custom fragment merger.
    pub fn with_merger(mut self, merger: RunMerger) -> Self {
        self.merger = merger;
        self
    }

    /// Parse a PDF file from a reader.
    ///
    /// Each page's fragments are merged independently.
    pub fn parse<R: Read>(&self, reader: R, filename: &str) -> Result<Document> {
        let pdf = lopdf::Document::load_from(reader)
            .map_err(|e| Error::PdfParseError(format!("Failed to load PDF: {}", e)))?;

        if pdf.is_encrypted() {
            return Err(Error::PdfParseError(format!("{} is encrypted", filename)));
        }

        let mut document = Document::new(filename, DocumentFormat::Pdf);

        for (number, page_id) in pdf.get_pages() {
            let fragments = extract_page_fragments_with(&pdf, page_id, self.granularity)?;
            let lines = self.merger.merge(&fragments);
            log::debug!(
                "Page {}: {} fragments merged into {} lines",
                number,
                fragments.len(),
                lines.len()
            );
            document.add_page(ExtractedPage::with_lines(number as usize, lines));
        }

        Ok(document)
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

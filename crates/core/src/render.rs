//! Plain-text rendering of extracted documents.
//!
//! PDF and DOCX lines are each terminated by a newline and pages are
//! concatenated with nothing in between. Plain-text documents pass through
//! unchanged.

use crate::types::{Document, DocumentFormat};
use unicode_normalization::UnicodeNormalization;

/// Renders a [`Document`] as text.
#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    /// Apply Unicode NFC normalization to the output.
    nfc: bool,
}

impl TextRenderer {
    /// Create a renderer with no normalization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to compose the output to Unicode NFC.
    pub fn with_nfc(mut self, nfc: bool) -> Self {
        self.nfc = nfc;
        self
    }

    /// Render the document.
    pub fn render(&self, document: &Document) -> String {
        let text = match document.format {
            DocumentFormat::Txt => document.all_lines().concat(),
            DocumentFormat::Pdf | DocumentFormat::Docx => {
                let mut out = String::new();
                for line in document.all_lines() {
                    out.push_str(line);
                    out.push('\n');
                }
                out
            }
        };

        if self.nfc {
            text.nfc().collect()
        } else {
            text
        }
    }
}

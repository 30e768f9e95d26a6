//! Domain types for representing extracted document content.

use serde::{Deserialize, Serialize};

/// Represents an entire document with its extracted content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: DocumentFormat,

    /// Pages in document order. DOCX and plain-text documents have a single page.
    pub pages: Vec<ExtractedPage>,
}

impl Document {
    /// Create a new document with the given filename and format.
    pub fn new(filename: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            pages: Vec::new(),
        }
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: ExtractedPage) {
        self.pages.push(page);
    }

    /// Get all lines from all pages, flattened.
    pub fn all_lines(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(String::as_str))
            .collect()
    }
}

/// The format of the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Word document (Office Open XML).
    Docx,
    /// Plain text.
    Txt,
}

impl DocumentFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    ///
    /// Plain text has no signature and is only detected by extension.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        // DOCX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Docx);
        }

        None
    }

    /// Upper-case label used in output headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Txt => "TXT",
        }
    }
}

/// A single extracted page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// 1-based page number.
    pub number: usize,

    /// Logical lines in reading order.
    pub lines: Vec<String>,
}

impl ExtractedPage {
    /// Create a new page with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            lines: Vec::new(),
        }
    }

    /// Create a page holding the given lines.
    pub fn with_lines(number: usize, lines: Vec<String>) -> Self {
        Self { number, lines }
    }

    /// Add a line to this page.
    pub fn add_line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }
}

/// One styled piece of text as shown by a PDF content stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Decoded text.
    pub content: String,

    /// Base font name.
    pub font: String,

    /// Rendered font size.
    pub font_size: f64,

    /// X position of the text origin.
    pub x: f64,

    /// Y position of the text origin.
    pub y: f64,
}

impl TextFragment {
    /// Create a new fragment.
    pub fn new(
        content: impl Into<String>,
        font: impl Into<String>,
        font_size: f64,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            content: content.into(),
            font: font.into(),
            font_size,
            x,
            y,
        }
    }

    /// Whether `other` continues the same run: identical font, size and position.
    ///
    /// Content is ignored and floats are compared exactly.
    pub fn is_same_sentence(&self, other: &TextFragment) -> bool {
        self.font == other.font
            && self.font_size == other.font_size
            && self.x == other.x
            && self.y == other.y
    }
}

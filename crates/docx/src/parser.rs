//! DOCX file parser implementation.

use doctext_core::{require_license, Document, DocumentFormat, Error, ExtractedPage, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Main document part inside the package.
const DOCUMENT_PART: &str = "word/document.xml";

/// Parser for DOCX (Office Open XML) files.
pub struct DocxParser;

impl DocxParser {
    /// Create a new DOCX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a DOCX file from a reader.
    ///
    /// Fails if no license key has been installed.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Document> {
        let license = require_license()?;
        log::debug!("Opening {} under license for {}", filename, license.customer());

        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let content = self.read_file_from_archive(&mut archive, DOCUMENT_PART)?;
        let paragraphs = self.extract_paragraphs_from_xml(&content)?;
        log::debug!("Found {} paragraphs in {}", paragraphs.len(), filename);

        let mut document = Document::new(filename, DocumentFormat::Docx);
        document.add_page(ExtractedPage::with_lines(1, paragraphs));
        Ok(document)
    }

    /// Extract paragraph texts, in document order, from the main document XML.
    fn extract_paragraphs_from_xml(&self, xml_content: &str) -> Result<Vec<String>> {
        let mut paragraphs = Vec::new();
        let mut reader = Reader::from_str(xml_content);
        reader.trim_text(false);

        // Text boxes nest paragraphs inside paragraphs.
        let mut open: Vec<String> = Vec::new();
        let mut in_text = false;
        // Depth inside mc:Fallback, which repeats mc:Choice content.
        let mut fallback_depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Fallback" => fallback_depth += 1,
                        _ if fallback_depth > 0 => {}
                        b"p" => open.push(String::new()),
                        b"t" => in_text = true,
                        b"tab" => push_text(&mut open, "\t"),
                        b"br" | b"cr" => push_text(&mut open, "\n"),
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if fallback_depth > 0 {
                        continue;
                    }
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"p" => paragraphs.push(String::new()),
                        b"tab" => push_text(&mut open, "\t"),
                        b"br" | b"cr" => push_text(&mut open, "\n"),
                        _ => {}
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if in_text && fallback_depth == 0 {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                        push_text(&mut open, &text);
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
                        _ if fallback_depth > 0 => {}
                        b"t" => in_text = false,
                        b"p" => {
                            if let Some(paragraph) = open.pop() {
                                paragraphs.push(paragraph);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing {} at position {}: {}",
                        DOCUMENT_PART,
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(Error::DocxParseError(format!(
                "{} unclosed paragraph(s) in {}",
                open.len(),
                DOCUMENT_PART
            )));
        }

        Ok(paragraphs)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for DocxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Append text to the innermost open paragraph. Text outside any paragraph is ignored.
fn push_text(open: &mut [String], text: &str) {
    if let Some(paragraph) = open.last_mut() {
        paragraph.push_str(text);
    }
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

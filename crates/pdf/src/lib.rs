//! PDF backend for document text extraction.
//!
//! Loads PDFs with `lopdf`, walks each page's content stream to collect
//! styled text fragments, and merges them into lines.

pub mod content;
pub mod parser;

pub use content::{extract_page_fragments, extract_page_fragments_with, Granularity};
pub use parser::PdfParser;

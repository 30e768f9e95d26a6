//! DOCX (Office Open XML) backend for document text extraction.
//!
//! Parses .docx files which are ZIP archives containing XML documents.

pub mod parser;

pub use parser::DocxParser;

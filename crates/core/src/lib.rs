//! Core domain types, text run merging, license gating, and rendering
//! for document text extraction.

pub mod error;
pub mod license;
pub mod merge;
pub mod plain;
pub mod render;
pub mod types;

pub use error::{Error, Result};
pub use license::{get_license_key, require_license, set_license_key, LicenseKey};
pub use merge::{merge, FinalFlush, RunMerger, SentinelMode};
pub use plain::PlainTextReader;
pub use render::TextRenderer;
pub use types::{Document, DocumentFormat, ExtractedPage, TextFragment};

//! DOCX reading without an installed license key.
//!
//! Kept in its own test binary: the license key is process-wide and the
//! unit tests install one.

use doctext_core::{get_license_key, Error};
use doctext_docx::DocxParser;
use std::io::Cursor;

#[test]
fn test_parse_fails_fast_without_license() {
    assert!(get_license_key().is_none());

    // The archive is never opened, so its contents do not matter.
    let result = DocxParser::new().parse(Cursor::new(b"PK\x03\x04".to_vec()), "try.docx");
    assert!(matches!(result, Err(Error::LicenseError(_))));
}

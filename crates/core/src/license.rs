//! Process-wide license key.
//!
//! The key must be installed with [`set_license_key`] before any backend
//! that checks it is used. Installation happens at most once per process.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::{LazyLock, OnceLock};

/// Armored key block: BEGIN marker, body, END marker.
///
/// The two marker labels are compared after matching.
static ARMORED_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)-----BEGIN (?P<begin>[A-Z ]*?)LICENSE KEY-----\s*(?P<body>.*?)\s*-----END (?P<end>[A-Z ]*?)LICENSE KEY-----",
    )
    .unwrap()
});

static HEX_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]+$").unwrap());

static LICENSE: OnceLock<LicenseKey> = OnceLock::new();

/// A parsed offline license key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseKey {
    customer: String,
    key: String,
}

impl LicenseKey {
    /// Parse an armored key block issued to `customer`.
    pub fn parse(armored: &str, customer: &str) -> Result<Self> {
        let customer = customer.trim();
        if customer.is_empty() {
            return Err(Error::LicenseError("customer name is empty".to_string()));
        }

        let caps = ARMORED_KEY_REGEX
            .captures(armored)
            .ok_or_else(|| Error::LicenseError("missing BEGIN/END key markers".to_string()))?;

        if caps["begin"] != caps["end"] {
            return Err(Error::LicenseError(format!(
                "END marker '{}LICENSE KEY' does not match BEGIN marker '{}LICENSE KEY'",
                &caps["end"], &caps["begin"]
            )));
        }

        let key: String = caps["body"].split_whitespace().collect();
        if key.is_empty() {
            return Err(Error::LicenseError("key body is empty".to_string()));
        }
        if !HEX_REGEX.is_match(&key) {
            return Err(Error::LicenseError(
                "key body is not hexadecimal".to_string(),
            ));
        }

        Ok(Self {
            customer: customer.to_string(),
            key: key.to_lowercase(),
        })
    }

    /// The customer the key was issued to.
    pub fn customer(&self) -> &str {
        &self.customer
    }

    /// Short prefix of the key for display.
    pub fn fingerprint(&self) -> &str {
        &self.key[..self.key.len().min(8)]
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (key {}...)", self.customer, self.fingerprint())
    }
}

/// Install the process-wide license key.
///
/// Installing the same key again is a no-op. Installing a different key
/// after one is set fails.
pub fn set_license_key(armored: &str, customer: &str) -> Result<&'static LicenseKey> {
    let parsed = LicenseKey::parse(armored, customer)?;
    let installed = LICENSE.get_or_init(|| parsed.clone());

    if *installed != parsed {
        return Err(Error::LicenseError(format!(
            "a different license key is already installed for {}",
            installed.customer
        )));
    }

    log::debug!("License key installed for {}", installed.customer);
    Ok(installed)
}

/// The installed license key, if any.
pub fn get_license_key() -> Option<&'static LicenseKey> {
    LICENSE.get()
}

/// The installed license key, or an error if none was installed.
pub fn require_license() -> Result<&'static LicenseKey> {
    get_license_key().ok_or_else(|| {
        Error::LicenseError("no license key installed; call set_license_key first".to_string())
    })
}

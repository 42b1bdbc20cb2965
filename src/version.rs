//! Classifying the bundled Commons Text release.
//!
//! `StringLookupFactory` gained `base64StringLookup` in 1.5 and
//! `defaultStringLookups` in 1.10, where the dangerous lookups stopped being
//! enabled by default. Looking for those member names is enough to place a
//! build in one of three ranges.

use std::fmt;

use tracing::{debug, warn};

use crate::jar_utils::Container;

const FACTORY_CLASS: &str = "StringLookupFactory.class";
const FIXED_MARKER: &[u8] = b"defaultStringLookups";
const VULNERABLE_MARKER: &[u8] = b"base64StringLookup";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommonsTextVersion {
    NotFound,
    /// 1.4 or below, before the script lookup existed.
    Legacy,
    /// 1.5 through 1.9.
    Vulnerable,
    /// 1.10 or above.
    Fixed,
}

impl CommonsTextVersion {
    pub fn is_vulnerable(self) -> bool {
        self == CommonsTextVersion::Vulnerable
    }

    /// Classify the bytes of a `StringLookupFactory` class.
    pub fn from_factory_class(class_bytes: &[u8]) -> Self {
        if contains(class_bytes, FIXED_MARKER) {
            CommonsTextVersion::Fixed
        } else if contains(class_bytes, VULNERABLE_MARKER) {
            CommonsTextVersion::Vulnerable
        } else {
            CommonsTextVersion::Legacy
        }
    }
}

impl fmt::Display for CommonsTextVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommonsTextVersion::NotFound => f.write_str("not found"),
            CommonsTextVersion::Legacy => f.write_str("fixed 1.4 or below"),
            CommonsTextVersion::Vulnerable => f.write_str("vulnerable 1.5 .. 1.9"),
            CommonsTextVersion::Fixed => f.write_str("fixed 1.10 or above"),
        }
    }
}

/// Probe `container` for a Commons Text `StringLookupFactory`.
///
/// When several copies are bundled the last one in archive order decides.
pub fn detect_commons_text(container: &Container) -> CommonsTextVersion {
    let mut version = CommonsTextVersion::NotFound;
    for name in container.entry_names().filter(|n| n.ends_with(FACTORY_CLASS)) {
        if version != CommonsTextVersion::NotFound {
            warn!(
                archive = %container.path().display(),
                entry = name,
                "archive contains multiple copies of {}; version may be wrong",
                FACTORY_CLASS
            );
        }
        match container.lookup(name) {
            Ok(bytes) => {
                version = CommonsTextVersion::from_factory_class(&bytes);
                debug!(entry = name, %version, "classified factory class");
            }
            Err(e) => warn!(entry = name, error = %e, "cannot read factory class"),
        }
    }
    version
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

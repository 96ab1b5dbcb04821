//! Content fingerprinting for result records.
//!
//! Two records are "the same logical item" across snapshots iff their
//! fingerprints are equal. The key is a deterministic concatenation of the
//! identity quadruple; there is no fuzzy matching.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ResultRecord;

/// Separator between the quadruple fields.
const SEPARATOR: char = '|';

/// How many characters of the description participate in the key.
///
/// Truncating keeps the key robust to trailing punctuation and whitespace
/// drift in long descriptions.
pub const DESCRIPTION_PREFIX_LEN: usize = 48;

/// A stable content key derived from a result record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the fingerprint of a record.
///
/// The key is `name|title|date|description-prefix`, with the description
/// truncated to [`DESCRIPTION_PREFIX_LEN`] characters. Fields outside the
/// quadruple never influence the key.
#[must_use]
pub fn fingerprint(record: &ResultRecord) -> Fingerprint {
    let prefix: String = record
        .description
        .chars()
        .take(DESCRIPTION_PREFIX_LEN)
        .collect();

    let mut key = String::with_capacity(
        record.name.len() + record.title.len() + record.date.len() + prefix.len() + 3,
    );
    key.push_str(&record.name);
    key.push(SEPARATOR);
    key.push_str(&record.title);
    key.push(SEPARATOR);
    key.push_str(&record.date);
    key.push(SEPARATOR);
    key.push_str(&prefix);

    Fingerprint(key)
}

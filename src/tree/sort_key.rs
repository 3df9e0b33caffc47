//! Sort-Key Codec
//!
//! Turns a display name into a key whose plain code-point order matches a
//! numeric-aware, case-insensitive collation of the names. Digit runs are
//! left-padded with zeros to [`SORT_KEY_DIGIT_WIDTH`], so `"file2"` sorts
//! before `"file10"`.
//!
//! Names are NFC-normalized before lower-casing, so a precomposed accent and
//! its decomposed form produce the same key. Accented letters still order
//! after their unaccented base letter.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Fixed width every digit run is padded to.
///
/// Runs longer than this cannot be ordered correctly and are rejected.
pub const SORT_KEY_DIGIT_WIDTH: usize = 32;

/// Derived ordering key for a node name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(String);

impl SortKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key that orders before every encoded name
    pub(crate) fn lowest() -> Self {
        SortKey(String::new())
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Encode a display name into its sort key.
///
/// Fails with `InvalidName` when a digit run exceeds [`SORT_KEY_DIGIT_WIDTH`].
pub fn encode(name: &str) -> Result<SortKey, ApiError> {
    let folded: String = name.nfc().collect::<String>().to_lowercase();
    let mut key = String::with_capacity(folded.len() + SORT_KEY_DIGIT_WIDTH);
    let mut run = String::new();

    for ch in folded.chars() {
        if ch.is_ascii_digit() {
            run.push(ch);
            continue;
        }
        flush_digit_run(&mut key, &mut run)?;
        key.push(ch);
    }
    flush_digit_run(&mut key, &mut run)?;

    Ok(SortKey(key))
}

fn flush_digit_run(key: &mut String, run: &mut String) -> Result<(), ApiError> {
    if run.is_empty() {
        return Ok(());
    }
    if run.len() > SORT_KEY_DIGIT_WIDTH {
        return Err(ApiError::InvalidName(format!(
            "digit run of {} digits exceeds the {}-digit limit",
            run.len(),
            SORT_KEY_DIGIT_WIDTH
        )));
    }
    key.extend(std::iter::repeat('0').take(SORT_KEY_DIGIT_WIDTH - run.len()));
    key.push_str(run);
    run.clear();
    Ok(())
}

/// Compare two sort keys. Identical keys are equal, anything else is
/// ordered by code point.
pub fn compare(a: &SortKey, b: &SortKey) -> Ordering {
    if a.0 == b.0 {
        return Ordering::Equal;
    }
    a.0.cmp(&b.0)
}

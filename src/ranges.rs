//! Batch-number ranges and the merged document's file name.

use std::fmt;
use std::path::Path;

/// Prefix of every merged document's file name.
pub const MERGED_NAME_PREFIX: &str = "Invoice+Specification";

/// A maximal run of consecutive numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeToken {
    pub start: i64,
    pub end: i64,
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Compress ascending `numbers` into range tokens in a single pass.
///
/// Repeated values are not collapsed: `[5, 5, 6]` yields `5` and `5-6`.
pub fn compress_ranges(numbers: &[i64]) -> Vec<RangeToken> {
    let mut tokens = Vec::new();
    let mut iter = numbers.iter().copied();

    let Some(first) = iter.next() else {
        return tokens;
    };

    let mut current = RangeToken { start: first, end: first };
    for n in iter {
        if current.end.checked_add(1) == Some(n) {
            current.end = n;
        } else {
            tokens.push(current);
            current = RangeToken { start: n, end: n };
        }
    }
    tokens.push(current);

    tokens
}

/// File name of the merged document for the given (unsorted) numbers,
/// e.g. `Invoice+Specification 2991-2993;2995.pdf`.
///
/// Returns `None` when there is nothing to name.
pub fn merged_file_name(numbers: &[i64]) -> Option<String> {
    if numbers.is_empty() {
        return None;
    }

    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();

    let joined = compress_ranges(&sorted)
        .iter()
        .map(RangeToken::to_string)
        .collect::<Vec<_>>()
        .join(";");

    Some(format!("{} {}.pdf", MERGED_NAME_PREFIX, joined))
}

/// All ASCII digits of the file name concatenated into one number.
///
/// Only used for PDFs whose batch number is not otherwise known;
/// `2991_invoice+specification.pdf` gives `2991`, `v2_7.pdf` gives `27`.
pub fn digits_in_file_name(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_string_lossy();
    let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

//! Filename tokenizer.
//!
//! Splits a file stem into `(prefix, value)` pairs, one per maximal run of
//! ASCII digits. The prefix is the run of ASCII letters that ends right where
//! the digit run starts; any other character (underscore, dash, dot, space)
//! breaks the letter run, so `img_t01` yields the prefix `t` and `img01`
//! yields `img`.

use std::path::Path;

/// Number of trailing digits kept when a digit run is longer than `i64` allows.
const MAX_VALUE_DIGITS: usize = 18;

/// A letter/digit pair extracted from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    /// Letters immediately preceding the digit run (may be empty)
    pub prefix: String,

    /// Numeric value of the digit run
    pub value: i64,
}

/// Tokenize a file stem (extension already removed).
///
/// The walk is left to right and deterministic; digit runs of any length are
/// accepted. Runs longer than 18 digits keep their last 18 digits.
pub fn tokenize(stem: &str) -> Vec<RawToken> {
    let bytes = stem.as_bytes();
    let mut tokens = Vec::new();
    let mut letters_start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }

            let prefix = letters_start.map(|s| &stem[s..start]).unwrap_or("");
            tokens.push(RawToken {
                prefix: prefix.to_string(),
                value: parse_digit_run(&stem[start..i]),
            });
            letters_start = None;
            continue;
        }

        if b.is_ascii_alphabetic() {
            letters_start.get_or_insert(i);
        } else {
            letters_start = None;
        }
        i += 1;
    }

    tokens
}

/// Remove every ASCII digit from `name`.
pub fn strip_digits(name: &str) -> String {
    name.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Split a path into `(stem, base)`.
///
/// `stem` is the file name without its last extension and is what gets
/// tokenized. `base` is the parent directory joined with the file name where
/// every digit run has been deleted; it is the grouping key for an
/// acquisition.
pub fn split_path(path: &str) -> (String, String) {
    let p = Path::new(path);

    let stem = p
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = p
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let base = match p.parent().map(|d| d.to_string_lossy()) {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir, strip_digits(&file_name)),
        _ => strip_digits(&file_name),
    };

    (stem, base)
}

fn parse_digit_run(digits: &str) -> i64 {
    let tail = &digits[digits.len().saturating_sub(MAX_VALUE_DIGITS)..];
    tail.bytes()
        .fold(0i64, |acc, d| acc * 10 + i64::from(d - b'0'))
}

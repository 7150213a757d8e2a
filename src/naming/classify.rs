//! Prefix → dimension classification.
//!
//! A chunk prefix is lower-cased and matched against fixed suffix tables.
//! The longest matching suffix wins, so `ypos` resolves to Y even though it
//! also ends with the series marker `s`. Ties (same suffix length) go to the
//! table tested first by the active [`ClassifierVariant`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dimension a filename chunk can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DimensionTag {
    /// Outermost grouping key (stage position, field, well...)
    Series,
    /// Horizontal tile index
    X,
    /// Vertical tile index
    Y,
    /// Focal plane
    Z,
    /// Time point
    T,
    /// Channel
    C,
}

impl DimensionTag {
    /// All tags, in the order constant chunks are cleaned.
    pub const CLEAN_ORDER: [DimensionTag; 6] = [
        DimensionTag::Series,
        DimensionTag::T,
        DimensionTag::Z,
        DimensionTag::C,
        DimensionTag::Y,
        DimensionTag::X,
    ];

    /// Single-letter name.
    pub const fn letter(&self) -> &'static str {
        match self {
            DimensionTag::Series => "S",
            DimensionTag::X => "X",
            DimensionTag::Y => "Y",
            DimensionTag::Z => "Z",
            DimensionTag::T => "T",
            DimensionTag::C => "C",
        }
    }
}

impl fmt::Display for DimensionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Which set of prefix tables is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassifierVariant {
    /// Z, T, C, then S. X/Y prefixes stay unclassified.
    Simple,
    /// S, X, Y, Z, T, C. Used for grouping unless asked otherwise.
    #[default]
    Full,
}

impl ClassifierVariant {
    fn tables(&self) -> &'static [(DimensionTag, &'static [&'static str])] {
        match self {
            ClassifierVariant::Simple => &[
                (DimensionTag::Z, Z_PREFIXES),
                (DimensionTag::T, T_PREFIXES),
                (DimensionTag::C, C_PREFIXES),
                (DimensionTag::Series, S_PREFIXES),
            ],
            ClassifierVariant::Full => &[
                (DimensionTag::Series, S_PREFIXES),
                (DimensionTag::X, X_PREFIXES),
                (DimensionTag::Y, Y_PREFIXES),
                (DimensionTag::Z, Z_PREFIXES),
                (DimensionTag::T, T_PREFIXES),
                (DimensionTag::C, C_PREFIXES),
            ],
        }
    }
}

const Z_PREFIXES: &[&str] = &["z", "zs", "sec", "fp", "focal", "focalplane", "plane", "slice"];
const T_PREFIXES: &[&str] = &["t", "tl", "tp", "time", "frame"];
const C_PREFIXES: &[&str] = &[
    "c",
    "ch",
    "channel",
    "band",
    "w",
    "wl",
    "wave",
    "wavelength",
];
const S_PREFIXES: &[&str] = &["s", "series", "sp", "f", "field", "pos", "position"];
const X_PREFIXES: &[&str] = &["x", "xpos", "posx", "col", "column", "tilex", "xtile"];
const Y_PREFIXES: &[&str] = &["y", "ypos", "posy", "row", "tiley", "ytile"];

/// Classify a chunk prefix.
///
/// Returns `None` when no table entry is a suffix of the lower-cased prefix.
pub fn classify_prefix(prefix: &str, variant: ClassifierVariant) -> Option<DimensionTag> {
    if prefix.is_empty() {
        return None;
    }
    let lower = prefix.to_ascii_lowercase();

    let mut best: Option<(DimensionTag, usize)> = None;
    for (tag, entries) in variant.tables() {
        for entry in entries.iter() {
            if !lower.ends_with(entry) {
                continue;
            }
            // `xpos`/`ypos` also end with the series marker `s`; without the
            // length rule they would classify as S under the full tables
            if best.map_or(true, |(_, len)| entry.len() > len) {
                best = Some((*tag, entry.len()));
            }
        }
    }

    best.map(|(tag, _)| tag)
}

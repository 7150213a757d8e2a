//! Filename parsing and dimension inference.
//!
//! ```text
//! "exp/img_t01_z005.tif"
//!        │
//!        ▼  tokenizer
//! [("t", 1), ("z", 5)]          base = "exp/img_t_z.tif"
//!        │
//!        ▼  classify
//! [T=1, Z=5]                    FilePosition
//!        │
//!        ▼  resolver (all files of one base)
//! constant chunks dropped, unknown chunks promoted, T/Z swap applied
//! ```

mod classify;
mod position;
mod resolver;
mod tokenizer;

pub use classify::{classify_prefix, ClassifierVariant, DimensionTag};
pub use position::{Chunk, FilePosition};
pub use resolver::{
    apply_tz_swap, chunk_from_unknown, clean_constant_chunks, clean_pass, promote_unknowns,
    PositionResolver, UnknownSlots, MAX_CLEAN_PASSES,
};
pub use tokenizer::{split_path, strip_digits, tokenize, RawToken};

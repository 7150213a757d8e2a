//! Concatenation of whole-file loads into in-memory sequences.
//!
//! Used for acquisitions that are not spatially tiled: every file is read
//! completely and its planes are appended to a growing sequence.

mod assembler;
mod sequence;

pub use assembler::{AssemblyOutcome, FailedLoad, SequenceAssembler};
pub use sequence::Sequence;

//! Grouping of resolved file positions into sequences.
//!
//! ```text
//! paths ──► GroupBuilder ──► inspect (HandlePool) ──► PositionResolver
//!                                                         │
//!                  ┌──────────────────────────────────────┘
//!                  ▼
//!        cluster by SequenceIdent ──► sort + compact ──► SequenceGroup
//! ```

mod builder;
mod compact;
mod sequence;

pub use builder::{GroupBuilder, GroupingOutcome, UnplacedFile};
pub use compact::{compact, first_difference, sort_positions, GridCoord, GridSize, AXIS_PRIORITY};
pub use sequence::{AssemblyEntry, GroupEntry, GroupSummary, SequenceGroup, SequenceIdent};

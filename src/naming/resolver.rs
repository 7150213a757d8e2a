//! Dimension resolution for files sharing one base name.
//!
//! Resolution runs in fixed steps, each producing a fresh list of positions:
//!
//! 1. drop chunks whose value is identical across every member (repeated to
//!    a fixed point, bounded by [`MAX_CLEAN_PASSES`])
//! 2. promote unclassified chunks to T, Z and C with [`chunk_from_unknown`]
//! 3. clean again, since promoted chunks may themselves be constant
//! 4. discard leftover unclassified chunks and duplicate tags (last wins)
//! 5. swap T and Z when the files' intrinsic shape contradicts the guess

use tracing::debug;

use crate::backend::ImageTypeSignature;

use super::classify::DimensionTag;
use super::position::FilePosition;

/// Upper bound on cleaning passes.
pub const MAX_CLEAN_PASSES: usize = 16;

// =============================================================================
// Unknown chunk promotion
// =============================================================================

/// Which of T, Z, C a file already labels, and how many chunks are unlabeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnknownSlots {
    pub has_t: bool,
    pub has_z: bool,
    pub has_c: bool,
    pub unknown_count: usize,
}

impl UnknownSlots {
    pub fn of(position: &FilePosition) -> Self {
        Self {
            has_t: position.has(DimensionTag::T),
            has_z: position.has(DimensionTag::Z),
            has_c: position.has(DimensionTag::C),
            unknown_count: position.unknown_count(),
        }
    }
}

/// Index of the unclassified chunk that should carry `request`.
///
/// Unlabeled numbers are assumed to appear as T, then Z, then C; each
/// dimension already labeled by a prefix frees one slot for the others.
/// Returns `None` when the file already labels `request`, when `request` is
/// not one of T/Z/C, or when there are not enough unknown chunks.
pub fn chunk_from_unknown(request: DimensionTag, slots: &UnknownSlots) -> Option<usize> {
    let index = match request {
        DimensionTag::T => {
            if slots.has_t {
                return None;
            }
            0
        }
        DimensionTag::Z => {
            if slots.has_z {
                return None;
            }
            if slots.has_t {
                0
            } else {
                1
            }
        }
        DimensionTag::C => {
            if slots.has_c {
                return None;
            }
            match (slots.has_t, slots.has_z) {
                (true, true) => 0,
                (true, false) | (false, true) => 1,
                (false, false) => 2,
            }
        }
        _ => return None,
    };

    (index < slots.unknown_count).then_some(index)
}

/// Promote unclassified chunks of one file according to [`chunk_from_unknown`].
pub fn promote_unknowns(position: &FilePosition) -> FilePosition {
    let slots = UnknownSlots::of(position);
    let assignments: Vec<(usize, DimensionTag)> = [DimensionTag::T, DimensionTag::Z, DimensionTag::C]
        .into_iter()
        .filter_map(|tag| chunk_from_unknown(tag, &slots).map(|idx| (idx, tag)))
        .collect();

    if assignments.is_empty() {
        return position.clone();
    }

    let mut unknown_idx = 0;
    let chunks = position
        .chunks
        .iter()
        .map(|chunk| {
            if chunk.dimension.is_some() {
                return chunk.clone();
            }
            let idx = unknown_idx;
            unknown_idx += 1;
            match assignments.iter().find(|(i, _)| *i == idx) {
                Some((_, tag)) => chunk.promoted(*tag),
                None => chunk.clone(),
            }
        })
        .collect();

    position.with_chunks(chunks)
}

// =============================================================================
// Constant chunk cleaning
// =============================================================================

/// One cleaning pass. Returns the new positions and whether anything changed.
///
/// For every tag (in [`DimensionTag::CLEAN_ORDER`]) and every occurrence
/// index of that tag, the occurrence is dropped from all members if each
/// member carries it with the same value.
pub fn clean_pass(positions: &[FilePosition]) -> (Vec<FilePosition>, bool) {
    let mut current = positions.to_vec();
    let mut changed = false;

    if current.len() < 2 {
        return (current, false);
    }

    for tag in DimensionTag::CLEAN_ORDER {
        let max_occ = current
            .iter()
            .map(|p| p.occurrences(tag).len())
            .max()
            .unwrap_or(0);

        for nth in (0..max_occ).rev() {
            let first = current[0].occurrences(tag).get(nth).copied();
            let Some(value) = first else {
                continue;
            };
            let constant = current
                .iter()
                .all(|p| p.occurrences(tag).get(nth) == Some(&value));

            if constant {
                debug!(%tag, nth, value, "dropping constant chunk");
                current = current
                    .iter()
                    .map(|p| p.without_occurrence(tag, nth))
                    .collect();
                changed = true;
            }
        }
    }

    (current, changed)
}

/// Repeat [`clean_pass`] until nothing changes.
pub fn clean_constant_chunks(positions: &[FilePosition]) -> Vec<FilePosition> {
    let mut current = positions.to_vec();
    for _ in 0..MAX_CLEAN_PASSES {
        let (next, changed) = clean_pass(&current);
        current = next;
        if !changed {
            break;
        }
    }
    current
}

// =============================================================================
// T/Z swap
// =============================================================================

/// Swap T and Z tags on every member when the intrinsic shape calls for it.
///
/// If the files hold several Z planes but a single T (or the reverse) and
/// the filenames carry only one of the two axes, that guessed axis is moved
/// onto the dimension the files already extend along internally. Nothing
/// changes when any involved chunk carries an explicit prefix label.
pub fn apply_tz_swap(
    positions: &[FilePosition],
    signature: Option<&ImageTypeSignature>,
) -> Vec<FilePosition> {
    let Some(sig) = signature else {
        return positions.to_vec();
    };

    let z_multi = sig.size_z > 1;
    let t_multi = sig.size_t > 1;
    if z_multi == t_multi {
        return positions.to_vec();
    }

    // Tag currently carried by the filename axis that should be renamed.
    let (from, to) = if z_multi {
        (DimensionTag::T, DimensionTag::Z)
    } else {
        (DimensionTag::Z, DimensionTag::T)
    };

    let free_to_change = |tag: DimensionTag| {
        positions
            .iter()
            .filter_map(|p| p.chunk(tag))
            .all(|c| c.inferred)
    };
    let has_from = positions.iter().any(|p| p.has(from));
    let has_to = positions.iter().any(|p| p.has(to));

    // Two filename axes keep the T-then-Z promotion order
    if !has_from || has_to || !free_to_change(from) || !free_to_change(to) {
        return positions.to_vec();
    }

    debug!(%from, %to, "swapping guessed T/Z chunks");
    positions
        .iter()
        .map(|p| {
            let chunks = p
                .chunks
                .iter()
                .map(|c| match c.dimension {
                    Some(tag) if tag == from => c.retagged(to),
                    Some(tag) if tag == to => c.retagged(from),
                    _ => c.clone(),
                })
                .collect();
            p.with_chunks(chunks)
        })
        .collect()
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves the dimensions of all files sharing one base name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionResolver;

impl PositionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Run the full resolution pipeline.
    ///
    /// `signature` is the intrinsic shape of a representative file and only
    /// feeds the T/Z swap heuristic.
    pub fn resolve(
        &self,
        positions: &[FilePosition],
        signature: Option<&ImageTypeSignature>,
    ) -> Vec<FilePosition> {
        let cleaned = clean_constant_chunks(positions);
        let promoted: Vec<FilePosition> = cleaned.iter().map(promote_unknowns).collect();
        let cleaned = clean_constant_chunks(&promoted);
        let deduped: Vec<FilePosition> = cleaned.iter().map(FilePosition::keep_last).collect();
        apply_tz_swap(&deduped, signature)
    }
}

//! Sequence groups: one coherent acquisition assembled from many files.
//!
//! A [`SequenceGroup`] owns its members in sorted order together with their
//! compacted grid coordinates and a dense cell table. The cell table is
//! addressed by
//!
//! ```text
//! index = x + y * ind_y_mul + z * ind_z_mul + t * ind_t_mul + c * ind_c_mul
//! ```
//!
//! where the multipliers are running products of the outer grid sizes in
//! X, Y, Z, T, C order.

use serde::Serialize;
use tracing::warn;

use crate::backend::ImageTypeSignature;
use crate::error::IrregularGrouping;
use crate::naming::FilePosition;

use super::compact::{compact, sort_positions, GridCoord, GridSize};

// =============================================================================
// Sequence Identity
// =============================================================================

/// Grouping key shared by every file of one acquisition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceIdent {
    /// Directory + filename with digit runs removed
    pub base: String,

    /// Value of the filename series chunk, if any survived resolution
    pub series: Option<i64>,

    /// Series index inside each file
    pub image_series: usize,

    /// Intrinsic shape of each file
    pub signature: ImageTypeSignature,
}

impl SequenceIdent {
    /// `true` when a file with identity `other` belongs to this sequence.
    pub fn matches(&self, other: &SequenceIdent) -> bool {
        self.base == other.base
            && self.series == other.series
            && self.image_series == other.image_series
            && self.signature.is_compatible(&other.signature)
    }
}

// =============================================================================
// Entries
// =============================================================================

/// A member file and its place in the outer grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub position: FilePosition,
    pub coord: GridCoord,
}

impl GroupEntry {
    pub fn path(&self) -> &str {
        &self.position.path
    }
}

/// One file of a linear loading stream, see
/// [`crate::assemble::SequenceAssembler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyEntry {
    pub path: String,

    /// Outer series (the group index within the batch)
    pub series: usize,

    /// Series index inside the file
    pub image_series: usize,

    pub t: u32,
    pub z: u32,
    pub c: u32,
}

// =============================================================================
// SequenceGroup
// =============================================================================

/// An immutable, compacted view of one acquisition.
#[derive(Debug, Clone)]
pub struct SequenceGroup {
    ident: SequenceIdent,
    entries: Vec<GroupEntry>,
    grid: GridSize,
    cells: Vec<Option<usize>>,
    ind_y_mul: usize,
    ind_z_mul: usize,
    ind_t_mul: usize,
    ind_c_mul: usize,
    irregular: Option<IrregularGrouping>,
}

impl SequenceGroup {
    /// Sort, compact and index the members of one sequence.
    pub fn build(ident: SequenceIdent, mut positions: Vec<FilePosition>) -> Self {
        sort_positions(&mut positions);
        let (coords, grid) = compact(&positions);

        let ind_y_mul = grid.x as usize;
        let ind_z_mul = ind_y_mul * grid.y as usize;
        let ind_t_mul = ind_z_mul * grid.z as usize;
        let ind_c_mul = ind_t_mul * grid.t as usize;

        let entries: Vec<GroupEntry> = positions
            .into_iter()
            .zip(coords)
            .map(|(position, coord)| GroupEntry { position, coord })
            .collect();

        let mut group = Self {
            ident,
            entries: Vec::new(),
            grid,
            cells: vec![None; grid.cells()],
            ind_y_mul,
            ind_z_mul,
            ind_t_mul,
            ind_c_mul,
            irregular: None,
        };

        let mut collisions = 0;
        for (i, entry) in entries.iter().enumerate() {
            let index = group.flat_index(&entry.coord);
            if let Some(previous) = group.cells[index].replace(i) {
                collisions += 1;
                warn!(
                    kept = %entry.position.path,
                    dropped = %entries[previous].position.path,
                    "two files map to the same grid cell"
                );
            }
        }
        group.entries = entries;

        if grid.cells() != group.entries.len() || collisions > 0 {
            let irregular = IrregularGrouping {
                cells: grid.cells(),
                files: group.entries.len(),
                collisions,
            };
            warn!(base = %group.ident.base, %irregular, "irregular file grouping");
            group.irregular = Some(irregular);
        }

        group
    }

    pub fn ident(&self) -> &SequenceIdent {
        &self.ident
    }

    pub fn signature(&self) -> &ImageTypeSignature {
        &self.ident.signature
    }

    /// Members in sorted order.
    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    /// Outer grid extent.
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn irregular(&self) -> Option<&IrregularGrouping> {
        self.irregular.as_ref()
    }

    /// `true` when files are laid out side by side in X or Y.
    pub fn is_tiled(&self) -> bool {
        self.grid.x > 1 || self.grid.y > 1
    }

    /// Stitched width. All totals saturate at `u32::MAX`.
    pub fn total_size_x(&self) -> u32 {
        self.grid.x.saturating_mul(self.ident.signature.size_x)
    }

    pub fn total_size_y(&self) -> u32 {
        self.grid.y.saturating_mul(self.ident.signature.size_y)
    }

    pub fn total_size_z(&self) -> u32 {
        self.grid.z.saturating_mul(self.ident.signature.size_z)
    }

    pub fn total_size_t(&self) -> u32 {
        self.grid.t.saturating_mul(self.ident.signature.size_t)
    }

    pub fn total_size_c(&self) -> u32 {
        self.grid.c.saturating_mul(self.ident.signature.size_c)
    }

    /// Index multipliers for Y, Z, T and C.
    pub fn multipliers(&self) -> (usize, usize, usize, usize) {
        (self.ind_y_mul, self.ind_z_mul, self.ind_t_mul, self.ind_c_mul)
    }

    /// Flattened cell index of an outer grid coordinate.
    pub fn flat_index(&self, coord: &GridCoord) -> usize {
        coord.x as usize
            + coord.y as usize * self.ind_y_mul
            + coord.z as usize * self.ind_z_mul
            + coord.t as usize * self.ind_t_mul
            + coord.c as usize * self.ind_c_mul
    }

    /// Member occupying an outer grid cell.
    pub fn entry_at(&self, coord: &GridCoord) -> Option<&GroupEntry> {
        if !self.grid.contains(coord) {
            return None;
        }
        let index = self.flat_index(coord);
        self.cells[index].map(|i| &self.entries[i])
    }

    /// File at an outer grid coordinate.
    pub fn path_at(&self, x: u32, y: u32, z: u32, t: u32, c: u32) -> Option<&str> {
        self.entry_at(&GridCoord::new(x, y, z, t, c))
            .map(GroupEntry::path)
    }

    /// File holding global plane `(z, t, c)`.
    ///
    /// For tiled groups this is the first populated tile of the slice,
    /// scanning rows top to bottom.
    pub fn path(&self, z: u32, t: u32, c: u32) -> Option<&str> {
        let sig = &self.ident.signature;
        if z >= self.total_size_z() || t >= self.total_size_t() || c >= self.total_size_c() {
            return None;
        }
        let (oz, ot, oc) = (z / sig.size_z, t / sig.size_t, c / sig.size_c);
        (0..self.grid.y)
            .flat_map(|y| (0..self.grid.x).map(move |x| (x, y)))
            .find_map(|(x, y)| self.path_at(x, y, oz, ot, oc))
    }

    /// Populated cell closest to the middle of the Z and T range.
    pub fn thumbnail_cell(&self) -> Option<GridCoord> {
        let (mid_z, mid_t) = (self.grid.z / 2, self.grid.t / 2);
        self.cells
            .iter()
            .flatten()
            .map(|&i| self.entries[i].coord)
            .min_by_key(|coord| (coord.z.abs_diff(mid_z) + coord.t.abs_diff(mid_t), coord.c, coord.y, coord.x))
    }

    /// Linear loading stream over the populated cells, in sorted order.
    ///
    /// `series` tags every entry so streams of different groups never
    /// concatenate.
    pub fn assembly_entries(&self, series: usize) -> Vec<AssemblyEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, entry)| self.cells[self.flat_index(&entry.coord)] == Some(*i))
            .map(|(_, entry)| AssemblyEntry {
                path: entry.position.path.clone(),
                series,
                image_series: self.ident.image_series,
                t: entry.coord.t,
                z: entry.coord.z,
                c: entry.coord.c,
            })
            .collect()
    }

    /// Serializable description of this group.
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            base: self.ident.base.clone(),
            series: self.ident.series,
            image_series: self.ident.image_series,
            files: self.entries.len(),
            grid: self.grid,
            size_x: self.total_size_x(),
            size_y: self.total_size_y(),
            size_z: self.total_size_z(),
            size_t: self.total_size_t(),
            size_c: self.total_size_c(),
            tiled: self.is_tiled(),
            signature: self.ident.signature,
            irregular: self.irregular.clone(),
        }
    }
}

/// Descriptor of a group, as printed by the command-line tool.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub base: String,
    pub series: Option<i64>,
    pub image_series: usize,
    pub files: usize,
    pub grid: GridSize,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_t: u32,
    pub size_c: u32,
    pub tiled: bool,
    pub signature: ImageTypeSignature,
    pub irregular: Option<IrregularGrouping>,
}

// =============================================================================
// Tests
// =============================================================================

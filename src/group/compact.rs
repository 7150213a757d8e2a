//! Index compaction.
//!
//! Turns the raw chunk values of a sorted group into dense, gap-free outer
//! grid coordinates. Consecutive files are compared axis by axis in
//! [`AXIS_PRIORITY`] order; the first differing axis advances and every lower
//! priority axis restarts at 0. Files whose chunks show no difference at all
//! advance along T, so unpatterned names become a flat time series.

use serde::Serialize;

use crate::naming::{DimensionTag, FilePosition};

/// Comparison order when looking for the axis of first difference.
pub const AXIS_PRIORITY: [DimensionTag; 5] = [
    DimensionTag::T,
    DimensionTag::Z,
    DimensionTag::C,
    DimensionTag::Y,
    DimensionTag::X,
];

/// Sort order of group members.
const SORT_ORDER: [DimensionTag; 6] = [
    DimensionTag::Series,
    DimensionTag::T,
    DimensionTag::Z,
    DimensionTag::C,
    DimensionTag::Y,
    DimensionTag::X,
];

/// Position of a file in the outer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub t: u32,
    pub c: u32,
}

impl GridCoord {
    pub const fn new(x: u32, y: u32, z: u32, t: u32, c: u32) -> Self {
        Self { x, y, z, t, c }
    }

    pub fn get(&self, axis: DimensionTag) -> u32 {
        match axis {
            DimensionTag::X => self.x,
            DimensionTag::Y => self.y,
            DimensionTag::Z => self.z,
            DimensionTag::T => self.t,
            DimensionTag::C => self.c,
            DimensionTag::Series => 0,
        }
    }

    fn set(&mut self, axis: DimensionTag, value: u32) {
        match axis {
            DimensionTag::X => self.x = value,
            DimensionTag::Y => self.y = value,
            DimensionTag::Z => self.z = value,
            DimensionTag::T => self.t = value,
            DimensionTag::C => self.c = value,
            DimensionTag::Series => {}
        }
    }
}

/// Outer grid extent per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub t: u32,
    pub c: u32,
}

impl GridSize {
    /// A 1×1×1×1×1 grid.
    pub const UNIT: GridSize = GridSize {
        x: 1,
        y: 1,
        z: 1,
        t: 1,
        c: 1,
    };

    /// Number of cells.
    pub fn cells(&self) -> usize {
        self.x as usize * self.y as usize * self.z as usize * self.t as usize * self.c as usize
    }

    pub fn contains(&self, coord: &GridCoord) -> bool {
        coord.x < self.x && coord.y < self.y && coord.z < self.z && coord.t < self.t && coord.c < self.c
    }
}

/// Sort members by series, T, Z, C, Y, X.
///
/// Only axes present in every member take part, which keeps the order total
/// while an axis missing from some files exerts no ordering pressure. The
/// path breaks remaining ties.
pub fn sort_positions(positions: &mut [FilePosition]) {
    let shared: Vec<DimensionTag> = SORT_ORDER
        .into_iter()
        .filter(|tag| positions.iter().all(|p| p.has(*tag)))
        .collect();

    positions.sort_by(|a, b| {
        shared
            .iter()
            .map(|tag| a.value(*tag).cmp(&b.value(*tag)))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// First axis in [`AXIS_PRIORITY`] on which two files differ; T if none.
pub fn first_difference(prev: &FilePosition, next: &FilePosition) -> DimensionTag {
    AXIS_PRIORITY
        .into_iter()
        .find(|axis| prev.value(*axis) != next.value(*axis))
        .unwrap_or(DimensionTag::T)
}

/// Assign dense grid coordinates to sorted members.
///
/// Returns one coordinate per member and the resulting grid size
/// (`max + 1` per axis).
pub fn compact(sorted: &[FilePosition]) -> (Vec<GridCoord>, GridSize) {
    let mut coords = Vec::with_capacity(sorted.len());
    if sorted.is_empty() {
        return (coords, GridSize::UNIT);
    }

    let mut counter = GridCoord::default();
    let mut max = GridCoord::default();
    coords.push(counter);

    for pair in sorted.windows(2) {
        let axis = first_difference(&pair[0], &pair[1]);
        counter.set(axis, counter.get(axis) + 1);

        let rank = AXIS_PRIORITY.iter().position(|a| *a == axis).unwrap_or(0);
        for lower in &AXIS_PRIORITY[rank + 1..] {
            counter.set(*lower, 0);
        }

        for a in AXIS_PRIORITY {
            max.set(a, max.get(a).max(counter.get(a)));
        }
        coords.push(counter);
    }

    let size = GridSize {
        x: max.x + 1,
        y: max.y + 1,
        z: max.z + 1,
        t: max.t + 1,
        c: max.c + 1,
    };
    (coords, size)
}

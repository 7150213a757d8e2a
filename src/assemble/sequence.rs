//! In-memory multi-plane sequences.

use crate::backend::{ImageTypeSignature, PixelBuffer};

/// A loaded sequence of planes.
///
/// Planes are stored Z fastest, then T, then C. Cells that no file filled
/// are `None`.
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Outer series the sequence was built from
    pub series: usize,

    /// Series index inside the files
    pub image_series: usize,

    /// Shape of each contributing file
    pub signature: ImageTypeSignature,

    pub size_z: u32,
    pub size_t: u32,
    pub size_c: u32,

    /// Files that contributed, in load order
    pub paths: Vec<String>,

    pub planes: Vec<Option<PixelBuffer>>,
}

impl Sequence {
    pub fn size_x(&self) -> u32 {
        self.signature.size_x
    }

    pub fn size_y(&self) -> u32 {
        self.signature.size_y
    }

    pub fn plane_index(&self, z: u32, t: u32, c: u32) -> Option<usize> {
        if z >= self.size_z || t >= self.size_t || c >= self.size_c {
            return None;
        }
        let (sz, st) = (self.size_z as usize, self.size_t as usize);
        Some(z as usize + t as usize * sz + c as usize * sz * st)
    }

    /// Plane `(z, t, c)`, `None` when out of range or never loaded.
    pub fn plane(&self, z: u32, t: u32, c: u32) -> Option<&PixelBuffer> {
        self.plane_index(z, t, c)
            .and_then(|i| self.planes.get(i))
            .and_then(Option::as_ref)
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Number of cells with no plane.
    pub fn missing_planes(&self) -> usize {
        self.planes.iter().filter(|p| p.is_none()).count()
    }
}

//! Intrinsic image shape of a single file.

use serde::{Deserialize, Serialize};

/// Relative tolerance used when comparing physical pixel sizes.
const PHYSICAL_SIZE_TOLERANCE: f64 = 1e-6;

/// Sample storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PixelType {
    /// Size of one sample in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            PixelType::I8 | PixelType::U8 => 1,
            PixelType::I16 | PixelType::U16 => 2,
            PixelType::I32 | PixelType::U32 | PixelType::F32 => 4,
            PixelType::F64 => 8,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            PixelType::I8 => "int8",
            PixelType::U8 => "uint8",
            PixelType::I16 => "int16",
            PixelType::U16 => "uint16",
            PixelType::I32 => "int32",
            PixelType::U32 => "uint32",
            PixelType::F32 => "float32",
            PixelType::F64 => "float64",
        }
    }
}

/// Shape and type of the image content of one file (one series).
///
/// Two files can only belong to the same acquisition when their signatures
/// are compatible, see [`ImageTypeSignature::is_compatible`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageTypeSignature {
    /// Plane width in pixels (full resolution)
    pub size_x: u32,

    /// Plane height in pixels (full resolution)
    pub size_y: u32,

    /// Focal planes stored in the file
    pub size_z: u32,

    /// Time points stored in the file
    pub size_t: u32,

    /// Channels stored in the file
    pub size_c: u32,

    /// Sample type
    pub pixel_type: PixelType,

    /// Interleaved samples per pixel (3 for RGB)
    pub samples_per_pixel: u32,

    /// Physical pixel width
    pub pixel_size_x: f64,

    /// Physical pixel height
    pub pixel_size_y: f64,

    /// Physical distance between focal planes
    pub pixel_size_z: f64,

    /// Time between time points
    pub time_interval: f64,

    /// Number of resolution levels (1 = full resolution only)
    pub resolution_levels: u32,
}

impl ImageTypeSignature {
    /// Single-plane, single-sample signature with unit pixel sizes.
    pub fn plane(size_x: u32, size_y: u32, pixel_type: PixelType) -> Self {
        Self {
            size_x,
            size_y,
            size_z: 1,
            size_t: 1,
            size_c: 1,
            pixel_type,
            samples_per_pixel: 1,
            pixel_size_x: 1.0,
            pixel_size_y: 1.0,
            pixel_size_z: 1.0,
            time_interval: 0.0,
            resolution_levels: 1,
        }
    }

    /// Bytes per pixel across all interleaved samples.
    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_type.bytes() * self.samples_per_pixel as usize
    }

    /// Number of planes stored in the file, saturating at `u32::MAX`.
    pub fn plane_count(&self) -> u32 {
        self.size_z.saturating_mul(self.size_t).saturating_mul(self.size_c)
    }

    /// Plane size at a resolution level (each level halves both sides).
    pub fn size_at(&self, resolution: u32) -> (u32, u32) {
        let shift = resolution.min(31);
        ((self.size_x >> shift).max(1), (self.size_y >> shift).max(1))
    }

    /// Structural equality: sizes, sample layout and physical sizing match.
    pub fn is_compatible(&self, other: &ImageTypeSignature) -> bool {
        self.size_x == other.size_x
            && self.size_y == other.size_y
            && self.size_z == other.size_z
            && self.size_t == other.size_t
            && self.size_c == other.size_c
            && self.pixel_type == other.pixel_type
            && self.samples_per_pixel == other.samples_per_pixel
            && approx_eq(self.pixel_size_x, other.pixel_size_x)
            && approx_eq(self.pixel_size_y, other.pixel_size_y)
            && approx_eq(self.pixel_size_z, other.pixel_size_z)
            && approx_eq(self.time_interval, other.time_interval)
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= scale * PHYSICAL_SIZE_TOLERANCE
}

use serde::Serialize;
use thiserror::Error;

/// Errors reported by an image backend while opening or reading a file
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No decoder accepts this file
    #[error("Unsupported file {path}: {reason}")]
    Unsupported { path: String, reason: String },

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    NotFound(String),

    /// Low-level I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// File opened but its image metadata could not be extracted
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: String, message: String },

    /// Requested series index does not exist in the file
    #[error("Series {series} out of range for {path} ({count} available)")]
    InvalidSeries {
        path: String,
        series: usize,
        count: usize,
    },

    /// Requested plane or region lies outside the file
    #[error("Out of bounds read in {path}: {message}")]
    OutOfBounds { path: String, message: String },

    /// Pixel decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: String, message: String },
}

/// Errors that abort a grouping batch
#[derive(Debug, Clone, Error)]
pub enum GroupError {
    /// Every path of the batch was rejected by the backend
    #[error("No backend could open any of the {attempted} file(s)")]
    NoBackendForAnyFile { attempted: usize },

    /// The batch was empty
    #[error("No input paths given")]
    EmptyInput,
}

/// Errors returned by region and thumbnail reads on a stitched volume
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// Series index does not name a group of the batch
    #[error("Invalid series {series}: batch has {count} group(s)")]
    InvalidSeries { series: usize, count: usize },

    /// Resolution level not offered by the files of this group
    #[error("Invalid resolution {resolution}: files offer {levels} level(s)")]
    InvalidResolution { resolution: u32, levels: u32 },

    /// Plane index outside the total size along an axis
    #[error("Plane {axis}={index} out of range (size {size})")]
    PlaneOutOfRange {
        axis: &'static str,
        index: u32,
        size: u32,
    },

    /// Requested rectangle is empty or outside the volume
    #[error("Invalid region {x},{y} {width}x{height} for volume {max_width}x{max_height}")]
    InvalidRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    /// Stitched plane is wider or taller than `u32` pixel coordinates allow
    #[error("Volume {width}x{height} exceeds addressable size")]
    VolumeTooLarge { width: u64, height: u64 },

    /// Group has no populated cell at all
    #[error("Group has no readable file")]
    EmptyGroup,

    /// Backend failure while reading a tile
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Buffer could not be converted or resized
    #[error("Image conversion error: {message}")]
    Conversion { message: String },
}

/// Errors raised by the sequence assembler
#[derive(Debug, Clone, Error)]
pub enum AssembleError {
    /// Every entry of the stream failed to load
    #[error("None of the {attempted} file(s) could be loaded")]
    NothingLoaded { attempted: usize },
}

/// Why a file was left out of every group. Not fatal to the batch.
#[derive(Debug, Clone, Error)]
pub enum SkipReason {
    /// No backend accepted the file
    #[error("unsupported file: {0}")]
    UnsupportedFile(BackendError),

    /// The backend opened the file but its shape could not be read
    #[error("signature read failure: {0}")]
    SignatureReadFailure(BackendError),

    /// The same path appeared earlier in the batch
    #[error("duplicate path")]
    Duplicate,
}

/// A group whose file count does not fill its outer grid. The group remains
/// usable; some cells resolve to no file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("irregular grouping: {files} file(s) for a grid of {cells} cell(s), {collisions} collision(s)")]
pub struct IrregularGrouping {
    /// Product of the outer grid sizes
    pub cells: usize,

    /// Files in the group
    pub files: usize,

    /// Files that landed on an already occupied cell
    pub collisions: usize,
}

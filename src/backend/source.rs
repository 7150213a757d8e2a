//! ImageBackend trait for format-agnostic pixel access.
//!
//! The stitching engine never decodes pixels itself. Everything that touches
//! file contents goes through an [`ImageBackend`]: opening a path, reading the
//! intrinsic shape of each series, and reading a rectangle of one plane.
//!
//! Handles are opaque to the engine. They are created by [`ImageBackend::open`],
//! kept in a [`crate::backend::HandlePool`] between reads, and handed back to
//! [`ImageBackend::close`] when the pool evicts them.

use async_trait::async_trait;

use crate::error::BackendError;

use super::buffer::{PixelBuffer, Rect};
use super::signature::ImageTypeSignature;

// =============================================================================
// Region Request
// =============================================================================

/// A rectangle of one plane of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRequest {
    /// Series index inside the file
    pub series: usize,

    /// Resolution level (0 = full resolution)
    pub resolution: u32,

    /// Rectangle in the coordinates of that resolution level
    pub rect: Rect,

    /// Focal plane inside the file
    pub z: u32,

    /// Time point inside the file
    pub t: u32,

    /// Channel inside the file
    pub c: u32,
}

impl RegionRequest {
    /// Full-resolution request for a rectangle of plane `(z, t, c)` of series 0.
    pub fn new(rect: Rect, z: u32, t: u32, c: u32) -> Self {
        Self {
            series: 0,
            resolution: 0,
            rect,
            z,
            t,
            c,
        }
    }

    /// Whole plane `(z, t, c)` of a file with the given signature.
    pub fn full_plane(series: usize, signature: &ImageTypeSignature, z: u32, t: u32, c: u32) -> Self {
        Self {
            series,
            resolution: 0,
            rect: Rect::new(0, 0, signature.size_x, signature.size_y),
            z,
            t,
            c,
        }
    }

    pub fn with_series(mut self, series: usize) -> Self {
        self.series = series;
        self
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }
}

// =============================================================================
// ImageBackend Trait
// =============================================================================

/// Capability to open image files and read their pixels.
///
/// Implementations must be thread-safe; the engine may read tiles of
/// different files concurrently, but a single handle is only ever used by one
/// request at a time.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Open file state kept between reads.
    type Handle: Send + Sync + 'static;

    /// Open a file.
    ///
    /// # Errors
    ///
    /// [`BackendError::Unsupported`] when no decoder accepts the file,
    /// [`BackendError::NotFound`] or [`BackendError::Io`] for access failures.
    async fn open(&self, path: &str) -> Result<Self::Handle, BackendError>;

    /// Number of image series stored in the file.
    fn series_count(&self, handle: &Self::Handle) -> usize;

    /// Intrinsic shape of one series.
    async fn signature(
        &self,
        handle: &Self::Handle,
        series: usize,
    ) -> Result<ImageTypeSignature, BackendError>;

    /// Read a rectangle of one plane.
    ///
    /// The returned buffer covers exactly `request.rect`.
    async fn read_region(
        &self,
        handle: &Self::Handle,
        request: &RegionRequest,
    ) -> Result<PixelBuffer, BackendError>;

    /// Release resources held by a handle.
    async fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}

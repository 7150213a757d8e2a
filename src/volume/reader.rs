//! Random-access reads over stitched sequence groups.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       TiledVolumeReader                         │
//! │  read_region(series, resolution, rect, z, t, c)                 │
//! │  1. Validate request      4. Resolve file per tile              │
//! │  2. Split z/t/c into      5. Read through HandlePool            │
//! │     outer + inner         6. Composite into destination         │
//! │  3. Plan tiles                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                          │
//!            ▼                          ▼
//!    ┌───────────────┐         ┌─────────────────┐
//!    │ SequenceGroup │         │   HandlePool    │
//!    └───────────────┘         └─────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::backend::{HandlePool, ImageBackend, PixelBuffer, Rect, RegionRequest};
use crate::error::ReadError;
use crate::group::{GridCoord, SequenceGroup};

use super::tiling::{blit, plan_tiles};

// =============================================================================
// Plane Request
// =============================================================================

/// A rectangle of one global plane of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneRequest {
    /// Group index within the batch
    pub series: usize,

    /// Resolution level (0 = full resolution)
    pub resolution: u32,

    /// Rectangle in volume coordinates at that resolution
    pub rect: Rect,

    pub z: u32,
    pub t: u32,
    pub c: u32,
}

impl PlaneRequest {
    pub fn new(series: usize, rect: Rect) -> Self {
        Self {
            series,
            resolution: 0,
            rect,
            z: 0,
            t: 0,
            c: 0,
        }
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_plane(mut self, z: u32, t: u32, c: u32) -> Self {
        self.z = z;
        self.t = t;
        self.c = c;
        self
    }
}

// =============================================================================
// TiledVolumeReader
// =============================================================================

/// Serves regions of the virtual volume of each group.
///
/// Handles are checked out of the shared pool for the duration of one tile
/// read and returned right after, so concurrent reads only contend on pool
/// bookkeeping.
pub struct TiledVolumeReader<B: ImageBackend> {
    groups: Vec<SequenceGroup>,
    pool: Arc<HandlePool<B>>,
}

impl<B: ImageBackend> TiledVolumeReader<B> {
    pub fn new(groups: Vec<SequenceGroup>, pool: Arc<HandlePool<B>>) -> Self {
        Self { groups, pool }
    }

    pub fn groups(&self) -> &[SequenceGroup] {
        &self.groups
    }

    pub fn pool(&self) -> &Arc<HandlePool<B>> {
        &self.pool
    }

    /// Group addressed by a series index.
    pub fn group(&self, series: usize) -> Result<&SequenceGroup, ReadError> {
        self.groups.get(series).ok_or(ReadError::InvalidSeries {
            series,
            count: self.groups.len(),
        })
    }

    /// Read a rectangle of plane `(z, t, c)` of group `series`.
    ///
    /// Cells of the grid with no backing file come back zero-filled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `series` does not name a group
    /// - the resolution is not offered by the files
    /// - a plane index is beyond the group's totals
    /// - the rectangle is empty or leaves the volume
    /// - the backend fails on a present tile
    pub async fn read_region(
        &self,
        series: usize,
        resolution: u32,
        rect: Rect,
        z: u32,
        t: u32,
        c: u32,
    ) -> Result<PixelBuffer, ReadError> {
        let request = PlaneRequest::new(series, rect)
            .with_resolution(resolution)
            .with_plane(z, t, c);
        self.read(&request).await
    }

    /// [`Self::read_region`] with a prepared request.
    pub async fn read(&self, request: &PlaneRequest) -> Result<PixelBuffer, ReadError> {
        let group = self.group(request.series)?;
        if group.entries().is_empty() {
            return Err(ReadError::EmptyGroup);
        }

        let sig = *group.signature();
        if request.resolution >= sig.resolution_levels {
            return Err(ReadError::InvalidResolution {
                resolution: request.resolution,
                levels: sig.resolution_levels,
            });
        }
        check_plane("z", request.z, group.total_size_z())?;
        check_plane("t", request.t, group.total_size_t())?;
        check_plane("c", request.c, group.total_size_c())?;

        let (tile_width, tile_height) = sig.size_at(request.resolution);
        let grid = group.grid();
        let (Some(volume_width), Some(volume_height)) = (
            tile_width.checked_mul(grid.x),
            tile_height.checked_mul(grid.y),
        ) else {
            return Err(ReadError::VolumeTooLarge {
                width: u64::from(tile_width) * u64::from(grid.x),
                height: u64::from(tile_height) * u64::from(grid.y),
            });
        };

        let rect = request.rect;
        if rect.is_empty() || rect.right() > volume_width || rect.bottom() > volume_height {
            return Err(ReadError::InvalidRegion {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                max_width: volume_width,
                max_height: volume_height,
            });
        }

        // Global plane -> outer cell + plane inside the file
        let (outer_z, inner_z) = (request.z / sig.size_z, request.z % sig.size_z);
        let (outer_t, inner_t) = (request.t / sig.size_t, request.t % sig.size_t);
        let (outer_c, inner_c) = (request.c / sig.size_c, request.c % sig.size_c);

        let pieces = plan_tiles(&rect, tile_width, tile_height);
        debug!(
            series = request.series,
            resolution = request.resolution,
            tiles = pieces.len(),
            "reading region"
        );

        let file_request = |source: Rect| RegionRequest {
            series: group.ident().image_series,
            resolution: request.resolution,
            rect: source,
            z: inner_z,
            t: inner_t,
            c: inner_c,
        };

        // Single tile: hand back the backend buffer as is
        if let [piece] = pieces.as_slice() {
            let coord = GridCoord::new(piece.tile_x, piece.tile_y, outer_z, outer_t, outer_c);
            return match group.entry_at(&coord) {
                Some(entry) => self.read_tile(entry.path(), &file_request(piece.source)).await,
                None => {
                    warn!(?coord, "missing tile, filling with zeros");
                    Ok(PixelBuffer::zeroed(
                        rect.width,
                        rect.height,
                        sig.pixel_type,
                        sig.samples_per_pixel,
                    ))
                }
            };
        }

        let row_bytes = rect.width as usize * sig.bytes_per_pixel();
        let mut dest = vec![0u8; row_bytes * rect.height as usize];

        for piece in &pieces {
            let coord = GridCoord::new(piece.tile_x, piece.tile_y, outer_z, outer_t, outer_c);
            let Some(entry) = group.entry_at(&coord) else {
                warn!(?coord, "missing tile, filling with zeros");
                continue;
            };

            let tile = self.read_tile(entry.path(), &file_request(piece.source)).await?;
            if tile.width != piece.source.width
                || tile.height != piece.source.height
                || tile.pixel_type != sig.pixel_type
                || tile.samples_per_pixel != sig.samples_per_pixel
                || !tile.is_consistent()
            {
                return Err(ReadError::Conversion {
                    message: format!(
                        "tile from {} is {}x{} {}x{}, expected {}x{} {}x{}",
                        entry.path(),
                        tile.width,
                        tile.height,
                        tile.pixel_type.name(),
                        tile.samples_per_pixel,
                        piece.source.width,
                        piece.source.height,
                        sig.pixel_type.name(),
                        sig.samples_per_pixel
                    ),
                });
            }
            blit(&mut dest, row_bytes, &tile, piece.dest_x, piece.dest_y);
        }

        Ok(PixelBuffer {
            width: rect.width,
            height: rect.height,
            pixel_type: sig.pixel_type,
            samples_per_pixel: sig.samples_per_pixel,
            data: Bytes::from(dest),
        })
    }

    /// Downscaled view of the file nearest the middle of the Z and T range.
    ///
    /// The coarsest resolution level that still covers `max_size` is read
    /// and then scaled so its longer side is at most `max_size`. Pixel
    /// layouts the `image` crate cannot represent are returned unscaled.
    pub async fn read_thumbnail(&self, series: usize, max_size: u32) -> Result<PixelBuffer, ReadError> {
        let group = self.group(series)?;
        let coord = group.thumbnail_cell().ok_or(ReadError::EmptyGroup)?;
        let entry = group.entry_at(&coord).ok_or(ReadError::EmptyGroup)?;

        let sig = *group.signature();
        let max_size = max_size.max(1);
        let resolution = (0..sig.resolution_levels.max(1))
            .rev()
            .find(|&r| {
                let (w, h) = sig.size_at(r);
                w.max(h) >= max_size
            })
            .unwrap_or(0);

        let (width, height) = sig.size_at(resolution);
        let request = RegionRequest {
            series: group.ident().image_series,
            resolution,
            rect: Rect::new(0, 0, width, height),
            z: sig.size_z / 2,
            t: sig.size_t / 2,
            c: 0,
        };
        debug!(path = entry.path(), resolution, "reading thumbnail source");
        let plane = self.read_tile(entry.path(), &request).await?;

        if plane.width.max(plane.height) <= max_size {
            return Ok(plane);
        }
        let Some(image) = plane.to_dynamic_image() else {
            debug!(pixel_type = plane.pixel_type.name(), "thumbnail layout not scalable");
            return Ok(plane);
        };

        let scaled = tokio::task::spawn_blocking(move || image.thumbnail(max_size, max_size))
            .await
            .map_err(|e| ReadError::Conversion {
                message: e.to_string(),
            })?;
        PixelBuffer::from_dynamic_image(&scaled).ok_or_else(|| ReadError::Conversion {
            message: format!("unsupported color type {:?}", scaled.color()),
        })
    }

    /// Read one rectangle of one file through the pool.
    async fn read_tile(&self, path: &str, request: &RegionRequest) -> Result<PixelBuffer, ReadError> {
        let pooled = self.pool.acquire(path).await?;
        match self.pool.backend().read_region(pooled.handle(), request).await {
            Ok(buffer) => {
                self.pool.release(pooled).await;
                Ok(buffer)
            }
            Err(e) => {
                warn!(path, error = %e, "tile read failed");
                self.pool.discard(pooled).await;
                Err(e.into())
            }
        }
    }
}

fn check_plane(axis: &'static str, index: u32, size: u32) -> Result<(), ReadError> {
    if index >= size {
        return Err(ReadError::PlaneOutOfRange { axis, index, size });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

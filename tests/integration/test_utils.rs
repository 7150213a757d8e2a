//! Test utilities for integration tests.
//!
//! This module provides a mock image backend with deterministic pixel
//! content and helpers for building path lists.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use sequence_stitcher::backend::{
    HandlePool, ImageBackend, ImageTypeSignature, PixelBuffer, PixelType, RegionRequest,
};
use sequence_stitcher::error::BackendError;
use sequence_stitcher::CancellationFlag;

// =============================================================================
// Pixel Content
// =============================================================================

fn path_seed(path: &str) -> u8 {
    path.bytes().fold(7u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b))
}

/// Sample value of every byte of pixel `(x, y)` (full-resolution
/// coordinates) of plane `(z, t, c)` of a mock file.
pub fn expected_sample(path: &str, x: u32, y: u32, z: u32, t: u32, c: u32) -> u8 {
    let mixed = x
        .wrapping_mul(3)
        .wrapping_add(y.wrapping_mul(7))
        .wrapping_add(z * 11)
        .wrapping_add(t * 13)
        .wrapping_add(c * 17);
    path_seed(path).wrapping_add(mixed as u8)
}

/// First byte of pixel `(x, y)` of a buffer.
pub fn sample_at(buffer: &PixelBuffer, x: u32, y: u32) -> u8 {
    let offset = y as usize * buffer.row_bytes() + x as usize * buffer.bytes_per_pixel();
    buffer.data[offset]
}

// =============================================================================
// Mock Backend
// =============================================================================

/// Handle of an opened mock file.
#[derive(Debug, Clone)]
pub struct MockHandle {
    pub path: String,
    series: Vec<ImageTypeSignature>,
}

/// An in-memory image backend.
///
/// Files are registered with their signatures; pixel bytes are generated
/// from [`expected_sample`]. Opens and region reads are counted.
pub struct MockBackend {
    files: HashMap<String, Vec<ImageTypeSignature>>,
    corrupt: HashSet<String>,
    failing_reads: HashSet<String>,
    open_counts: Arc<RwLock<HashMap<String, usize>>>,
    read_count: Arc<AtomicUsize>,
    cancel_after: Option<(usize, CancellationFlag)>,
    opened: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            corrupt: HashSet::new(),
            failing_reads: HashSet::new(),
            open_counts: Arc::new(RwLock::new(HashMap::new())),
            read_count: Arc::new(AtomicUsize::new(0)),
            cancel_after: None,
            opened: AtomicUsize::new(0),
        }
    }

    /// Register a single-series file.
    pub fn with_file(self, path: impl Into<String>, signature: ImageTypeSignature) -> Self {
        self.with_series(path, vec![signature])
    }

    /// Register one file per path, all with the same signature.
    pub fn with_files<I, S>(mut self, paths: I, signature: ImageTypeSignature) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            self.files.insert(path.into(), vec![signature]);
        }
        self
    }

    /// Register a file holding several series.
    pub fn with_series(mut self, path: impl Into<String>, series: Vec<ImageTypeSignature>) -> Self {
        self.files.insert(path.into(), series);
        self
    }

    /// Register a file that opens but whose signature cannot be read.
    pub fn with_corrupt_file(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.files
            .insert(path.clone(), vec![ImageTypeSignature::plane(1, 1, PixelType::U8)]);
        self.corrupt.insert(path);
        self
    }

    /// Make region reads of a registered file fail.
    pub fn with_failing_reads(mut self, path: impl Into<String>) -> Self {
        self.failing_reads.insert(path.into());
        self
    }

    /// Raise `flag` once `opens` files have been opened.
    pub fn with_cancel_after(mut self, opens: usize, flag: CancellationFlag) -> Self {
        self.cancel_after = Some((opens, flag));
        self
    }

    pub async fn get_open_count(&self, path: &str) -> usize {
        self.open_counts
            .read()
            .await
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageBackend for MockBackend {
    type Handle = MockHandle;

    async fn open(&self, path: &str) -> Result<Self::Handle, BackendError> {
        let Some(series) = self.files.get(path) else {
            return Err(BackendError::Unsupported {
                path: path.to_string(),
                reason: "not registered".to_string(),
            });
        };

        {
            let mut counts = self.open_counts.write().await;
            *counts.entry(path.to_string()).or_insert(0) += 1;
        }

        let opened = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, flag)) = &self.cancel_after {
            if opened >= *limit {
                flag.cancel();
            }
        }

        Ok(MockHandle {
            path: path.to_string(),
            series: series.clone(),
        })
    }

    fn series_count(&self, handle: &Self::Handle) -> usize {
        handle.series.len()
    }

    async fn signature(
        &self,
        handle: &Self::Handle,
        series: usize,
    ) -> Result<ImageTypeSignature, BackendError> {
        if self.corrupt.contains(&handle.path) {
            return Err(BackendError::Metadata {
                path: handle.path.clone(),
                message: "corrupt header".to_string(),
            });
        }
        handle
            .series
            .get(series)
            .copied()
            .ok_or(BackendError::InvalidSeries {
                path: handle.path.clone(),
                series,
                count: handle.series.len(),
            })
    }

    async fn read_region(
        &self,
        handle: &Self::Handle,
        request: &RegionRequest,
    ) -> Result<PixelBuffer, BackendError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.contains(&handle.path) {
            return Err(BackendError::Io(format!("read error in {}", handle.path)));
        }

        let sig = self.signature(handle, request.series).await?;
        let (level_width, level_height) = sig.size_at(request.resolution);
        let rect = request.rect;
        if request.resolution >= sig.resolution_levels
            || rect.right() > level_width
            || rect.bottom() > level_height
            || request.z >= sig.size_z
            || request.t >= sig.size_t
            || request.c >= sig.size_c
        {
            return Err(BackendError::OutOfBounds {
                path: handle.path.clone(),
                message: format!("{:?}", request),
            });
        }

        let bpp = sig.bytes_per_pixel();
        let mut data = Vec::with_capacity(rect.width as usize * rect.height as usize * bpp);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let value = expected_sample(
                    &handle.path,
                    x << request.resolution,
                    y << request.resolution,
                    request.z,
                    request.t,
                    request.c,
                );
                data.extend(std::iter::repeat(value).take(bpp));
            }
        }

        Ok(PixelBuffer {
            width: rect.width,
            height: rect.height,
            pixel_type: sig.pixel_type,
            samples_per_pixel: sig.samples_per_pixel,
            data: Bytes::from(data),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Wrap a backend in a shared pool.
pub fn shared_pool(backend: MockBackend) -> Arc<HandlePool<MockBackend>> {
    Arc::new(HandlePool::new(backend))
}

pub fn to_strings(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// Single-plane 8-bit signature.
pub fn gray(width: u32, height: u32) -> ImageTypeSignature {
    ImageTypeSignature::plane(width, height, PixelType::U8)
}

/// Row-major `tile_x{x}_y{y}` paths of a `cols` × `rows` grid.
pub fn tile_grid(dir: &str, cols: u32, rows: u32) -> Vec<String> {
    let mut paths = Vec::new();
    for y in 0..rows {
        for x in 0..cols {
            paths.push(format!("{dir}/tile_x{x:02}_y{y:02}.tif"));
        }
    }
    paths
}

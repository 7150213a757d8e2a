//! Backend for ordinary raster files decoded with the `image` crate.
//!
//! Every file holds a single series with a single plane (`Z = T = C = 1`);
//! color components are exposed as interleaved samples. Coarser resolution
//! levels are produced on the fly by halving the decoded plane.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};

use crate::error::BackendError;

use super::buffer::{layout_of, PixelBuffer};
use super::signature::ImageTypeSignature;
use super::source::{ImageBackend, RegionRequest};

/// Smallest side a generated resolution level may have.
const MIN_LEVEL_SIDE: u32 = 32;

/// Maximum number of resolution levels advertised.
const MAX_LEVELS: u32 = 8;

/// An opened raster file.
#[derive(Clone)]
pub struct ImageFileHandle {
    path: String,
    image: Arc<DynamicImage>,
}

impl ImageFileHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// [`ImageBackend`] over PNG, TIFF, JPEG and BMP files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileBackend;

impl ImageFileBackend {
    pub fn new() -> Self {
        Self
    }

    /// `true` when the extension names a format this backend decodes.
    pub fn accepts(path: &str) -> bool {
        ImageFormat::from_path(path).is_ok_and(|f| {
            matches!(
                f,
                ImageFormat::Png | ImageFormat::Tiff | ImageFormat::Jpeg | ImageFormat::Bmp
            )
        })
    }
}

fn map_image_error(path: &str, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            BackendError::NotFound(path.to_string())
        }
        ImageError::IoError(io) => BackendError::Io(io.to_string()),
        ImageError::Unsupported(e) => BackendError::Unsupported {
            path: path.to_string(),
            reason: e.to_string(),
        },
        other => BackendError::Decode {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}

fn resolution_levels(width: u32, height: u32) -> u32 {
    let mut levels = 1;
    while levels < MAX_LEVELS && (width.min(height) >> levels) >= MIN_LEVEL_SIDE {
        levels += 1;
    }
    levels
}

#[async_trait]
impl ImageBackend for ImageFileBackend {
    type Handle = ImageFileHandle;

    async fn open(&self, path: &str) -> Result<Self::Handle, BackendError> {
        if !Self::accepts(path) {
            return Err(BackendError::Unsupported {
                path: path.to_string(),
                reason: "unrecognized extension".to_string(),
            });
        }
        if !Path::new(path).exists() {
            return Err(BackendError::NotFound(path.to_string()));
        }

        let owned = path.to_string();
        let image = tokio::task::spawn_blocking(move || image::open(&owned))
            .await
            .map_err(|e| BackendError::Io(e.to_string()))?
            .map_err(|e| map_image_error(path, e))?;

        Ok(ImageFileHandle {
            path: path.to_string(),
            image: Arc::new(image),
        })
    }

    fn series_count(&self, _handle: &Self::Handle) -> usize {
        1
    }

    async fn signature(
        &self,
        handle: &Self::Handle,
        series: usize,
    ) -> Result<ImageTypeSignature, BackendError> {
        if series != 0 {
            return Err(BackendError::InvalidSeries {
                path: handle.path.clone(),
                series,
                count: 1,
            });
        }

        let (pixel_type, samples_per_pixel) =
            layout_of(&handle.image).ok_or_else(|| BackendError::Metadata {
                path: handle.path.clone(),
                message: format!("unsupported color type {:?}", handle.image.color()),
            })?;

        let (width, height) = (handle.image.width(), handle.image.height());
        Ok(ImageTypeSignature {
            samples_per_pixel,
            resolution_levels: resolution_levels(width, height),
            ..ImageTypeSignature::plane(width, height, pixel_type)
        })
    }

    async fn read_region(
        &self,
        handle: &Self::Handle,
        request: &RegionRequest,
    ) -> Result<PixelBuffer, BackendError> {
        if request.series != 0 || request.z != 0 || request.t != 0 || request.c != 0 {
            return Err(BackendError::OutOfBounds {
                path: handle.path.clone(),
                message: format!(
                    "plane s={} z={} t={} c={} of a single-plane file",
                    request.series, request.z, request.t, request.c
                ),
            });
        }

        let image = handle.image.clone();
        let path = handle.path.clone();
        let request = *request;

        tokio::task::spawn_blocking(move || {
            let level = if request.resolution == 0 {
                image
            } else {
                let shift = request.resolution.min(31);
                let w = (image.width() >> shift).max(1);
                let h = (image.height() >> shift).max(1);
                Arc::new(image.resize_exact(w, h, FilterType::Triangle))
            };

            let rect = request.rect;
            if rect.is_empty() || rect.right() > level.width() || rect.bottom() > level.height() {
                return Err(BackendError::OutOfBounds {
                    path,
                    message: format!(
                        "region {},{} {}x{} outside {}x{}",
                        rect.x,
                        rect.y,
                        rect.width,
                        rect.height,
                        level.width(),
                        level.height()
                    ),
                });
            }

            let cropped = level.crop_imm(rect.x, rect.y, rect.width, rect.height);
            PixelBuffer::from_dynamic_image(&cropped).ok_or_else(|| BackendError::Decode {
                path,
                message: format!("unsupported color type {:?}", cropped.color()),
            })
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }
}

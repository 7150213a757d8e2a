//! Rectangles and raw pixel buffers.

use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};

use super::signature::PixelType;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlap of two rectangles, `None` when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= x || bottom <= y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }

    /// Same rectangle moved by `(-dx, -dy)`.
    pub fn offset_by(&self, dx: u32, dy: u32) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.width, self.height)
    }
}

/// One plane (or part of a plane) of raw samples, row-major, interleaved.
///
/// Multi-byte samples are stored in native byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixel_type: PixelType,
    pub samples_per_pixel: u32,
    pub data: Bytes,
}

impl PixelBuffer {
    /// Zero-filled buffer.
    pub fn zeroed(width: u32, height: u32, pixel_type: PixelType, samples_per_pixel: u32) -> Self {
        let len = width as usize * height as usize * pixel_type.bytes() * samples_per_pixel as usize;
        Self {
            width,
            height,
            pixel_type,
            samples_per_pixel,
            data: Bytes::from(vec![0u8; len]),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_type.bytes() * self.samples_per_pixel as usize
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// `true` when `data` holds exactly `width * height` pixels.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.row_bytes() * self.height as usize
    }

    /// Convert to an `image` crate image.
    ///
    /// Supported layouts: 8/16-bit with 1 to 4 samples, 32-bit float RGB(A).
    pub fn to_dynamic_image(&self) -> Option<DynamicImage> {
        let (w, h) = (self.width, self.height);
        match (self.pixel_type, self.samples_per_pixel) {
            (PixelType::U8, 1) => {
                ImageBuffer::<Luma<u8>, _>::from_raw(w, h, self.data.to_vec()).map(DynamicImage::ImageLuma8)
            }
            (PixelType::U8, 2) => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, self.data.to_vec())
                .map(DynamicImage::ImageLumaA8),
            (PixelType::U8, 3) => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, self.data.to_vec()).map(DynamicImage::ImageRgb8)
            }
            (PixelType::U8, 4) => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, self.data.to_vec())
                .map(DynamicImage::ImageRgba8),
            (PixelType::U16, 1) => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, self.u16_samples())
                .map(DynamicImage::ImageLuma16),
            (PixelType::U16, 2) => ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, self.u16_samples())
                .map(DynamicImage::ImageLumaA16),
            (PixelType::U16, 3) => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, self.u16_samples())
                .map(DynamicImage::ImageRgb16),
            (PixelType::U16, 4) => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, self.u16_samples())
                .map(DynamicImage::ImageRgba16),
            (PixelType::F32, 3) => ImageBuffer::<Rgb<f32>, _>::from_raw(w, h, self.f32_samples())
                .map(DynamicImage::ImageRgb32F),
            (PixelType::F32, 4) => ImageBuffer::<Rgba<f32>, _>::from_raw(w, h, self.f32_samples())
                .map(DynamicImage::ImageRgba32F),
            _ => None,
        }
    }

    /// Wrap an `image` crate image, `None` for unsupported color types.
    pub fn from_dynamic_image(img: &DynamicImage) -> Option<Self> {
        let (pixel_type, samples_per_pixel) = layout_of(img)?;
        Some(Self {
            width: img.width(),
            height: img.height(),
            pixel_type,
            samples_per_pixel,
            data: Bytes::copy_from_slice(img.as_bytes()),
        })
    }

    fn u16_samples(&self) -> Vec<u16> {
        self.data
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect()
    }

    fn f32_samples(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

/// Sample type and count of an `image` crate image.
pub fn layout_of(img: &DynamicImage) -> Option<(PixelType, u32)> {
    let layout = match img {
        DynamicImage::ImageLuma8(_) => (PixelType::U8, 1),
        DynamicImage::ImageLumaA8(_) => (PixelType::U8, 2),
        DynamicImage::ImageRgb8(_) => (PixelType::U8, 3),
        DynamicImage::ImageRgba8(_) => (PixelType::U8, 4),
        DynamicImage::ImageLuma16(_) => (PixelType::U16, 1),
        DynamicImage::ImageLumaA16(_) => (PixelType::U16, 2),
        DynamicImage::ImageRgb16(_) => (PixelType::U16, 3),
        DynamicImage::ImageRgba16(_) => (PixelType::U16, 4),
        DynamicImage::ImageRgb32F(_) => (PixelType::F32, 3),
        DynamicImage::ImageRgba32F(_) => (PixelType::F32, 4),
        _ => return None,
    };
    Some(layout)
}

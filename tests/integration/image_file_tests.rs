//! End-to-end tests over real PNG files.
//!
//! Tests verify:
//! - Files written to disk are grouped, stitched and thumbnailed
//! - Undecodable files are reported as unplaced

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};

use sequence_stitcher::backend::PixelType;
use sequence_stitcher::error::SkipReason;
use sequence_stitcher::naming::ClassifierVariant;
use sequence_stitcher::{
    CancellationFlag, GroupBuilder, HandlePool, ImageFileBackend, Rect, SequenceAssembler,
    TiledVolumeReader,
};

struct ScratchDir(PathBuf);

impl ScratchDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "sequence-stitcher-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self, name: &str) -> String {
        self.0.join(name).to_string_lossy().into_owned()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn tile_value(tx: u32, ty: u32, x: u32, y: u32) -> u8 {
    (tx * 100 + ty * 50 + (x + y) % 40) as u8
}

/// Write a `cols` x `rows` grid of `size` x `size` grayscale tiles.
fn write_tiles(dir: &ScratchDir, cols: u32, rows: u32, size: u32) -> Vec<String> {
    let mut paths = Vec::new();
    for ty in 0..rows {
        for tx in 0..cols {
            let img = GrayImage::from_fn(size, size, |x, y| Luma([tile_value(tx, ty, x, y)]));
            let path = dir.path(&format!("tile_x{tx}_y{ty}.png"));
            img.save(Path::new(&path)).unwrap();
            paths.push(path);
        }
    }
    paths
}

fn new_pool() -> Arc<HandlePool<ImageFileBackend>> {
    Arc::new(HandlePool::new(ImageFileBackend::new()))
}

#[tokio::test]
async fn test_png_tiles_stitch() {
    let dir = ScratchDir::new("stitch");
    let paths = write_tiles(&dir, 2, 2, 40);
    let pool = new_pool();

    let outcome = GroupBuilder::new(pool.clone())
        .with_variant(ClassifierVariant::Full)
        .build(&paths, &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(outcome.groups.len(), 1);
    assert!(outcome.unplaced.is_empty());

    let group = &outcome.groups[0];
    assert!(group.is_tiled());
    assert_eq!((group.total_size_x(), group.total_size_y()), (80, 80));
    assert_eq!(group.signature().pixel_type, PixelType::U8);

    let reader = TiledVolumeReader::new(outcome.groups, pool);
    let region = reader
        .read_region(0, 0, Rect::new(30, 30, 20, 20), 0, 0, 0)
        .await
        .unwrap();

    assert_eq!((region.width, region.height), (20, 20));
    for (dx, dy) in [(0, 0), (9, 9), (10, 0), (0, 10), (19, 19)] {
        let (gx, gy) = (30 + dx, 30 + dy);
        let expected = tile_value(gx / 40, gy / 40, gx % 40, gy % 40);
        assert_eq!(region.data[(dy * 20 + dx) as usize], expected, "pixel ({gx}, {gy})");
    }
}

#[tokio::test]
async fn test_png_thumbnail() {
    let dir = ScratchDir::new("thumb");
    let paths: Vec<String> = (0..3)
        .map(|t| {
            let img = RgbImage::from_pixel(64, 32, Rgb([t as u8 * 40, 10, 20]));
            let path = dir.path(&format!("frame_t{t}.png"));
            img.save(Path::new(&path)).unwrap();
            path
        })
        .collect();
    let pool = new_pool();

    let outcome = GroupBuilder::new(pool.clone())
        .build(&paths, &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(outcome.groups[0].total_size_t(), 3);
    assert_eq!(outcome.groups[0].signature().samples_per_pixel, 3);

    let reader = TiledVolumeReader::new(outcome.groups, pool);
    let thumb = reader.read_thumbnail(0, 16).await.unwrap();
    assert_eq!((thumb.width, thumb.height), (16, 8));
    assert_eq!(thumb.samples_per_pixel, 3);
    // middle frame
    assert_eq!(thumb.data[0], 40);
}

#[tokio::test]
async fn test_png_sequence_assembles() {
    let dir = ScratchDir::new("assemble");
    let mut paths = Vec::new();
    for z in 0..4u8 {
        let img = GrayImage::from_pixel(8, 8, Luma([z * 10]));
        let path = dir.path(&format!("slice_z{z}.png"));
        img.save(Path::new(&path)).unwrap();
        paths.push(path);
    }
    let pool = new_pool();

    let outcome = GroupBuilder::new(pool.clone())
        .build(&paths, &CancellationFlag::new())
        .await
        .unwrap();
    let assembled = SequenceAssembler::new(pool)
        .assemble(&outcome.assembly_entries(), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(assembled.sequences.len(), 1);
    let seq = &assembled.sequences[0];
    assert_eq!(seq.size_z, 4);
    assert_eq!(seq.plane(3, 0, 0).unwrap().data[0], 30);
}

#[tokio::test]
async fn test_undecodable_file_is_unplaced() {
    let dir = ScratchDir::new("broken");
    let mut paths = write_tiles(&dir, 2, 1, 8);
    let broken = dir.path("tile_x2_y0.png");
    std::fs::write(&broken, b"not a png").unwrap();
    paths.push(broken.clone());

    let outcome = GroupBuilder::new(new_pool())
        .with_variant(ClassifierVariant::Full)
        .build(&paths, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.placed_count(), 2);
    assert_eq!(outcome.unplaced.len(), 1);
    assert_eq!(outcome.unplaced[0].path, broken);
    assert!(matches!(
        outcome.unplaced[0].reason,
        SkipReason::UnsupportedFile(_)
    ));
}

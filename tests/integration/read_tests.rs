//! Tiled read integration tests.
//!
//! Tests verify:
//! - Regions spanning several files are stitched with correct offsets
//! - Global Z/T/C planes route to the right file and inner plane
//! - Missing tiles come back zero-filled
//! - Resolution levels, validation errors and thumbnails

use std::sync::Arc;

use sequence_stitcher::backend::{HandlePool, ImageBackend, ImageTypeSignature, Rect, RegionRequest};
use sequence_stitcher::error::ReadError;
use sequence_stitcher::group::GroupBuilder;
use sequence_stitcher::naming::ClassifierVariant;
use sequence_stitcher::volume::TiledVolumeReader;
use sequence_stitcher::CancellationFlag;

use super::test_utils::{
    expected_sample, gray, sample_at, shared_pool, tile_grid, to_strings, MockBackend,
};

async fn tiled_reader(
    paths: &[String],
    backend: MockBackend,
) -> TiledVolumeReader<MockBackend> {
    let pool = shared_pool(backend);
    let outcome = GroupBuilder::new(pool.clone())
        .with_variant(ClassifierVariant::Full)
        .build(paths, &CancellationFlag::new())
        .await
        .unwrap();
    TiledVolumeReader::new(outcome.groups, pool)
}

async fn plain_reader(paths: &[String], backend: MockBackend) -> TiledVolumeReader<MockBackend> {
    let pool = shared_pool(backend);
    let outcome = GroupBuilder::new(pool.clone())
        .build(paths, &CancellationFlag::new())
        .await
        .unwrap();
    TiledVolumeReader::new(outcome.groups, pool)
}

// =============================================================================
// Compositing
// =============================================================================

#[tokio::test]
async fn test_two_by_two_matches_manual_stitch() {
    let paths = tile_grid("scan", 2, 2);
    let backend = MockBackend::new().with_files(paths.clone(), gray(100, 100));
    let reader = tiled_reader(&paths, backend).await;

    let reads_before = reader.pool().backend().read_count();
    let region = reader
        .read_region(0, 0, Rect::new(50, 50, 100, 100), 0, 0, 0)
        .await
        .unwrap();
    assert_eq!(reader.pool().backend().read_count() - reads_before, 4);
    assert_eq!((region.width, region.height), (100, 100));

    // Read each tile on its own and stitch by hand
    let standalone = HandlePool::new(MockBackend::new().with_files(paths.clone(), gray(100, 100)));
    let mut expected = vec![0u8; 100 * 100];
    for (i, path) in paths.iter().enumerate() {
        let (tx, ty) = ((i % 2) as u32, (i / 2) as u32);
        let pooled = standalone.acquire(path).await.unwrap();
        let tile = standalone
            .backend()
            .read_region(pooled.handle(), &RegionRequest::new(Rect::new(0, 0, 100, 100), 0, 0, 0))
            .await
            .unwrap();
        standalone.release(pooled).await;

        for y in 0..100u32 {
            for x in 0..100u32 {
                let (gx, gy) = (tx * 100 + x, ty * 100 + y);
                if (50..150).contains(&gx) && (50..150).contains(&gy) {
                    expected[((gy - 50) * 100 + (gx - 50)) as usize] = sample_at(&tile, x, y);
                }
            }
        }
    }
    assert_eq!(region.data.as_ref(), expected.as_slice());
}

#[tokio::test]
async fn test_single_tile_is_passed_through() {
    let paths = tile_grid("scan", 2, 2);
    let backend = MockBackend::new().with_files(paths.clone(), gray(100, 100));
    let reader = tiled_reader(&paths, backend).await;

    let region = reader
        .read_region(0, 0, Rect::new(110, 10, 20, 30), 0, 0, 0)
        .await
        .unwrap();
    assert_eq!((region.width, region.height), (20, 30));
    assert_eq!(sample_at(&region, 0, 0), expected_sample("scan/tile_x01_y00.tif", 10, 10, 0, 0, 0));
    assert_eq!(sample_at(&region, 19, 29), expected_sample("scan/tile_x01_y00.tif", 29, 39, 0, 0, 0));
}

#[tokio::test]
async fn test_missing_tile_zero_filled() {
    let mut paths = tile_grid("scan", 2, 2);
    paths.pop();
    let backend = MockBackend::new().with_files(paths.clone(), gray(50, 50));
    let reader = tiled_reader(&paths, backend).await;

    assert!(reader.groups()[0].irregular().is_some());
    let region = reader
        .read_region(0, 0, Rect::new(0, 0, 100, 100), 0, 0, 0)
        .await
        .unwrap();

    assert_eq!(sample_at(&region, 10, 10), expected_sample("scan/tile_x00_y00.tif", 10, 10, 0, 0, 0));
    assert_eq!(sample_at(&region, 60, 60), 0);
    assert_eq!(sample_at(&region, 99, 99), 0);
}

#[tokio::test]
async fn test_multi_sample_pixels() {
    let paths = tile_grid("rgb", 2, 1);
    let sig = ImageTypeSignature {
        samples_per_pixel: 3,
        ..gray(10, 10)
    };
    let reader = tiled_reader(&paths, MockBackend::new().with_files(paths.clone(), sig)).await;

    let region = reader
        .read_region(0, 0, Rect::new(5, 0, 10, 2), 0, 0, 0)
        .await
        .unwrap();
    assert_eq!(region.data.len(), 10 * 2 * 3);
    assert_eq!(sample_at(&region, 5, 1), expected_sample("rgb/tile_x01_y00.tif", 0, 1, 0, 0, 0));
}

// =============================================================================
// Plane Routing
// =============================================================================

#[tokio::test]
async fn test_global_z_routes_to_inner_plane() {
    let paths: Vec<String> = (0..3).map(|z| format!("stack_z{z}.tif")).collect();
    let sig = ImageTypeSignature {
        size_z: 2,
        ..gray(8, 8)
    };
    let reader = plain_reader(&paths, MockBackend::new().with_files(paths.clone(), sig)).await;

    assert_eq!(reader.groups()[0].total_size_z(), 6);
    let plane = reader
        .read_region(0, 0, Rect::new(0, 0, 8, 8), 5, 0, 0)
        .await
        .unwrap();
    assert_eq!(sample_at(&plane, 3, 4), expected_sample("stack_z2.tif", 3, 4, 1, 0, 0));
}

#[tokio::test]
async fn test_channel_and_time_routing() {
    let mut paths = Vec::new();
    for t in 0..2 {
        for c in 0..2 {
            paths.push(format!("cell_t{t}_c{c}.tif"));
        }
    }
    let reader = plain_reader(&paths, MockBackend::new().with_files(paths.clone(), gray(4, 4))).await;

    let plane = reader
        .read_region(0, 0, Rect::new(0, 0, 4, 4), 0, 1, 1)
        .await
        .unwrap();
    assert_eq!(sample_at(&plane, 2, 2), expected_sample("cell_t1_c1.tif", 2, 2, 0, 0, 0));
}

#[tokio::test]
async fn test_resolution_level() {
    let paths = tile_grid("pyr", 2, 1);
    let sig = ImageTypeSignature {
        resolution_levels: 2,
        ..gray(100, 100)
    };
    let reader = tiled_reader(&paths, MockBackend::new().with_files(paths.clone(), sig)).await;

    // level 1: files are 50x50, volume is 100x50
    let region = reader
        .read_region(0, 1, Rect::new(25, 0, 50, 10), 0, 0, 0)
        .await
        .unwrap();
    assert_eq!(sample_at(&region, 0, 3), expected_sample("pyr/tile_x00_y00.tif", 50, 6, 0, 0, 0));
    assert_eq!(sample_at(&region, 25, 3), expected_sample("pyr/tile_x01_y00.tif", 0, 6, 0, 0, 0));

    assert!(matches!(
        reader.read_region(0, 1, Rect::new(0, 0, 101, 10), 0, 0, 0).await,
        Err(ReadError::InvalidRegion { max_width: 100, max_height: 50, .. })
    ));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_validation_errors() {
    let paths = tile_grid("scan", 2, 1);
    let reader = tiled_reader(&paths, MockBackend::new().with_files(paths.clone(), gray(10, 10))).await;

    assert!(matches!(
        reader.read_region(3, 0, Rect::new(0, 0, 1, 1), 0, 0, 0).await,
        Err(ReadError::InvalidSeries { series: 3, .. })
    ));
    assert!(matches!(
        reader.read_region(0, 4, Rect::new(0, 0, 1, 1), 0, 0, 0).await,
        Err(ReadError::InvalidResolution { resolution: 4, levels: 1 })
    ));
    assert!(matches!(
        reader.read_region(0, 0, Rect::new(0, 0, 1, 1), 0, 2, 0).await,
        Err(ReadError::PlaneOutOfRange { axis: "t", index: 2, size: 1 })
    ));
    assert!(matches!(
        reader.read_region(0, 0, Rect::new(0, 0, 0, 0), 0, 0, 0).await,
        Err(ReadError::InvalidRegion { .. })
    ));
}

#[tokio::test]
async fn test_backend_failure_discards_handle() {
    let paths = tile_grid("scan", 2, 1);
    let backend = MockBackend::new()
        .with_files(paths.clone(), gray(10, 10))
        .with_failing_reads("scan/tile_x01_y00.tif");
    let reader = tiled_reader(&paths, backend).await;
    let idle_before = reader.pool().idle_count().await;

    let result = reader.read_region(0, 0, Rect::new(0, 0, 20, 10), 0, 0, 0).await;
    assert!(matches!(result, Err(ReadError::Backend(_))));
    assert_eq!(reader.pool().idle_count().await, idle_before - 1);
}

// =============================================================================
// Thumbnails
// =============================================================================

#[tokio::test]
async fn test_thumbnail_uses_middle_plane() {
    let paths: Vec<String> = (0..5).map(|z| format!("vol_z{z}.tif")).collect();
    let reader = plain_reader(&paths, MockBackend::new().with_files(paths.clone(), gray(40, 20))).await;

    let thumb = reader.read_thumbnail(0, 64).await.unwrap();
    assert_eq!((thumb.width, thumb.height), (40, 20));
    assert_eq!(sample_at(&thumb, 7, 3), expected_sample("vol_z2.tif", 7, 3, 0, 0, 0));
    assert_eq!(reader.pool().backend().get_open_count("vol_z2.tif").await, 1);
}

#[tokio::test]
async fn test_thumbnail_is_downscaled() {
    let paths = to_strings(&["big_t0.tif", "big_t1.tif"]);
    let reader = plain_reader(&paths, MockBackend::new().with_files(paths.clone(), gray(200, 100))).await;

    let thumb = reader.read_thumbnail(0, 50).await.unwrap();
    assert_eq!(thumb.width, 50);
    assert_eq!(thumb.height, 25);
}

#[tokio::test]
async fn test_reader_over_shared_pool() {
    let paths = tile_grid("scan", 2, 2);
    let pool = Arc::new(HandlePool::with_capacity(
        MockBackend::new().with_files(paths.clone(), gray(10, 10)),
        2,
    ));
    let outcome = GroupBuilder::new(pool.clone())
        .with_variant(ClassifierVariant::Full)
        .build(&paths, &CancellationFlag::new())
        .await
        .unwrap();
    let reader = TiledVolumeReader::new(outcome.groups, pool.clone());

    for _ in 0..2 {
        reader
            .read_region(0, 0, Rect::new(0, 0, 20, 20), 0, 0, 0)
            .await
            .unwrap();
    }
    // only two paths fit in the pool, the rest were closed and reopened
    assert!(pool.idle_count().await <= 2);
    assert!(pool.open_count() > 4);
}

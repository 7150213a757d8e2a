//! Decomposition of a volume rectangle into per-file pieces.

use crate::backend::{PixelBuffer, Rect};

/// Part of a requested rectangle served by one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePiece {
    /// Outer grid column
    pub tile_x: u32,

    /// Outer grid row
    pub tile_y: u32,

    /// Rectangle to read, in the coordinates of the file
    pub source: Rect,

    /// Offset of the piece inside the destination buffer
    pub dest_x: u32,
    pub dest_y: u32,
}

/// Split `region` along a grid of `tile_width` × `tile_height` files.
///
/// Pieces are returned row by row. `region` must be non-empty and the tile
/// sizes non-zero.
pub fn plan_tiles(region: &Rect, tile_width: u32, tile_height: u32) -> Vec<TilePiece> {
    if region.is_empty() || tile_width == 0 || tile_height == 0 {
        return Vec::new();
    }

    let first_col = region.x / tile_width;
    let last_col = (region.right() - 1) / tile_width;
    let first_row = region.y / tile_height;
    let last_row = (region.bottom() - 1) / tile_height;

    let mut pieces = Vec::new();
    for tile_y in first_row..=last_row {
        for tile_x in first_col..=last_col {
            let origin_x = tile_x * tile_width;
            let origin_y = tile_y * tile_height;
            let tile = Rect::new(origin_x, origin_y, tile_width, tile_height);

            let Some(overlap) = tile.intersect(region) else {
                continue;
            };
            pieces.push(TilePiece {
                tile_x,
                tile_y,
                source: overlap.offset_by(origin_x, origin_y),
                dest_x: overlap.x - region.x,
                dest_y: overlap.y - region.y,
            });
        }
    }
    pieces
}

/// Copy `src` into a row-major destination at `(dest_x, dest_y)`.
///
/// Rows that would fall outside the destination are clipped.
pub fn blit(dest: &mut [u8], dest_row_bytes: usize, src: &PixelBuffer, dest_x: u32, dest_y: u32) {
    let src_row_bytes = src.row_bytes();
    let x_offset = dest_x as usize * src.bytes_per_pixel();
    if x_offset >= dest_row_bytes {
        return;
    }
    let copy_len = src_row_bytes.min(dest_row_bytes - x_offset);

    for (row, line) in src.data.chunks_exact(src_row_bytes.max(1)).enumerate() {
        let start = (dest_y as usize + row) * dest_row_bytes + x_offset;
        let Some(target) = dest.get_mut(start..start + copy_len) else {
            break;
        };
        target.copy_from_slice(&line[..copy_len]);
    }
}

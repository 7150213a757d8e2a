//! Tiled random-access reads over sequence groups.
//!
//! A group whose files sit side by side in X/Y is read as one large plane:
//! the requested rectangle is cut along file boundaries, each piece is read
//! from its file and the pieces are copied into a single destination buffer.

mod reader;
mod tiling;

pub use reader::{PlaneRequest, TiledVolumeReader};
pub use tiling::{blit, plan_tiles, TilePiece};

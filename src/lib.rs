//! # Sequence Stitcher
//!
//! Infers the multi-dimensional layout of a microscopy acquisition that was
//! saved as many individual image files, using nothing but the numbers in the
//! filenames and the intrinsic shape of each file.
//!
//! Given `exp/img_t00_z00.tif ... exp/img_t02_z04.tif` the crate works out
//! that the files form a 3 (T) × 5 (Z) sequence, and exposes the result as a
//! single virtual volume that can be read plane by plane and region by
//! region, even when the files are spatial tiles of a larger plane.
//!
//! ## Architecture
//!
//! - [`naming`] - Filename tokenizer, prefix classifier and dimension resolver
//! - [`group`] - Clustering into sequences and index compaction
//! - [`volume`] - Tiled random-access reads over a group
//! - [`assemble`] - Concatenation of whole files into in-memory sequences
//! - [`backend`] - Image backend trait, handle pool and the `image` crate backend
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sequence_stitcher::{
//!     CancellationFlag, GroupBuilder, HandlePool, ImageFileBackend, Rect, TiledVolumeReader,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = Arc::new(HandlePool::new(ImageFileBackend::new()));
//!     let paths: Vec<String> = (0..4)
//!         .map(|i| format!("scan/tile_x{}_y{}.png", i % 2, i / 2))
//!         .collect();
//!
//!     let outcome = GroupBuilder::new(pool.clone())
//!         .build(&paths, &CancellationFlag::new())
//!         .await?;
//!
//!     let reader = TiledVolumeReader::new(outcome.groups, pool);
//!     let region = reader.read_region(0, 0, Rect::new(0, 0, 256, 256), 0, 0, 0).await?;
//!     println!("{}x{}", region.width, region.height);
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod group;
pub mod naming;
pub mod volume;

// Re-export commonly used types
pub use assemble::{AssemblyOutcome, FailedLoad, Sequence, SequenceAssembler};
pub use backend::{
    HandlePool, ImageBackend, ImageFileBackend, ImageTypeSignature, PixelBuffer, PixelType, Rect,
    RegionRequest,
};
pub use cancel::CancellationFlag;
pub use config::{AssembleConfig, Cli, Command, GroupConfig, ReadConfig, ThumbnailConfig};
pub use error::{
    AssembleError, BackendError, GroupError, IrregularGrouping, ReadError, SkipReason,
};
pub use group::{
    AssemblyEntry, GroupBuilder, GroupSummary, GroupingOutcome, SequenceGroup, SequenceIdent,
    UnplacedFile,
};
pub use naming::{ClassifierVariant, DimensionTag, FilePosition, PositionResolver};
pub use volume::{PlaneRequest, TiledVolumeReader};

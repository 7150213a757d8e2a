//! Image backend abstraction layer.
//!
//! The backend layer sits between the stitching engine and concrete decoders:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   GroupBuilder / TiledVolumeReader /    │
//! │          SequenceAssembler              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              HandlePool                 │
//! │  (lazy open, LRU of idle handles)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          ImageBackend Trait             │
//! │  open / signature / read_region / close │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │ ImageFileBackend│    │  caller-supplied    │
//! │ (image crate)   │    │  backends           │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod buffer;
mod image_file;
mod pool;
mod signature;
mod source;

pub use buffer::{layout_of, PixelBuffer, Rect};
pub use image_file::{ImageFileBackend, ImageFileHandle};
pub use pool::{HandlePool, PooledHandle, DEFAULT_POOL_CAPACITY};
pub use signature::{ImageTypeSignature, PixelType};
pub use source::{ImageBackend, RegionRequest};

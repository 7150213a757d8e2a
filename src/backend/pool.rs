//! Handle pool for managing backend handle lifecycle.
//!
//! The pool provides:
//! - Lazy opening of per-path backend handles
//! - LRU retention of idle handles so repeated tile reads skip `open`
//! - Explicit checkout: a handle is removed from the pool by [`HandlePool::acquire`]
//!   and only comes back through [`HandlePool::release`], so eviction can never
//!   close a handle that a read is still using
//!
//! # Example
//!
//! ```ignore
//! use sequence_stitcher::backend::{HandlePool, ImageFileBackend, RegionRequest, Rect};
//!
//! let pool = HandlePool::new(ImageFileBackend::new());
//!
//! let handle = pool.acquire("tiles/img_x0_y0.png").await?;
//! let result = pool
//!     .backend()
//!     .read_region(handle.handle(), &RegionRequest::new(Rect::new(0, 0, 64, 64), 0, 0, 0))
//!     .await;
//! pool.release(handle).await;
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::BackendError;

use super::source::ImageBackend;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of paths whose idle handles are retained.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Idle handles kept per path; extra handles are closed on release.
const MAX_IDLE_PER_PATH: usize = 4;

// =============================================================================
// PooledHandle
// =============================================================================

/// A handle checked out of the pool.
///
/// Hand it back with [`HandlePool::release`] (healthy) or
/// [`HandlePool::discard`] (after a failed read).
pub struct PooledHandle<H> {
    path: String,
    handle: H,
}

impl<H> PooledHandle<H> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

// =============================================================================
// HandlePool
// =============================================================================

/// Bounded pool of reusable backend handles, keyed by path.
pub struct HandlePool<B: ImageBackend> {
    /// The backend that opens and reads files
    backend: B,

    /// Idle handles indexed by path
    idle: Mutex<LruCache<String, Vec<B::Handle>>>,

    /// Number of successful `open` calls, for diagnostics
    opened: AtomicUsize,
}

impl<B: ImageBackend> HandlePool<B> {
    /// Create a pool with the default capacity.
    pub fn new(backend: B) -> Self {
        Self::with_capacity(backend, DEFAULT_POOL_CAPACITY)
    }

    /// Create a pool retaining idle handles for at most `capacity` paths.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(backend: B, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            idle: Mutex::new(LruCache::new(capacity)),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Check out a handle for `path`, opening the file if no idle handle exists.
    pub async fn acquire(&self, path: &str) -> Result<PooledHandle<B::Handle>, BackendError> {
        // Fast path: reuse an idle handle
        {
            let mut idle = self.idle.lock().await;
            if let Some(handles) = idle.get_mut(path) {
                if let Some(handle) = handles.pop() {
                    if handles.is_empty() {
                        idle.pop(path);
                    }
                    return Ok(PooledHandle {
                        path: path.to_string(),
                        handle,
                    });
                }
            }
        }

        // Slow path: open outside the lock
        let handle = self.backend.open(path).await?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        debug!(path, "opened backend handle");

        Ok(PooledHandle {
            path: path.to_string(),
            handle,
        })
    }

    /// Return a handle to the pool.
    ///
    /// If the pool is full, the handles of the least recently used path are
    /// closed.
    pub async fn release(&self, pooled: PooledHandle<B::Handle>) {
        let PooledHandle { path, handle } = pooled;

        let mut to_close = Vec::new();
        {
            let mut idle = self.idle.lock().await;
            if let Some(handles) = idle.get_mut(&path) {
                if handles.len() < MAX_IDLE_PER_PATH {
                    handles.push(handle);
                } else {
                    to_close.push(handle);
                }
            } else if let Some((evicted_path, evicted)) = idle.push(path, vec![handle]) {
                debug!(path = %evicted_path, count = evicted.len(), "evicting idle handles");
                to_close.extend(evicted);
            }
        }

        for handle in to_close {
            self.backend.close(handle).await;
        }
    }

    /// Close a handle instead of returning it (e.g. after a read error).
    pub async fn discard(&self, pooled: PooledHandle<B::Handle>) {
        self.backend.close(pooled.handle).await;
    }

    /// Number of idle handles across all paths.
    pub async fn idle_count(&self) -> usize {
        let idle = self.idle.lock().await;
        idle.iter().map(|(_, handles)| handles.len()).sum()
    }

    /// Number of files opened through this pool so far.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Close every idle handle.
    pub async fn clear(&self) {
        let drained: Vec<B::Handle> = {
            let mut idle = self.idle.lock().await;
            let mut drained = Vec::new();
            while let Some((_, handles)) = idle.pop_lru() {
                drained.extend(handles);
            }
            drained
        };

        for handle in drained {
            self.backend.close(handle).await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

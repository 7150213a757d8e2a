//! Linear concatenation of per-file loads into sequences.
//!
//! The assembler walks a sorted stream of [`AssemblyEntry`] values. Each file
//! is loaded completely and either appended to the open accumulation set or,
//! when that is not allowed, the set is sealed into a [`Sequence`] and a new
//! one starts with the file.
//!
//! A set keeps one accumulation per channel value. Appending requires:
//! - the same outer series and image series
//! - on Z and on T, the entry still sits at the set's first value, or the
//!   files hold a single plane along that axis
//! - on C, an existing channel accumulation, or a single channel per file
//! - a free cell in the target channel accumulation
//! - a compatible signature
//!
//! Sealing merges the channel accumulations along C.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{HandlePool, ImageBackend, ImageTypeSignature, PixelBuffer, RegionRequest};
use crate::cancel::CancellationFlag;
use crate::error::{AssembleError, BackendError};
use crate::group::AssemblyEntry;

use super::sequence::Sequence;

// =============================================================================
// Outcome
// =============================================================================

/// A file that could not be loaded.
#[derive(Debug, Clone)]
pub struct FailedLoad {
    pub path: String,
    pub error: BackendError,
}

/// Result of assembling one stream.
#[derive(Debug, Clone, Default)]
pub struct AssemblyOutcome {
    pub sequences: Vec<Sequence>,
    pub failed: Vec<FailedLoad>,

    /// `true` when the stream stopped early on cancellation
    pub cancelled: bool,
}

// =============================================================================
// Accumulation
// =============================================================================

/// All planes of one file.
#[derive(Debug, Clone)]
struct LoadedUnit {
    signature: ImageTypeSignature,

    /// Z fastest, then T, then C
    planes: Vec<PixelBuffer>,
}

#[derive(Debug, Default)]
struct ChannelAccumulation {
    /// Units keyed by outer `(z, t)`
    units: HashMap<(u32, u32), LoadedUnit>,
}

#[derive(Debug)]
struct AccumulationSet {
    series: usize,
    image_series: usize,
    signature: ImageTypeSignature,
    first_z: u32,
    first_t: u32,
    channels: BTreeMap<u32, ChannelAccumulation>,
    paths: Vec<String>,
}

impl AccumulationSet {
    fn start(entry: &AssemblyEntry, unit: LoadedUnit) -> Self {
        let mut set = Self {
            series: entry.series,
            image_series: entry.image_series,
            signature: unit.signature,
            first_z: entry.z,
            first_t: entry.t,
            channels: BTreeMap::new(),
            paths: Vec::new(),
        };
        set.push(entry, unit);
        set
    }

    fn accepts(&self, entry: &AssemblyEntry, signature: &ImageTypeSignature) -> bool {
        let sig = &self.signature;
        let cell_taken = self
            .channels
            .get(&entry.c)
            .is_some_and(|ch| ch.units.contains_key(&(entry.z, entry.t)));

        entry.series == self.series
            && entry.image_series == self.image_series
            && (entry.z == self.first_z || sig.size_z == 1)
            && (entry.t == self.first_t || sig.size_t == 1)
            && (self.channels.contains_key(&entry.c) || sig.size_c == 1)
            && !cell_taken
            && sig.is_compatible(signature)
    }

    fn push(&mut self, entry: &AssemblyEntry, unit: LoadedUnit) {
        self.paths.push(entry.path.clone());
        self.channels
            .entry(entry.c)
            .or_default()
            .units
            .insert((entry.z, entry.t), unit);
    }

    /// Merge the channel accumulations into one sequence.
    fn seal(self) -> Sequence {
        let sig = self.signature;
        let zs: Vec<u32> = self
            .channels
            .values()
            .flat_map(|ch| ch.units.keys().map(|(z, _)| *z))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let ts: Vec<u32> = self
            .channels
            .values()
            .flat_map(|ch| ch.units.keys().map(|(_, t)| *t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Plane math runs in usize; reported sizes saturate at u32::MAX
        let (sz, st, sc) = (sig.size_z as usize, sig.size_t as usize, sig.size_c as usize);
        let size_z = zs.len().saturating_mul(sz);
        let size_t = ts.len().saturating_mul(st);
        let size_c = self.channels.len().saturating_mul(sc);
        let mut planes = vec![None; size_z.saturating_mul(size_t).saturating_mul(size_c)];

        for (ci, channel) in self.channels.into_values().enumerate() {
            for ((z, t), unit) in channel.units {
                let zi = zs.binary_search(&z).unwrap_or(0);
                let ti = ts.binary_search(&t).unwrap_or(0);

                for (i, plane) in unit.planes.into_iter().enumerate() {
                    let (iz, it, ic) = (i % sz, (i / sz) % st, i / (sz * st));
                    let gz = zi * sz + iz;
                    let gt = ti * st + it;
                    let gc = ci * sc + ic;
                    let index = gz + gt * size_z + gc * size_z * size_t;
                    if let Some(slot) = planes.get_mut(index) {
                        *slot = Some(plane);
                    }
                }
            }
        }
        let (size_z, size_t, size_c) = (saturate(size_z), saturate(size_t), saturate(size_c));

        let sequence = Sequence {
            series: self.series,
            image_series: self.image_series,
            signature: sig,
            size_z,
            size_t,
            size_c,
            paths: self.paths,
            planes,
        };
        info!(
            series = sequence.series,
            size_z,
            size_t,
            size_c,
            files = sequence.paths.len(),
            missing = sequence.missing_planes(),
            "sealed sequence"
        );
        sequence
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// =============================================================================
// SequenceAssembler
// =============================================================================

/// Loads files in stream order and concatenates them into sequences.
pub struct SequenceAssembler<B: ImageBackend> {
    pool: Arc<HandlePool<B>>,
}

impl<B: ImageBackend> SequenceAssembler<B> {
    pub fn new(pool: Arc<HandlePool<B>>) -> Self {
        Self { pool }
    }

    /// Assemble a sorted entry stream.
    ///
    /// Load failures are collected in [`AssemblyOutcome::failed`]. The call
    /// fails only when entries were given and none of them loaded.
    pub async fn assemble(
        &self,
        entries: &[AssemblyEntry],
        cancel: &CancellationFlag,
    ) -> Result<AssemblyOutcome, AssembleError> {
        let mut outcome = AssemblyOutcome::default();
        let mut current: Option<AccumulationSet> = None;
        let mut loaded = 0;

        for entry in entries {
            if cancel.is_cancelled() {
                info!(loaded, "assembly cancelled");
                outcome.cancelled = true;
                break;
            }

            let unit = match self.load(entry).await {
                Ok(unit) => unit,
                Err(error) => {
                    warn!(path = %entry.path, %error, "failed to load file");
                    outcome.failed.push(FailedLoad {
                        path: entry.path.clone(),
                        error,
                    });
                    continue;
                }
            };
            loaded += 1;

            match current.as_mut() {
                Some(set) if set.accepts(entry, &unit.signature) => {
                    debug!(path = %entry.path, c = entry.c, "appending to accumulation");
                    set.push(entry, unit);
                }
                _ => {
                    if let Some(set) = current.take() {
                        outcome.sequences.push(set.seal());
                    }
                    current = Some(AccumulationSet::start(entry, unit));
                }
            }
        }

        if let Some(set) = current {
            outcome.sequences.push(set.seal());
        }

        if loaded == 0 && !outcome.failed.is_empty() {
            return Err(AssembleError::NothingLoaded {
                attempted: outcome.failed.len(),
            });
        }
        Ok(outcome)
    }

    async fn load(&self, entry: &AssemblyEntry) -> Result<LoadedUnit, BackendError> {
        let pooled = self.pool.acquire(&entry.path).await?;
        match self.read_unit(pooled.handle(), entry).await {
            Ok(unit) => {
                self.pool.release(pooled).await;
                Ok(unit)
            }
            Err(e) => {
                self.pool.discard(pooled).await;
                Err(e)
            }
        }
    }

    async fn read_unit(&self, handle: &B::Handle, entry: &AssemblyEntry) -> Result<LoadedUnit, BackendError> {
        let backend = self.pool.backend();
        let count = backend.series_count(handle);
        if entry.image_series >= count {
            return Err(BackendError::InvalidSeries {
                path: entry.path.clone(),
                series: entry.image_series,
                count,
            });
        }

        let signature = backend.signature(handle, entry.image_series).await?;
        let mut planes = Vec::with_capacity(signature.plane_count() as usize);
        for c in 0..signature.size_c {
            for t in 0..signature.size_t {
                for z in 0..signature.size_z {
                    let request = RegionRequest::full_plane(entry.image_series, &signature, z, t, c);
                    planes.push(backend.read_region(handle, &request).await?);
                }
            }
        }

        Ok(LoadedUnit { signature, planes })
    }
}

// =============================================================================
// Tests
// =============================================================================

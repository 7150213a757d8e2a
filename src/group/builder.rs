//! Batch grouping.
//!
//! [`GroupBuilder::build`] turns a flat list of paths into [`SequenceGroup`]s:
//!
//! 1. parse every path and bucket the positions by base name
//! 2. open every file through the handle pool and read the signature of
//!    each of its series
//! 3. resolve the dimensions of each base using the first readable file
//! 4. split each base into sequences by filename series, image series and
//!    signature
//! 5. sort and compact every sequence
//!
//! Files that cannot be opened or inspected are reported in
//! [`GroupingOutcome::unplaced`]; they never abort the batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{HandlePool, ImageBackend, ImageTypeSignature};
use crate::cancel::CancellationFlag;
use crate::error::{BackendError, GroupError, SkipReason};
use crate::naming::{ClassifierVariant, DimensionTag, FilePosition, PositionResolver};

use super::sequence::{AssemblyEntry, SequenceGroup, SequenceIdent};

// =============================================================================
// Outcome
// =============================================================================

/// A path left out of every group.
#[derive(Debug, Clone)]
pub struct UnplacedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of grouping one batch.
#[derive(Debug, Clone, Default)]
pub struct GroupingOutcome {
    /// Groups in order of first appearance of their base name
    pub groups: Vec<SequenceGroup>,

    /// Paths that could not be placed, with the reason
    pub unplaced: Vec<UnplacedFile>,

    /// `true` when the batch stopped early on cancellation
    pub cancelled: bool,
}

impl GroupingOutcome {
    /// Linear loading stream over every group, tagged by group index.
    pub fn assembly_entries(&self) -> Vec<AssemblyEntry> {
        self.groups
            .iter()
            .enumerate()
            .flat_map(|(i, group)| group.assembly_entries(i))
            .collect()
    }

    /// Number of files placed into a group.
    pub fn placed_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries().len()).sum()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Files of one base name, in input order.
struct Bucket {
    base: String,
    members: Vec<FilePosition>,
}

/// Clusters paths into sequence groups.
pub struct GroupBuilder<B: ImageBackend> {
    pool: Arc<HandlePool<B>>,
    variant: ClassifierVariant,
    resolver: PositionResolver,
}

impl<B: ImageBackend> GroupBuilder<B> {
    pub fn new(pool: Arc<HandlePool<B>>) -> Self {
        Self {
            pool,
            variant: ClassifierVariant::default(),
            resolver: PositionResolver::new(),
        }
    }

    /// Use a different prefix classification table.
    pub fn with_variant(mut self, variant: ClassifierVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn pool(&self) -> &Arc<HandlePool<B>> {
        &self.pool
    }

    /// Group a batch of paths.
    ///
    /// Fails only when the batch is empty or no file could be opened at all.
    /// On cancellation the files inspected so far are grouped and returned with
    /// `cancelled` set.
    pub async fn build(
        &self,
        paths: &[String],
        cancel: &CancellationFlag,
    ) -> Result<GroupingOutcome, GroupError> {
        if paths.is_empty() {
            return Err(GroupError::EmptyInput);
        }

        let mut outcome = GroupingOutcome::default();
        let buckets = self.bucket(paths, &mut outcome);

        // Inspect every file
        let mut signatures: HashMap<String, Vec<ImageTypeSignature>> = HashMap::new();
        let mut attempted = 0;
        let mut opened = 0;

        'inspect: for bucket in &buckets {
            for position in &bucket.members {
                if cancel.is_cancelled() {
                    info!(attempted, "grouping cancelled");
                    outcome.cancelled = true;
                    break 'inspect;
                }
                attempted += 1;

                let path = position.path.as_str();
                match self.inspect(path).await {
                    Ok(sigs) => {
                        opened += 1;
                        signatures.insert(path.to_string(), sigs);
                    }
                    Err(reason) => {
                        if matches!(reason, SkipReason::SignatureReadFailure(_)) {
                            opened += 1;
                        }
                        warn!(path, %reason, "excluding file from grouping");
                        outcome.unplaced.push(UnplacedFile {
                            path: path.to_string(),
                            reason,
                        });
                    }
                }
            }
        }

        if attempted > 0 && opened == 0 {
            return Err(GroupError::NoBackendForAnyFile { attempted });
        }

        for bucket in buckets {
            let readable: Vec<FilePosition> = bucket
                .members
                .into_iter()
                .filter(|p| signatures.contains_key(&p.path))
                .collect();
            if readable.is_empty() {
                continue;
            }

            let representative = signatures
                .get(&readable[0].path)
                .and_then(|sigs| sigs.first())
                .copied();
            let resolved = self.resolver.resolve(&readable, representative.as_ref());
            debug!(base = %bucket.base, files = resolved.len(), "resolved base");

            let mut clusters: Vec<(SequenceIdent, Vec<FilePosition>)> = Vec::new();
            for position in resolved {
                let Some(sigs) = signatures.get(&position.path) else {
                    continue;
                };
                for (image_series, signature) in sigs.iter().enumerate() {
                    let ident = SequenceIdent {
                        base: bucket.base.clone(),
                        series: position.value(DimensionTag::Series),
                        image_series,
                        signature: *signature,
                    };
                    match clusters.iter_mut().find(|(key, _)| key.matches(&ident)) {
                        Some((_, members)) => members.push(position.clone()),
                        None => clusters.push((ident, vec![position.clone()])),
                    }
                }
            }

            for (ident, members) in clusters {
                outcome.groups.push(SequenceGroup::build(ident, members));
            }
        }

        info!(
            groups = outcome.groups.len(),
            unplaced = outcome.unplaced.len(),
            cancelled = outcome.cancelled,
            "grouping complete"
        );
        Ok(outcome)
    }

    /// Parse paths and bucket them by base, dropping duplicates.
    fn bucket(&self, paths: &[String], outcome: &mut GroupingOutcome) -> Vec<Bucket> {
        let mut seen = HashSet::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<Bucket> = Vec::new();

        for path in paths {
            if !seen.insert(path.as_str()) {
                debug!(path = %path, "duplicate path");
                outcome.unplaced.push(UnplacedFile {
                    path: path.clone(),
                    reason: SkipReason::Duplicate,
                });
                continue;
            }

            let position = FilePosition::parse(path, self.variant);
            match index.get(&position.base) {
                Some(&i) => buckets[i].members.push(position),
                None => {
                    index.insert(position.base.clone(), buckets.len());
                    buckets.push(Bucket {
                        base: position.base.clone(),
                        members: vec![position],
                    });
                }
            }
        }

        buckets
    }

    /// Open a file and read the signature of each of its series.
    async fn inspect(&self, path: &str) -> Result<Vec<ImageTypeSignature>, SkipReason> {
        let pooled = self
            .pool
            .acquire(path)
            .await
            .map_err(SkipReason::UnsupportedFile)?;

        let backend = self.pool.backend();
        let count = backend.series_count(pooled.handle());
        if count == 0 {
            self.pool.discard(pooled).await;
            return Err(SkipReason::SignatureReadFailure(BackendError::Metadata {
                path: path.to_string(),
                message: "file holds no image series".to_string(),
            }));
        }

        let mut sigs = Vec::with_capacity(count);
        for series in 0..count {
            match backend.signature(pooled.handle(), series).await {
                Ok(sig) => sigs.push(sig),
                Err(e) => {
                    self.pool.discard(pooled).await;
                    return Err(SkipReason::SignatureReadFailure(e));
                }
            }
        }

        self.pool.release(pooled).await;
        Ok(sigs)
    }
}

// =============================================================================
// Tests
// =============================================================================

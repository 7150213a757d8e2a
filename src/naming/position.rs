//! Per-file parsed position.

use serde::Serialize;

use super::classify::{classify_prefix, ClassifierVariant, DimensionTag};
use super::tokenizer::{split_path, tokenize};

/// A classified filename token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Letter run preceding the digits, as written in the filename
    pub raw_prefix: String,

    /// Dimension this chunk encodes, `None` while unclassified
    pub dimension: Option<DimensionTag>,

    /// Numeric value of the digit run
    pub value: i64,

    /// `true` when the dimension was guessed rather than read from the prefix
    pub inferred: bool,
}

impl Chunk {
    /// Copy of this chunk with a guessed dimension.
    pub fn promoted(&self, tag: DimensionTag) -> Self {
        Self {
            dimension: Some(tag),
            inferred: true,
            ..self.clone()
        }
    }

    /// Copy of this chunk with its dimension replaced, keeping provenance.
    pub fn retagged(&self, tag: DimensionTag) -> Self {
        Self {
            dimension: Some(tag),
            ..self.clone()
        }
    }
}

/// Parsed representation of one input path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePosition {
    /// Path as given by the caller
    pub path: String,

    /// Directory + filename with digit runs removed
    pub base: String,

    /// Chunks in filename order
    pub chunks: Vec<Chunk>,
}

impl FilePosition {
    /// Tokenize and classify a path.
    pub fn parse(path: &str, variant: ClassifierVariant) -> Self {
        let (stem, base) = split_path(path);
        let chunks = tokenize(&stem)
            .into_iter()
            .map(|token| Chunk {
                dimension: classify_prefix(&token.prefix, variant),
                raw_prefix: token.prefix,
                value: token.value,
                inferred: false,
            })
            .collect();

        Self {
            path: path.to_string(),
            base,
            chunks,
        }
    }

    /// Same file with a new chunk list.
    pub fn with_chunks(&self, chunks: Vec<Chunk>) -> Self {
        Self {
            path: self.path.clone(),
            base: self.base.clone(),
            chunks,
        }
    }

    /// Last chunk carrying `tag`.
    pub fn chunk(&self, tag: DimensionTag) -> Option<&Chunk> {
        self.chunks
            .iter()
            .rev()
            .find(|c| c.dimension == Some(tag))
    }

    /// Value of the last chunk carrying `tag`.
    pub fn value(&self, tag: DimensionTag) -> Option<i64> {
        self.chunk(tag).map(|c| c.value)
    }

    pub fn has(&self, tag: DimensionTag) -> bool {
        self.chunk(tag).is_some()
    }

    /// Unclassified chunks in filename order.
    pub fn unknown_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| c.dimension.is_none())
    }

    pub fn unknown_count(&self) -> usize {
        self.unknown_chunks().count()
    }

    /// Values of the `tag` chunks, in filename order.
    pub fn occurrences(&self, tag: DimensionTag) -> Vec<i64> {
        self.chunks
            .iter()
            .filter(|c| c.dimension == Some(tag))
            .map(|c| c.value)
            .collect()
    }

    /// Drop the `nth` chunk carrying `tag`.
    pub fn without_occurrence(&self, tag: DimensionTag, nth: usize) -> Self {
        let mut seen = 0;
        let chunks = self
            .chunks
            .iter()
            .filter(|c| {
                if c.dimension != Some(tag) {
                    return true;
                }
                let keep = seen != nth;
                seen += 1;
                keep
            })
            .cloned()
            .collect();
        self.with_chunks(chunks)
    }

    /// Keep only the last chunk per tag and drop unclassified chunks.
    pub fn keep_last(&self) -> Self {
        let mut kept: Vec<Chunk> = Vec::with_capacity(self.chunks.len());
        for chunk in self.chunks.iter().rev() {
            let Some(tag) = chunk.dimension else {
                continue;
            };
            if kept.iter().all(|k| k.dimension != Some(tag)) {
                kept.push(chunk.clone());
            }
        }
        kept.reverse();
        self.with_chunks(kept)
    }
}

//! Invocation storage and deduplication.
//!
//! Decoded invocations are merged into invocation sets: equivalence classes
//! of invocations touching exactly the same memory pages. Clustering then
//! works over the much smaller set collection.

use crate::trace::decoder::decode_trace;
use crate::utils::config::MATRIX_ELEMENT_BYTES;
use crate::utils::error::TraceError;
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One captured execution of the traced region.
///
/// Finalized by the decoder: the page set is sorted, deduplicated, and
/// hashed; the struct is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Positional index in trace order
    pub id: usize,

    /// Distinct pages touched across all subtraces, strictly increasing
    pub pages: Vec<i64>,

    /// Structural hash of the page set, used for deduplication
    pub hash: u64,

    /// Number of subtraces folded into this invocation
    pub subtrace_count: usize,
}

/// Equivalence class of invocations sharing an identical page set.
#[derive(Debug, Clone)]
pub struct InvocationSet {
    /// Member invocation ids, in encounter order
    pub invocations: Vec<usize>,

    /// Representative page set, shared by all members
    pub pages: Vec<i64>,

    /// Page-set hash for quick equality
    pub hash: u64,
}

impl InvocationSet {
    /// Number of distinct pages touched by this set
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Decoded trace: the invocation list plus its deduplicated sets.
#[derive(Debug)]
pub struct TraceStore {
    invocations: Vec<Invocation>,
    invocation_sets: Vec<InvocationSet>,
    invocation_count: usize,
    subtrace_count: usize,
}

impl TraceStore {
    /// Load and decode a binary trace file
    ///
    /// **Public** - main ingestion entry point
    ///
    /// # Errors
    /// * `TraceError::ReadFailed` - I/O error reading the file
    /// * decoding errors for malformed streams, see [`TraceError`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        info!("Parsing trace {}", path.display());
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a trace from an in-memory byte stream
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TraceError> {
        let invocations = decode_trace(bytes)?;
        let invocation_sets = generate_invocation_sets(&invocations);
        let invocation_count = invocations.len();
        let subtrace_count = invocations.iter().map(|i| i.subtrace_count).sum();

        debug!(
            "Found {} distinct invocation sets among {} invocations",
            invocation_sets.len(),
            invocation_count
        );

        Ok(Self {
            invocations,
            invocation_sets,
            invocation_count,
            subtrace_count,
        })
    }

    /// Total number of captured invocations
    pub fn invocation_count(&self) -> usize {
        self.invocation_count
    }

    /// Number of deduplicated invocation sets
    pub fn invocation_set_count(&self) -> usize {
        self.invocation_sets.len()
    }

    /// Total number of subtraces folded during decoding
    pub fn subtrace_count(&self) -> usize {
        self.subtrace_count
    }

    /// Deduplicated invocation sets, in encounter order
    pub fn invocation_sets(&self) -> &[InvocationSet] {
        &self.invocation_sets
    }

    /// Ordered invocation list; empty after [`Self::release_invocations`]
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Member invocation ids per set, the shape persisted in results
    pub fn invocation_set_ids(&self) -> Vec<Vec<usize>> {
        self.invocation_sets
            .iter()
            .map(|set| set.invocations.clone())
            .collect()
    }

    /// Bytes needed for a dense double-precision distance matrix over the
    /// invocation sets. Callers pre-flight big jobs against this estimate.
    pub fn estimate_needed_memory(&self) -> usize {
        self.invocation_set_count()
            .saturating_mul(self.invocation_set_count())
            .saturating_mul(MATRIX_ELEMENT_BYTES)
    }

    /// Drop the raw invocation list ahead of the O(n²) matrix allocation.
    /// Counts and invocation sets remain valid.
    pub fn release_invocations(&mut self) {
        self.invocations = Vec::new();
    }
}

/// Merge invocations with identical page sets into invocation sets
///
/// **Private** - dedup is keyed by hash but verified against the full page
/// set, so colliding hashes with different sets stay distinct.
fn generate_invocation_sets(invocations: &[Invocation]) -> Vec<InvocationSet> {
    let mut sets: Vec<InvocationSet> = Vec::new();
    let mut by_hash: HashMap<u64, Vec<usize>> = HashMap::new();

    for invocation in invocations {
        let candidates = by_hash.entry(invocation.hash).or_default();

        match candidates
            .iter()
            .find(|&&idx| sets[idx].pages == invocation.pages)
        {
            Some(&idx) => sets[idx].invocations.push(invocation.id),
            None => {
                candidates.push(sets.len());
                sets.push(InvocationSet {
                    invocations: vec![invocation.id],
                    pages: invocation.pages.clone(),
                    hash: invocation.hash,
                });
            }
        }
    }

    sets
}

//! Accumulated, deduplicated evidence for one query.

use super::chunk::{DedupKey, EvidenceChunk};
use crate::store::store_id::StoreId;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of a single [`EvidenceSet::merge`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Chunks appended to the set
    pub added: usize,
    /// Chunks dropped because their dedup key was already present
    pub duplicates: usize,
}

/// Ordered collection of evidence chunks, unique by dedup key.
///
/// The set only grows. After every merge the chunks are ordered by source
/// (in the order each source was first seen) and, within a source, by
/// descending relevance. Ties keep insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvidenceSet {
    chunks: Vec<EvidenceChunk>,
    #[serde(skip)]
    keys: HashSet<DedupKey>,
    source_order: Vec<StoreId>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one round's raw chunks into the set.
    ///
    /// Chunks whose key is already present (from earlier rounds or earlier
    /// in the same batch) are dropped; survivors keep their metadata
    /// unchanged. Merging the same batch twice is a no-op the second time.
    pub fn merge(&mut self, raw: impl IntoIterator<Item = EvidenceChunk>) -> MergeStats {
        let mut stats = MergeStats::default();

        for chunk in raw {
            if !self.source_order.contains(&chunk.source_db()) {
                self.source_order.push(chunk.source_db());
            }
            if self.keys.contains(chunk.dedup_key()) {
                stats.duplicates += 1;
                continue;
            }
            self.keys.insert(chunk.dedup_key().clone());
            self.chunks.push(chunk);
            stats.added += 1;
        }

        if stats.added > 0 {
            self.reorder();
        }
        stats
    }

    fn reorder(&mut self) {
        let order = &self.source_order;
        let rank = |store: StoreId| {
            order
                .iter()
                .position(|s| *s == store)
                .unwrap_or(order.len())
        };
        self.chunks.sort_by(|a, b| {
            rank(a.source_db())
                .cmp(&rank(b.source_db()))
                .then_with(|| b.relevance_score.total_cmp(&a.relevance_score))
        });
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvidenceChunk> {
        self.chunks.iter()
    }

    pub fn chunks(&self) -> &[EvidenceChunk] {
        &self.chunks
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    /// Find the chunk a citation refers to.
    pub fn find(&self, source_db: StoreId, locator: &str) -> Option<&EvidenceChunk> {
        self.chunks
            .iter()
            .find(|c| c.source_db() == source_db && c.locator() == locator)
    }

    /// Chunks grouped by source for presentation.
    ///
    /// Sources without chunks are omitted.
    pub fn grouped(&self) -> Vec<(StoreId, Vec<&EvidenceChunk>)> {
        self.source_order
            .iter()
            .map(|store| {
                let group: Vec<_> = self
                    .chunks
                    .iter()
                    .filter(|c| c.source_db() == *store)
                    .collect();
                (*store, group)
            })
            .filter(|(_, group)| !group.is_empty())
            .collect()
    }
}

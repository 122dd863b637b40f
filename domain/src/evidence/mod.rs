//! Evidence: retrieved chunks and the per-query accumulated set.
//!
//! - [`chunk::EvidenceChunk`]: one retrieved unit with its dedup key
//! - [`evidence_set::EvidenceSet`]: monotonic, deduplicated collection

pub mod chunk;
pub mod evidence_set;

//! Evidence chunk value object

use crate::store::metadata::ChunkMetadata;
use crate::store::store_id::StoreId;
use serde::Serialize;

/// Number of hex characters of the dedup key used as a fallback locator
const SHORT_KEY_LEN: usize = 12;

/// Deterministic identity of a chunk: `blake3(source_db ++ "\0" ++ content)`.
///
/// Identical content retrieved twice from the same store collapses to one
/// entry; the same text in two different stores stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn derive(source_db: StoreId, content: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source_db.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(content.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..SHORT_KEY_LEN.min(self.0.len())]
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One retrieved unit of content plus its store metadata and relevance
///
/// `content` and `source_db` are read-only so the dedup key can never drift
/// from the data it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceChunk {
    content: String,
    source_db: StoreId,
    pub metadata: ChunkMetadata,
    pub relevance_score: f64,
    dedup_key: DedupKey,
}

impl EvidenceChunk {
    /// Build a chunk, deriving its dedup key.
    ///
    /// Non-finite scores are stored as `0.0` so ordering stays total.
    pub fn new(
        source_db: StoreId,
        content: impl Into<String>,
        metadata: ChunkMetadata,
        relevance_score: f64,
    ) -> Self {
        let content = content.into();
        let dedup_key = DedupKey::derive(source_db, &content);
        Self {
            content,
            source_db,
            metadata,
            relevance_score: if relevance_score.is_finite() {
                relevance_score
            } else {
                0.0
            },
            dedup_key,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source_db(&self) -> StoreId {
        self.source_db
    }

    pub fn dedup_key(&self) -> &DedupKey {
        &self.dedup_key
    }

    /// Citation locator: metadata-derived, falling back to the short dedup key.
    pub fn locator(&self) -> String {
        self.metadata
            .locator()
            .unwrap_or_else(|| format!("chunk:{}", self.dedup_key.short()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::metadata::{DocsMetadata, TicketMetadata};

    fn docs_meta() -> ChunkMetadata {
        ChunkMetadata::Docs(DocsMetadata {
            doc_type: "guide".to_string(),
            section: "login".to_string(),
            version: None,
        })
    }

    #[test]
    fn test_dedup_key_is_deterministic() {
        let a = EvidenceChunk::new(StoreId::Docs, "JWT tokens expire", docs_meta(), 0.9);
        let b = EvidenceChunk::new(StoreId::Docs, "JWT tokens expire", docs_meta(), 0.1);
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key().as_str().len(), 64);
    }

    #[test]
    fn test_dedup_key_depends_on_store() {
        let docs = DedupKey::derive(StoreId::Docs, "same text");
        let code = DedupKey::derive(StoreId::Code, "same text");
        assert_ne!(docs, code);
    }

    #[test]
    fn test_non_finite_score_is_zeroed() {
        let chunk = EvidenceChunk::new(StoreId::Docs, "x", docs_meta(), f64::NAN);
        assert_eq!(chunk.relevance_score, 0.0);
    }

    #[test]
    fn test_locator_falls_back_to_short_key() {
        let meta = ChunkMetadata::Tickets(TicketMetadata {
            ticket_id: String::new(),
            status: "open".to_string(),
            severity: "low".to_string(),
            created_at: None,
        });
        let chunk = EvidenceChunk::new(StoreId::Tickets, "timeout on login", meta, 0.5);
        let locator = chunk.locator();
        assert!(locator.starts_with("chunk:"));
        assert_eq!(locator.len(), "chunk:".len() + 12);
    }
}

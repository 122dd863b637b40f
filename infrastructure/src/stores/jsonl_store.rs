//! JSONL-backed semantic store.
//!
//! Records live in memory behind an `RwLock` and are ranked by lexical term
//! overlap with the query. `store()` appends one line to the backing file
//! with a fresh UUID chunk id; existing lines are never rewritten.

use crate::text::{overlap, terms};
use async_trait::async_trait;
use evidence_application::ports::semantic_store::{
    ScoredRecord, SemanticStore, StoreError, StoreRecord,
};
use evidence_domain::{ChunkMetadata, StoreId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Errors reading an ingestion file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// One persisted line
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    chunk_id: String,
    content: String,
    metadata: ChunkMetadata,
}

/// A stored chunk with its precomputed terms
struct IndexedChunk {
    chunk: StoredChunk,
    terms: BTreeSet<String>,
}

impl IndexedChunk {
    fn new(chunk: StoredChunk) -> Self {
        let mut index_terms = terms(&chunk.content);
        if let Some(locator) = chunk.metadata.locator() {
            index_terms.extend(terms(&locator));
        }
        Self {
            chunk,
            terms: index_terms,
        }
    }
}

/// Semantic store over a local JSONL file
pub struct JsonlSemanticStore {
    id: StoreId,
    path: PathBuf,
    records: RwLock<Vec<IndexedChunk>>,
    append_lock: tokio::sync::Mutex<()>,
}

impl JsonlSemanticStore {
    /// Open `<data_dir>/<store>.jsonl`.
    pub fn in_dir(data_dir: impl AsRef<Path>, id: StoreId) -> Result<Self, StoreError> {
        Self::open(id, data_dir.as_ref().join(format!("{}.jsonl", id.as_str())))
    }

    /// Open the store file at `path`; a missing file is an empty store.
    ///
    /// Lines that fail to parse or carry another store's metadata are
    /// skipped with a warning.
    pub fn open(id: StoreId, path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredChunk>(line) {
                Ok(chunk) if chunk.metadata.matches(id) => records.push(IndexedChunk::new(chunk)),
                Ok(_) => warn!(
                    "{}:{}: metadata belongs to another store, skipped",
                    path.display(),
                    index + 1
                ),
                Err(e) => warn!("{}:{}: skipped malformed line: {}", path.display(), index + 1, e),
            }
        }
        debug!("Opened {} store with {} records", id, records.len());

        Ok(Self {
            id,
            path,
            records: RwLock::new(records),
            append_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn append_line(&self, line: &str) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl SemanticStore for JsonlSemanticStore {
    fn store_id(&self) -> StoreId {
        self.id
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredRecord>, StoreError> {
        let query_terms = terms(text);
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("store index poisoned".to_string()))?;

        let mut hits: Vec<(f64, &StoredChunk)> = records
            .iter()
            .map(|indexed| (overlap(&query_terms, &indexed.terms), &indexed.chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        hits.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(hits
            .into_iter()
            .take(top_k)
            .map(|(score, chunk)| ScoredRecord {
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                relevance_score: score,
            })
            .collect())
    }

    async fn store(&self, record: StoreRecord) -> Result<String, StoreError> {
        if !record.metadata.matches(self.id) {
            return Err(StoreError::WriteError(format!(
                "{} metadata cannot be stored in {}",
                record.metadata.store(),
                self.id
            )));
        }
        if record.content.trim().is_empty() {
            return Err(StoreError::WriteError("content is empty".to_string()));
        }

        let chunk = StoredChunk {
            chunk_id: uuid::Uuid::new_v4().to_string(),
            content: record.content,
            metadata: record.metadata,
        };
        let line =
            serde_json::to_string(&chunk).map_err(|e| StoreError::WriteError(e.to_string()))?;

        let _guard = self.append_lock.lock().await;
        self.append_line(&line)
            .await
            .map_err(|e| StoreError::WriteError(format!("{}: {}", self.path.display(), e)))?;

        let chunk_id = chunk.chunk_id.clone();
        self.records
            .write()
            .map_err(|_| StoreError::WriteError("store index poisoned".to_string()))?
            .push(IndexedChunk::new(chunk));
        info!("Stored {} chunk {}", self.id, chunk_id);
        Ok(chunk_id)
    }
}

/// Read ingestion records, one `{"content", "metadata"}` object per line.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<StoreRecord>, IngestError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<StoreRecord>(line).map_err(|e| IngestError::Malformed {
                path: path.to_path_buf(),
                line: index + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_domain::{CodeMetadata, DocsMetadata, MemoryMetadata};
    use std::sync::Arc;

    fn docs(section: &str, content: &str) -> StoreRecord {
        StoreRecord {
            content: content.to_string(),
            metadata: ChunkMetadata::Docs(DocsMetadata {
                doc_type: "guide".to_string(),
                section: section.to_string(),
                version: None,
            }),
        }
    }

    fn memory(content: &str) -> StoreRecord {
        StoreRecord {
            content: content.to_string(),
            metadata: ChunkMetadata::Memory(MemoryMetadata {
                learned_from: "How does login work?".to_string(),
                confidence: 0.8,
                tags: vec!["login".to_string()],
                created_at: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSemanticStore::in_dir(dir.path(), StoreId::Docs).unwrap();
        store
            .store(docs("auth", "Authentication uses JWT bearer tokens."))
            .await
            .unwrap();
        store
            .store(docs("deploy", "Deployments roll out with blue green switching."))
            .await
            .unwrap();
        store
            .store(docs("tokens", "Refresh tokens rotate daily."))
            .await
            .unwrap();

        let hits = store.query("How does JWT authentication work?", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("JWT"));
        assert_eq!(hits[0].relevance_score, 1.0);

        let hits = store.query("jwt tokens", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("JWT"));
    }

    #[tokio::test]
    async fn test_store_appends_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let first_id;
        {
            let store = JsonlSemanticStore::in_dir(dir.path(), StoreId::Memory).unwrap();
            first_id = store.store(memory("Login uses SSO.")).await.unwrap();
            let second_id = store.store(memory("Login uses SSO.")).await.unwrap();
            assert_ne!(first_id, second_id);
        }

        let reopened = JsonlSemanticStore::in_dir(dir.path(), StoreId::Memory).unwrap();
        assert_eq!(reopened.len(), 2);
        let content = std::fs::read_to_string(reopened.path()).unwrap();
        assert!(content.lines().next().unwrap().contains(&first_id));
    }

    #[tokio::test]
    async fn test_concurrent_writes_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonlSemanticStore::in_dir(dir.path(), StoreId::Memory).unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.store(memory(&format!("Insight number {}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = JsonlSemanticStore::in_dir(dir.path(), StoreId::Memory).unwrap();
        assert_eq!(reopened.len(), 8);
    }

    #[tokio::test]
    async fn test_rejects_foreign_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSemanticStore::in_dir(dir.path(), StoreId::Code).unwrap();
        let err = store.store(docs("auth", "JWT")).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteError(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.jsonl");
        let good = serde_json::json!({
            "chunk_id": "c1",
            "content": "fn login() {}",
            "metadata": {"kind": "code", "file_path": "src/login.rs"}
        });
        let foreign = serde_json::json!({
            "chunk_id": "d1",
            "content": "Login guide",
            "metadata": {"kind": "docs", "doc_type": "guide", "section": "login"}
        });
        std::fs::write(&path, format!("{}\nnot json\n\n{}\n", good, foreign)).unwrap();

        let store = JsonlSemanticStore::open(StoreId::Code, &path).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_locator_terms_are_searchable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSemanticStore::in_dir(dir.path(), StoreId::Code).unwrap();
        store
            .store(StoreRecord {
                content: "fn verify(token: &str) -> bool".to_string(),
                metadata: ChunkMetadata::Code(CodeMetadata {
                    file_path: "src/middleware/auth.rs".to_string(),
                    language: "rust".to_string(),
                    function_name: Some("verify".to_string()),
                    line_range: None,
                }),
            })
            .await
            .unwrap();

        let hits = store.query("middleware", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_read_records_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.jsonl");
        let record = serde_json::to_string(&docs("auth", "JWT")).unwrap();
        std::fs::write(&path, format!("{}\n{{\"content\": 1}}\n", record)).unwrap();

        match read_records(&path) {
            Err(IngestError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed line error, got {:?}", other),
        }

        std::fs::write(&path, format!("{}\n\n{}\n", record, record)).unwrap();
        assert_eq!(read_records(&path).unwrap().len(), 2);
    }
}

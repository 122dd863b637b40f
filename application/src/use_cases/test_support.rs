//! Scripted oracle and in-memory stores shared by use case tests.

use crate::ports::oracle::{OracleError, OracleRequest, OracleSchema, ReasoningOracle};
use crate::ports::semantic_store::{ScoredRecord, SemanticStore, StoreError, StoreRecord};
use async_trait::async_trait;
use evidence_domain::{
    ChunkMetadata, CodeMetadata, DocsMetadata, MemoryMetadata, StoreId, TicketMetadata,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Oracle answering each schema from its own queue.
///
/// The last entry of a queue is sticky: once only one response remains it
/// is returned for every further call.
pub(crate) struct ScriptedOracle {
    scripts: Mutex<HashMap<OracleSchema, VecDeque<Result<Value, OracleError>>>>,
    calls: Mutex<Vec<OracleSchema>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, schema: OracleSchema, value: Value) -> Self {
        self.push(schema, Ok(value))
    }

    pub fn fail(self, schema: OracleSchema, error: OracleError) -> Self {
        self.push(schema, Err(error))
    }

    fn push(self, schema: OracleSchema, response: Result<Value, OracleError>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(schema)
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self, schema: OracleSchema) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == schema)
            .count()
    }

    pub fn requests(&self, schema: OracleSchema) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.schema == schema)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        self.calls.lock().unwrap().push(request.schema);
        self.requests.lock().unwrap().push(request.clone());
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(&request.schema)
            .ok_or_else(|| OracleError::Unavailable(format!("no script for {}", request.schema)))?;
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(OracleError::Unavailable("script exhausted".to_string())))
        }
    }
}

/// Oracle that never answers
pub(crate) struct HangingOracle;

#[async_trait]
impl ReasoningOracle for HangingOracle {
    async fn complete(&self, _request: &OracleRequest) -> Result<Value, OracleError> {
        std::future::pending().await
    }
}

/// In-memory store with scripted query responses (last one sticky)
pub(crate) struct MockStore {
    id: StoreId,
    responses: Mutex<VecDeque<Result<Vec<ScoredRecord>, StoreError>>>,
    delay: Option<Duration>,
    queries: Mutex<Vec<(String, usize)>>,
    writes: Mutex<Vec<StoreRecord>>,
    fail_writes: bool,
}

impl MockStore {
    pub fn returning(id: StoreId, records: Vec<ScoredRecord>) -> Self {
        Self::scripted(id, vec![Ok(records)])
    }

    pub fn failing(id: StoreId, error: StoreError) -> Self {
        Self::scripted(id, vec![Err(error)])
    }

    pub fn scripted(id: StoreId, responses: Vec<Result<Vec<ScoredRecord>, StoreError>>) -> Self {
        Self {
            id,
            responses: Mutex::new(responses.into()),
            delay: None,
            queries: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<StoreRecord> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SemanticStore for MockStore {
    fn store_id(&self) -> StoreId {
        self.id
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredRecord>, StoreError> {
        self.queries.lock().unwrap().push((text.to_string(), top_k));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        response
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(|records| records.into_iter().take(top_k).collect())
    }

    async fn store(&self, record: StoreRecord) -> Result<String, StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteError("disk full".to_string()));
        }
        let mut writes = self.writes.lock().unwrap();
        writes.push(record);
        Ok(format!("{}-{}", self.id, writes.len()))
    }
}

// ==================== Record builders ====================

pub(crate) fn docs_record(section: &str, content: &str, score: f64) -> ScoredRecord {
    ScoredRecord {
        content: content.to_string(),
        metadata: ChunkMetadata::Docs(DocsMetadata {
            doc_type: "guide".to_string(),
            section: section.to_string(),
            version: None,
        }),
        relevance_score: score,
    }
}

pub(crate) fn code_record(path: &str, content: &str, score: f64) -> ScoredRecord {
    ScoredRecord {
        content: content.to_string(),
        metadata: ChunkMetadata::Code(CodeMetadata {
            file_path: path.to_string(),
            language: "rust".to_string(),
            function_name: None,
            line_range: None,
        }),
        relevance_score: score,
    }
}

pub(crate) fn ticket_record(id: &str, content: &str, score: f64) -> ScoredRecord {
    ScoredRecord {
        content: content.to_string(),
        metadata: ChunkMetadata::Tickets(TicketMetadata {
            ticket_id: id.to_string(),
            status: "resolved".to_string(),
            severity: "high".to_string(),
            created_at: None,
        }),
        relevance_score: score,
    }
}

pub(crate) fn memory_record(tag: &str, content: &str, score: f64) -> ScoredRecord {
    ScoredRecord {
        content: content.to_string(),
        metadata: ChunkMetadata::Memory(MemoryMetadata {
            learned_from: "earlier question".to_string(),
            confidence: 0.8,
            tags: vec![tag.to_string()],
            created_at: None,
        }),
        relevance_score: score,
    }
}

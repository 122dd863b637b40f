//! Write Insight use case
//!
//! Best-effort write of a learned insight into the memory store after an
//! answer is final. Every failure is reported as an outcome, never as an
//! error, so it cannot affect the response.

use crate::ports::semantic_store::{SemanticStore, StoreRecord};
use evidence_domain::{Answer, InsightPolicy, InsightRecord, InsightSkip, QueryIntent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to the insight
#[derive(Debug, Clone, PartialEq)]
pub enum InsightOutcome {
    Written { chunk_id: String, record: InsightRecord },
    Skipped(InsightSkip),
    /// The memory store already holds the same insight
    Duplicate,
    Failed(String),
}

/// Use case for persisting learned insights
pub struct WriteInsightUseCase {
    memory: Option<Arc<dyn SemanticStore>>,
    policy: InsightPolicy,
    timeout: Duration,
}

impl WriteInsightUseCase {
    pub fn new(
        memory: Option<Arc<dyn SemanticStore>>,
        policy: InsightPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            memory,
            policy,
            timeout,
        }
    }

    pub async fn execute(
        &self,
        intent: &QueryIntent,
        answer: &Answer,
        degraded: bool,
    ) -> InsightOutcome {
        let Some(memory) = &self.memory else {
            return InsightOutcome::Skipped(InsightSkip::Disabled);
        };
        let record = match self.policy.evaluate(intent, answer, degraded) {
            Ok(record) => record,
            Err(skip) => {
                debug!("No insight written: {}", skip.as_str());
                return InsightOutcome::Skipped(skip);
            }
        };

        match tokio::time::timeout(self.timeout, memory.query(&record.content, 1)).await {
            Ok(Ok(hits)) if hits.first().is_some_and(|hit| record.duplicates(&hit.content)) => {
                debug!("Insight already in memory, skipping write");
                return InsightOutcome::Duplicate;
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("Duplicate check failed, writing anyway: {}", e),
            Err(_) => debug!("Duplicate check timed out, writing anyway"),
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let store_record = StoreRecord {
            content: record.content.clone(),
            metadata: record.metadata(created_at),
        };
        match tokio::time::timeout(self.timeout, memory.store(store_record)).await {
            Ok(Ok(chunk_id)) => {
                info!("Insight written to memory as {}", chunk_id);
                InsightOutcome::Written { chunk_id, record }
            }
            Ok(Err(e)) => {
                warn!("Memory write failed: {}", e);
                InsightOutcome::Failed(e.to_string())
            }
            Err(_) => {
                warn!("Memory write timed out");
                InsightOutcome::Failed("memory write timed out".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{MockStore, memory_record};
    use evidence_domain::{ChunkMetadata, Complexity, IntentCategory, Question, StoreId};

    fn intent() -> QueryIntent {
        QueryIntent::new(
            &Question::new("How does authentication work?"),
            IntentCategory::Explanation,
            "authentication",
            Complexity::Medium,
            false,
        )
    }

    fn answer(insight: Option<&str>) -> Answer {
        Answer {
            answer: "JWT".to_string(),
            confidence: 0.9,
            citations: Vec::new(),
            learned_insight: insight.map(String::from),
        }
    }

    fn writer(store: Arc<MockStore>) -> WriteInsightUseCase {
        WriteInsightUseCase::new(
            Some(store as Arc<dyn SemanticStore>),
            InsightPolicy::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_writes_memory_record() {
        let store = Arc::new(MockStore::returning(StoreId::Memory, Vec::new()));
        let outcome = writer(store.clone())
            .execute(&intent(), &answer(Some("Auth uses JWT.")), false)
            .await;
        assert!(matches!(outcome, InsightOutcome::Written { .. }));

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].content, "Auth uses JWT.");
        match &writes[0].metadata {
            ChunkMetadata::Memory(meta) => {
                assert_eq!(meta.learned_from, "How does authentication work?");
                assert!(meta.created_at.is_some());
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_is_not_rewritten() {
        let store = Arc::new(MockStore::returning(
            StoreId::Memory,
            vec![memory_record("authentication", "Auth uses JWT.", 0.99)],
        ));
        let outcome = writer(store.clone())
            .execute(&intent(), &answer(Some("Auth uses JWT.")), false)
            .await;
        assert_eq!(outcome, InsightOutcome::Duplicate);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_raised() {
        let store = Arc::new(MockStore::returning(StoreId::Memory, Vec::new()).with_failing_writes());
        let outcome = writer(store)
            .execute(&intent(), &answer(Some("Auth uses JWT.")), false)
            .await;
        assert!(matches!(outcome, InsightOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_degraded_answer_skipped() {
        let store = Arc::new(MockStore::returning(StoreId::Memory, Vec::new()));
        let outcome = writer(store.clone())
            .execute(&intent(), &answer(Some("Auth uses JWT.")), true)
            .await;
        assert_eq!(outcome, InsightOutcome::Skipped(InsightSkip::Degraded));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_no_memory_store_skips() {
        let use_case =
            WriteInsightUseCase::new(None, InsightPolicy::default(), Duration::from_secs(5));
        let outcome = use_case
            .execute(&intent(), &answer(Some("Auth uses JWT.")), false)
            .await;
        assert_eq!(outcome, InsightOutcome::Skipped(InsightSkip::Disabled));
    }
}

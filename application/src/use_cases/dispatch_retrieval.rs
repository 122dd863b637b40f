//! Dispatch Retrieval use case
//!
//! Executes a [`StorePlan`] against the store adapters.
//!
//! - **Parallel**: every selected store is queried concurrently and the
//!   round waits for all of them. Results are assembled in canonical store
//!   order, so the output does not depend on completion order.
//! - **Sequential**: stores are queried one at a time in canonical order
//!   (docs → code → tickets → memory). With a relevance threshold
//!   configured, the round stops once enough high-relevance chunks are in.
//!
//! A failing store never fails the round; it is reported in
//! [`RetrievalResult::failed`].

use crate::config::RetrievalParams;
use crate::ports::progress::ProgressNotifier;
use crate::ports::semantic_store::{ScoredRecord, SemanticStore, StoreError, StoreRegistry};
use crate::use_cases::shared::{Cancelled, cancellable, check_cancelled};
use evidence_domain::{EvidenceChunk, Question, RetrievalStrategy, StoreId, StorePlan};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Raw output of one round, not yet merged
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub chunks: Vec<EvidenceChunk>,
    pub succeeded: BTreeSet<StoreId>,
    pub failed: BTreeSet<StoreId>,
    /// Selected stores skipped by the sequential short-circuit
    pub skipped: BTreeSet<StoreId>,
}

impl RetrievalResult {
    fn absorb(&mut self, store: StoreId, result: Result<Vec<EvidenceChunk>, StoreError>) {
        match result {
            Ok(chunks) => {
                self.succeeded.insert(store);
                self.chunks.extend(chunks);
            }
            Err(_) => {
                self.failed.insert(store);
            }
        }
    }
}

/// Use case for querying the stores of one plan
pub struct DispatchRetrievalUseCase {
    stores: Arc<StoreRegistry>,
    params: RetrievalParams,
}

impl DispatchRetrievalUseCase {
    pub fn new(stores: Arc<StoreRegistry>, params: RetrievalParams) -> Self {
        Self { stores, params }
    }

    /// Query the plan's stores with the original query text.
    pub async fn execute(
        &self,
        plan: &StorePlan,
        query: &Question,
        progress: &dyn ProgressNotifier,
        cancellation: &Option<CancellationToken>,
    ) -> Result<RetrievalResult, Cancelled> {
        check_cancelled(cancellation)?;
        info!("Round {}: querying {}", plan.round(), plan);

        let result = match plan.strategy() {
            RetrievalStrategy::Parallel => {
                self.parallel(plan, query, progress, cancellation).await?
            }
            RetrievalStrategy::Sequential => {
                self.sequential(plan, query, progress, cancellation).await?
            }
        };

        if !result.failed.is_empty() {
            warn!(
                "Round {}: {} of {} stores failed",
                plan.round(),
                result.failed.len(),
                plan.selected_stores().len()
            );
        }
        Ok(result)
    }

    async fn parallel(
        &self,
        plan: &StorePlan,
        query: &Question,
        progress: &dyn ProgressNotifier,
        cancellation: &Option<CancellationToken>,
    ) -> Result<RetrievalResult, Cancelled> {
        let mut join_set = JoinSet::new();
        let mut outcomes: BTreeMap<StoreId, Result<Vec<EvidenceChunk>, StoreError>> =
            BTreeMap::new();

        for store_id in plan.ordered() {
            let Some(store) = self.stores.get(store_id) else {
                outcomes.insert(store_id, Err(missing_adapter(store_id)));
                continue;
            };
            let text = query.content().to_string();
            let top_k = self.params.top_k;
            let timeout = self.params.store_timeout;
            join_set.spawn(async move {
                let result = query_store(store.as_ref(), &text, top_k, timeout).await;
                (store_id, result)
            });
        }

        loop {
            let joined = if let Some(token) = cancellation {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        join_set.abort_all();
                        return Err(Cancelled);
                    }
                    joined = join_set.join_next() => joined,
                }
            } else {
                join_set.join_next().await
            };
            let Some(joined) = joined else { break };

            match joined {
                Ok((store_id, result)) => {
                    outcomes.insert(store_id, result);
                }
                Err(e) => warn!("Store task join error: {}", e),
            }
        }

        let mut result = RetrievalResult::default();
        for store_id in plan.ordered() {
            let outcome = outcomes
                .remove(&store_id)
                .unwrap_or_else(|| Err(StoreError::Unavailable("query task aborted".to_string())));
            report(progress, store_id, &outcome);
            result.absorb(store_id, outcome);
        }
        Ok(result)
    }

    async fn sequential(
        &self,
        plan: &StorePlan,
        query: &Question,
        progress: &dyn ProgressNotifier,
        cancellation: &Option<CancellationToken>,
    ) -> Result<RetrievalResult, Cancelled> {
        let mut result = RetrievalResult::default();
        let mut high_relevance = 0;

        for store_id in plan.ordered() {
            if let Some(threshold) = self.params.relevance_threshold
                && high_relevance >= self.params.sufficient_hits
            {
                debug!(
                    "Short-circuit: {} chunks at or above {:.2}, skipping {}",
                    high_relevance, threshold, store_id
                );
                result.skipped.insert(store_id);
                continue;
            }

            check_cancelled(cancellation)?;
            let outcome = match self.stores.get(store_id) {
                Some(store) => {
                    cancellable(
                        cancellation,
                        query_store(
                            store.as_ref(),
                            query.content(),
                            self.params.top_k,
                            self.params.store_timeout,
                        ),
                    )
                    .await?
                }
                None => Err(missing_adapter(store_id)),
            };

            if let (Some(threshold), Ok(chunks)) = (self.params.relevance_threshold, &outcome) {
                high_relevance += chunks
                    .iter()
                    .filter(|c| c.relevance_score >= threshold)
                    .count();
            }
            report(progress, store_id, &outcome);
            result.absorb(store_id, outcome);
        }
        Ok(result)
    }
}

fn missing_adapter(store: StoreId) -> StoreError {
    StoreError::Unavailable(format!("no adapter registered for {}", store))
}

fn report(
    progress: &dyn ProgressNotifier,
    store: StoreId,
    outcome: &Result<Vec<EvidenceChunk>, StoreError>,
) {
    match outcome {
        Ok(chunks) => progress.on_store_complete(store, Ok(chunks.len())),
        Err(e) => {
            warn!("Store {} failed: {}", store, e);
            progress.on_store_complete(store, Err(e));
        }
    }
}

/// Query one store with a timeout and convert its hits into chunks.
///
/// Hits whose metadata belongs to another store are malformed and dropped.
async fn query_store(
    store: &dyn SemanticStore,
    text: &str,
    top_k: usize,
    timeout: Duration,
) -> Result<Vec<EvidenceChunk>, StoreError> {
    let store_id = store.store_id();
    let records = tokio::time::timeout(timeout, store.query(text, top_k))
        .await
        .map_err(|_| StoreError::Timeout)??;

    let total = records.len();
    let chunks: Vec<EvidenceChunk> = records
        .into_iter()
        .filter_map(|record| into_chunk(store_id, record))
        .collect();
    if chunks.len() < total {
        warn!(
            "Dropped {} malformed records from {}",
            total - chunks.len(),
            store_id
        );
    }
    debug!("{} returned {} chunks", store_id, chunks.len());
    Ok(chunks)
}

fn into_chunk(store_id: StoreId, record: ScoredRecord) -> Option<EvidenceChunk> {
    if !record.metadata.matches(store_id) || record.content.trim().is_empty() {
        return None;
    }
    Some(EvidenceChunk::new(
        store_id,
        record.content,
        record.metadata,
        record.relevance_score,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::progress::NoProgress;
    use crate::use_cases::test_support::{
        MockStore, code_record, docs_record, memory_record, ticket_record,
    };

    fn set(stores: &[StoreId]) -> BTreeSet<StoreId> {
        stores.iter().copied().collect()
    }

    fn plan(stores: &[StoreId], strategy: RetrievalStrategy) -> StorePlan {
        StorePlan::new(set(stores), strategy, 1).unwrap()
    }

    fn question() -> Question {
        Question::new("How does authentication work?")
    }

    #[tokio::test]
    async fn test_parallel_partial_failure() {
        let docs = Arc::new(MockStore::returning(
            StoreId::Docs,
            vec![docs_record("auth", "JWT auth", 0.9)],
        ));
        let code = Arc::new(MockStore::failing(
            StoreId::Code,
            StoreError::Unavailable("connection refused".to_string()),
        ));
        let registry = StoreRegistry::new().with_store(docs.clone()).with_store(code);
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), RetrievalParams::default());

        let result = use_case
            .execute(
                &plan(&[StoreId::Docs, StoreId::Code], RetrievalStrategy::Parallel),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();

        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.succeeded, set(&[StoreId::Docs]));
        assert_eq!(result.failed, set(&[StoreId::Code]));
        assert_eq!(docs.queries(), vec![("How does authentication work?".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_missing_adapter_counts_as_failure() {
        let use_case =
            DispatchRetrievalUseCase::new(Arc::new(StoreRegistry::new()), RetrievalParams::default());
        let result = use_case
            .execute(
                &plan(&[StoreId::Tickets], RetrievalStrategy::Sequential),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();
        assert_eq!(result.failed, set(&[StoreId::Tickets]));
        assert!(result.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_output_in_canonical_order() {
        let registry = StoreRegistry::new()
            .with_store(Arc::new(
                MockStore::returning(StoreId::Docs, vec![docs_record("a", "docs text", 0.5)])
                    .with_delay(Duration::from_millis(30)),
            ))
            .with_store(Arc::new(MockStore::returning(
                StoreId::Memory,
                vec![memory_record("auth", "memory text", 0.5)],
            )));
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), RetrievalParams::default());
        let result = use_case
            .execute(
                &plan(&[StoreId::Memory, StoreId::Docs], RetrievalStrategy::Parallel),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();
        let sources: Vec<_> = result.chunks.iter().map(|c| c.source_db()).collect();
        assert_eq!(sources, vec![StoreId::Docs, StoreId::Memory]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_is_failure() {
        let registry = StoreRegistry::new().with_store(Arc::new(
            MockStore::returning(StoreId::Code, vec![code_record("src/a.rs", "fn a()", 0.5)])
                .with_delay(Duration::from_secs(60)),
        ));
        let params = RetrievalParams::default().with_store_timeout(Duration::from_secs(1));
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), params);
        let result = use_case
            .execute(
                &plan(&[StoreId::Code], RetrievalStrategy::Parallel),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();
        assert_eq!(result.failed, set(&[StoreId::Code]));
    }

    #[tokio::test]
    async fn test_mismatched_metadata_dropped() {
        let registry = StoreRegistry::new().with_store(Arc::new(MockStore::returning(
            StoreId::Docs,
            vec![
                docs_record("auth", "valid", 0.9),
                ticket_record("BUG-1", "wrong store", 0.9),
            ],
        )));
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), RetrievalParams::default());
        let result = use_case
            .execute(
                &plan(&[StoreId::Docs], RetrievalStrategy::Parallel),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].content(), "valid");
    }

    #[tokio::test]
    async fn test_sequential_short_circuit() {
        let docs = Arc::new(MockStore::returning(
            StoreId::Docs,
            vec![
                docs_record("a", "first", 0.9),
                docs_record("b", "second", 0.85),
            ],
        ));
        let code = Arc::new(MockStore::returning(
            StoreId::Code,
            vec![code_record("src/a.rs", "third", 0.95)],
        ));
        let tickets = Arc::new(MockStore::returning(
            StoreId::Tickets,
            vec![ticket_record("BUG-1", "fourth", 0.9)],
        ));
        let registry = StoreRegistry::new()
            .with_store(docs)
            .with_store(code)
            .with_store(tickets.clone());
        let params = RetrievalParams::default().with_relevance_threshold(0.8, 3);
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), params);

        let result = use_case
            .execute(
                &plan(
                    &[StoreId::Tickets, StoreId::Code, StoreId::Docs],
                    RetrievalStrategy::Sequential,
                ),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();

        assert_eq!(result.succeeded, set(&[StoreId::Docs, StoreId::Code]));
        assert_eq!(result.skipped, set(&[StoreId::Tickets]));
        assert!(tickets.queries().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_without_threshold_queries_all() {
        let tickets = Arc::new(MockStore::returning(
            StoreId::Tickets,
            vec![ticket_record("BUG-1", "login timeout", 0.99)],
        ));
        let memory = Arc::new(MockStore::returning(
            StoreId::Memory,
            vec![memory_record("login", "sessions expire", 0.99)],
        ));
        let registry = StoreRegistry::new()
            .with_store(tickets)
            .with_store(memory.clone());
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), RetrievalParams::default());
        let result = use_case
            .execute(
                &plan(&[StoreId::Tickets, StoreId::Memory], RetrievalStrategy::Sequential),
                &question(),
                &NoProgress,
                &None,
            )
            .await
            .unwrap();
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(memory.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_during_fan_out() {
        let registry = StoreRegistry::new().with_store(Arc::new(
            MockStore::returning(StoreId::Docs, Vec::new()).with_delay(Duration::from_secs(30)),
        ));
        let use_case = DispatchRetrievalUseCase::new(Arc::new(registry), RetrievalParams::default());
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = use_case
            .execute(
                &plan(&[StoreId::Docs], RetrievalStrategy::Parallel),
                &question(),
                &NoProgress,
                &Some(token),
            )
            .await;
        assert_eq!(result.unwrap_err(), Cancelled);
    }
}

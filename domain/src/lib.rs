//! Domain layer for evidence-router
//!
//! Pure types and rules for retrieval orchestration. No I/O and no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Stores and evidence
//!
//! Four knowledge stores (docs, code, tickets, memory) return
//! [`EvidenceChunk`]s with store-specific [`ChunkMetadata`]. Chunks are
//! collected into an [`EvidenceSet`], unique by a content-derived
//! [`DedupKey`], which only grows during a query.
//!
//! ## Orchestration
//!
//! An [`OrchestrationSession`] walks the [`SessionState`] machine:
//! classify, then repeat plan / retrieve / merge / evaluate until the
//! evidence is sufficient or the round budget is spent, then synthesize
//! an [`Answer`] and optionally write an [`InsightRecord`].

pub mod answer;
pub mod config;
pub mod core;
pub mod evaluation;
pub mod evidence;
pub mod intent;
pub mod orchestration;
pub mod parsing;
pub mod prompt;
pub mod routing;
pub mod store;

pub use answer::{
    Answer, Citation, DraftAnswer, RawCitation, bound_confidence,
    insight::{InsightPolicy, InsightRecord, InsightSkip},
};
pub use config::OutputFormat;
pub use core::{error::DomainError, question::Question};
pub use evaluation::SufficiencyVerdict;
pub use evidence::{
    chunk::{DedupKey, EvidenceChunk},
    evidence_set::{EvidenceSet, MergeStats},
};
pub use intent::{Complexity, IntentCategory, QueryIntent};
pub use orchestration::{
    session::{Advisory, Degradation, OrchestrationSession},
    state::{SessionState, TerminalState},
};
pub use parsing::{ParseError, extract_json_object};
pub use prompt::{EVIDENCE_PREVIEW_BYTES, PromptTemplate, excerpt, preview};
pub use routing::{RetrievalStrategy, RoutingDecision, StorePlan};
pub use store::{
    metadata::{ChunkMetadata, CodeMetadata, DocsMetadata, LineRange, MemoryMetadata, TicketMetadata},
    store_id::{StoreId, format_store_set, parse_store_list},
};

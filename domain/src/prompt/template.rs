//! Prompt templates for each oracle-backed stage

use crate::evaluation::SufficiencyVerdict;
use crate::evidence::evidence_set::EvidenceSet;
use crate::intent::QueryIntent;
use crate::store::store_id::{StoreId, format_store_set};
use super::excerpt::{EVIDENCE_PREVIEW_BYTES, excerpt};
use std::collections::BTreeSet;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for query classification
    pub fn classification_system() -> &'static str {
        r#"You classify questions about a software system.
Respond with a single JSON object and nothing else:
{"intent_category": "explanation" | "debugging" | "comparison" | "how_to",
 "topic": "<main subject in a few words>",
 "complexity": "low" | "medium" | "high",
 "memory_relevant": true | false}

- explanation: understand how something works
- debugging: fix an error or understand why something failed
- comparison: compare approaches or implementations
- how_to: step-by-step instructions
Set memory_relevant when insights from earlier questions could help."#
    }

    pub fn classification_prompt(query: &str) -> String {
        format!("Classify this question:\n\n{}", query)
    }

    /// System prompt for store routing, including the routing principles
    pub fn routing_system() -> String {
        let stores = StoreId::ALL
            .iter()
            .map(|s| format!("- {}: {}", s.as_str(), s.display_name()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You decide which knowledge stores to search for a question.

Available stores:
{stores}

Routing principles:
- explanation: docs and code
- debugging: tickets and code, plus memory for known issues; query sequentially
- comparison: docs and code
- how_to: docs, plus code for examples
- add memory whenever earlier insights are relevant
- on a retry, add stores likely to cover what is still missing

Respond with a single JSON object and nothing else:
{{"selected_stores": ["docs", ...],
 "strategy": "parallel" | "sequential",
 "retry_allowed": true | false,
 "reasoning": "<one sentence>"}}
Only use the store identifiers listed above. Set retry_allowed to false when
no store could add anything new."#
        )
    }

    /// User prompt for routing; `feedback` carries the previous verdict on retries.
    pub fn routing_prompt(
        intent: &QueryIntent,
        round: u32,
        feedback: Option<(&SufficiencyVerdict, &BTreeSet<StoreId>)>,
    ) -> String {
        let mut prompt = format!(
            r#"Question: {}
Intent: {}
Topic: {}
Complexity: {}
Memory relevant: {}
Round: {}"#,
            intent.raw_query(),
            intent.intent_category(),
            intent.topic(),
            intent.complexity(),
            intent.memory_relevant(),
            round
        );

        if let Some((verdict, covered)) = feedback {
            prompt.push_str(&format!(
                "\n\nThe evidence gathered so far was not sufficient.\nAlready searched: {}\nMissing: {}\nSuggested stores: {}",
                or_none(&format_store_set(covered)),
                or_none(&verdict.missing_aspects.join("; ")),
                or_none(&format_store_set(&verdict.suggested_stores)),
            ));
        }
        prompt
    }

    /// System prompt for the sufficiency check
    pub fn evaluation_system() -> &'static str {
        r#"You judge whether retrieved evidence is enough to answer a question with citations.
Respond with a single JSON object and nothing else:
{"sufficient": true | false,
 "missing_aspects": ["<what is not covered>", ...],
 "suggested_stores": ["docs" | "code" | "tickets" | "memory", ...]}
Only judge sufficient when every part of the question is supported by the evidence."#
    }

    pub fn evaluation_prompt(intent: &QueryIntent, evidence: &EvidenceSet, round: u32) -> String {
        format!(
            "Question: {}\nRound: {}\n\nEvidence ({} chunks):\n{}",
            intent.raw_query(),
            round,
            evidence.len(),
            Self::render_evidence(evidence, Some(EVIDENCE_PREVIEW_BYTES))
        )
    }

    /// System prompt for answer drafting
    pub fn answer_system() -> &'static str {
        r#"You answer questions using only the supplied evidence.
Every claim must be supported by a cited chunk. Do not use outside knowledge.
Respond with a single JSON object and nothing else:
{"answer": "<answer text>",
 "confidence": <0.0 to 1.0>,
 "citations": [{"source_db": "<store>", "locator": "<locator shown in the evidence>"}],
 "learned_insight": "<one reusable sentence learned from this exchange, or null>"}"#
    }

    pub fn answer_prompt(intent: &QueryIntent, evidence: &EvidenceSet) -> String {
        format!(
            "Question: {}\nIntent: {}\n\nEvidence:\n{}",
            intent.raw_query(),
            intent.intent_category(),
            Self::render_evidence(evidence, None)
        )
    }

    /// Render evidence grouped by source, one block per chunk.
    ///
    /// With `max_bytes`, chunk content is cut at that many bytes.
    pub fn render_evidence(evidence: &EvidenceSet, max_bytes: Option<usize>) -> String {
        if evidence.is_empty() {
            return "(no evidence)".to_string();
        }

        let mut out = String::new();
        let mut index = 1;
        for (store, chunks) in evidence.grouped() {
            out.push_str(&format!("\n## {}\n", store.display_name()));
            for chunk in chunks {
                let content = match max_bytes {
                    Some(max) => excerpt(chunk.content(), max),
                    None => chunk.content(),
                };
                out.push_str(&format!(
                    "\n[{}] source_db={} locator={} relevance={:.2}\n{}\n{}\n",
                    index,
                    store,
                    chunk.locator(),
                    chunk.relevance_score,
                    chunk.metadata.summary(),
                    content
                ));
                index += 1;
            }
        }
        out
    }
}

fn or_none(s: &str) -> &str {
    if s.is_empty() { "(none)" } else { s }
}

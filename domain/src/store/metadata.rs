//! Per-store chunk metadata.
//!
//! Each store has its own schema, modelled as one variant of the closed
//! [`ChunkMetadata`] enum. A chunk whose metadata variant does not match the
//! store it came from is malformed and is rejected at the retrieval boundary.

use super::store_id::StoreId;
use serde::{Deserialize, Serialize};

/// Inclusive line span of a code chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Metadata for documentation chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocsMetadata {
    /// Kind of document (API, guide, architecture...)
    pub doc_type: String,
    /// Section heading within the document
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Metadata for source code chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMetadata {
    pub file_path: String,
    #[serde(default = "unknown_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
}

fn unknown_language() -> String {
    "unknown".to_string()
}

/// Metadata for issue tracker chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMetadata {
    pub ticket_id: String,
    pub status: String,
    pub severity: String,
    /// RFC 3339 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Metadata for learned insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Query the insight was learned from
    pub learned_from: String,
    pub confidence: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// RFC 3339 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Domain-specific metadata attached to an evidence chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChunkMetadata {
    Docs(DocsMetadata),
    Code(CodeMetadata),
    Tickets(TicketMetadata),
    Memory(MemoryMetadata),
}

impl ChunkMetadata {
    /// The store whose schema this metadata follows.
    pub fn store(&self) -> StoreId {
        match self {
            ChunkMetadata::Docs(_) => StoreId::Docs,
            ChunkMetadata::Code(_) => StoreId::Code,
            ChunkMetadata::Tickets(_) => StoreId::Tickets,
            ChunkMetadata::Memory(_) => StoreId::Memory,
        }
    }

    /// Check that this metadata belongs to `store`.
    pub fn matches(&self, store: StoreId) -> bool {
        self.store() == store
    }

    /// Human-readable locator used in citations, when the metadata carries one.
    ///
    /// | Store   | Locator                           |
    /// |---------|-----------------------------------|
    /// | docs    | `doc_type/section@version`        |
    /// | code    | `file_path:start-end#function`    |
    /// | tickets | `ticket_id`                       |
    /// | memory  | `memory:<first tag or query>`     |
    pub fn locator(&self) -> Option<String> {
        match self {
            ChunkMetadata::Docs(m) => {
                if m.doc_type.is_empty() && m.section.is_empty() {
                    return None;
                }
                let mut loc = format!("{}/{}", m.doc_type, m.section);
                if let Some(version) = &m.version {
                    loc.push('@');
                    loc.push_str(version);
                }
                Some(loc)
            }
            ChunkMetadata::Code(m) => {
                if m.file_path.is_empty() {
                    return None;
                }
                let mut loc = m.file_path.clone();
                if let Some(range) = m.line_range {
                    loc.push_str(&format!(":{}", range));
                }
                if let Some(function) = &m.function_name
                    && !function.is_empty()
                {
                    loc.push('#');
                    loc.push_str(function);
                }
                Some(loc)
            }
            ChunkMetadata::Tickets(m) => {
                (!m.ticket_id.is_empty()).then(|| m.ticket_id.clone())
            }
            ChunkMetadata::Memory(m) => {
                let label = m.tags.first().unwrap_or(&m.learned_from);
                (!label.is_empty()).then(|| format!("memory:{}", label))
            }
        }
    }

    /// Short one-line summary of the metadata for prompts.
    pub fn summary(&self) -> String {
        match self {
            ChunkMetadata::Docs(m) => format!("Type: {}, Section: {}", m.doc_type, m.section),
            ChunkMetadata::Code(m) => format!(
                "File: {}, Language: {}, Function: {}",
                m.file_path,
                m.language,
                m.function_name.as_deref().unwrap_or("-")
            ),
            ChunkMetadata::Tickets(m) => format!(
                "Ticket: {}, Status: {}, Severity: {}",
                m.ticket_id, m.status, m.severity
            ),
            ChunkMetadata::Memory(m) => format!(
                "Learned from: {}, Confidence: {:.2}",
                m.learned_from, m.confidence
            ),
        }
    }
}

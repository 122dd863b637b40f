//! Store identifiers and the store universe

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Identifier of one knowledge store.
///
/// The declaration order is the canonical query order
/// (docs → code → tickets → memory); `Ord` follows it, so a
/// `BTreeSet<StoreId>` iterates in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreId {
    /// Official documentation (intended behavior, API specs, guides)
    Docs,
    /// Source code (functions, classes, modules)
    Code,
    /// Issue tracker history (bugs, incidents)
    Tickets,
    /// Insights learned from earlier queries
    Memory,
}

impl StoreId {
    /// Every known store, in canonical query order.
    pub const ALL: [StoreId; 4] = [
        StoreId::Docs,
        StoreId::Code,
        StoreId::Tickets,
        StoreId::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreId::Docs => "docs",
            StoreId::Code => "code",
            StoreId::Tickets => "tickets",
            StoreId::Memory => "memory",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StoreId::Docs => "Documentation",
            StoreId::Code => "Source Code",
            StoreId::Tickets => "Issue History",
            StoreId::Memory => "Learned Insights",
        }
    }

    /// The full store universe as a set.
    pub fn universe() -> BTreeSet<StoreId> {
        Self::ALL.into_iter().collect()
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoreId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docs" | "documentation" => Ok(StoreId::Docs),
            "code" | "source" => Ok(StoreId::Code),
            "tickets" | "issues" => Ok(StoreId::Tickets),
            "memory" | "insights" => Ok(StoreId::Memory),
            other => Err(DomainError::UnknownStore(other.to_string())),
        }
    }
}

/// Render a store set as `docs, code` for logs and prompts.
pub fn format_store_set(stores: &BTreeSet<StoreId>) -> String {
    stores
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a list of identifiers, failing on the first unknown one.
pub fn parse_store_list<S: AsRef<str>>(names: &[S]) -> Result<BTreeSet<StoreId>, DomainError> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}

//! Sufficiency verdicts: is the accumulated evidence enough to answer?

use crate::parsing::{ParseError, decode};
use crate::store::store_id::StoreId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Judgment on the current evidence set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SufficiencyVerdict {
    pub sufficient: bool,
    /// What the evidence fails to cover
    pub missing_aspects: Vec<String>,
    /// Stores likely to hold the missing pieces (may repeat earlier stores)
    pub suggested_stores: BTreeSet<StoreId>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "is_sufficient")]
    sufficient: bool,
    #[serde(default)]
    missing_aspects: Vec<String>,
    #[serde(default, alias = "suggested_dbs")]
    suggested_stores: Vec<String>,
}

impl SufficiencyVerdict {
    pub fn sufficient() -> Self {
        Self {
            sufficient: true,
            missing_aspects: Vec::new(),
            suggested_stores: BTreeSet::new(),
        }
    }

    pub fn insufficient(missing_aspects: Vec<String>, suggested_stores: BTreeSet<StoreId>) -> Self {
        Self {
            sufficient: false,
            missing_aspects,
            suggested_stores,
        }
    }

    /// Validate an oracle payload.
    ///
    /// `sufficient` must be a boolean and every suggested store must belong
    /// to the store universe.
    pub fn from_oracle(value: &Value) -> Result<Self, ParseError> {
        let raw: RawVerdict = decode(value)?;

        let mut suggested_stores = BTreeSet::new();
        for name in &raw.suggested_stores {
            let store: StoreId = name.parse().map_err(|_| {
                ParseError::invalid("suggested_stores", format!("unknown store '{}'", name))
            })?;
            suggested_stores.insert(store);
        }

        let missing_aspects = raw
            .missing_aspects
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Ok(Self {
            sufficient: raw.sufficient,
            missing_aspects,
            suggested_stores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_oracle_insufficient() {
        let verdict = SufficiencyVerdict::from_oracle(&json!({
            "sufficient": false,
            "missing_aspects": ["implementation details", " "],
            "suggested_stores": ["code"]
        }))
        .unwrap();
        assert!(!verdict.sufficient);
        assert_eq!(verdict.missing_aspects, vec!["implementation details"]);
        assert_eq!(
            verdict.suggested_stores,
            [StoreId::Code].into_iter().collect()
        );
    }

    #[test]
    fn test_from_oracle_legacy_field_names() {
        let verdict = SufficiencyVerdict::from_oracle(&json!({
            "is_sufficient": true,
            "confidence": 0.9,
            "suggested_dbs": []
        }))
        .unwrap();
        assert!(verdict.sufficient);
    }

    #[test]
    fn test_from_oracle_rejects_non_boolean() {
        assert!(SufficiencyVerdict::from_oracle(&json!({"sufficient": "yes"})).is_err());
        assert!(SufficiencyVerdict::from_oracle(&json!({"missing_aspects": []})).is_err());
    }

    #[test]
    fn test_from_oracle_rejects_unknown_store() {
        let result = SufficiencyVerdict::from_oracle(&json!({
            "sufficient": false,
            "suggested_stores": ["slack"]
        }));
        assert!(matches!(
            result,
            Err(ParseError::InvalidField { field: "suggested_stores", .. })
        ));
    }
}

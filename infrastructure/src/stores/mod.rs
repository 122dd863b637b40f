//! Semantic store adapters.
//!
//! [`JsonlSemanticStore`] keeps one append-only `<store>.jsonl` file per
//! knowledge store; [`read_records`] loads ingestion input in the same
//! line format.

mod jsonl_store;

pub use jsonl_store::{IngestError, JsonlSemanticStore, read_records};

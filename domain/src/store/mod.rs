//! Knowledge stores: identifiers and per-store metadata schemas.

pub mod metadata;
pub mod store_id;

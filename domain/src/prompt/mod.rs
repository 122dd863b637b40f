//! Prompt domain
//!
//! Templates for the classification, routing, evaluation and answer stages.

mod excerpt;
mod template;

pub use excerpt::{EVIDENCE_PREVIEW_BYTES, excerpt, preview};
pub use template::PromptTemplate;

//! Use cases
//!
//! One use case per orchestration stage, plus [`run_query`] which drives a
//! session through all of them.

pub mod classify_query;
pub mod dispatch_retrieval;
pub mod evaluate_sufficiency;
pub mod plan_routing;
pub mod run_query;
pub mod shared;
pub mod synthesize_answer;
pub mod write_insight;

#[cfg(test)]
pub(crate) mod test_support;

//! Orchestration domain
//!
//! The per-query session entity and the state machine it follows.

pub mod session;
pub mod state;

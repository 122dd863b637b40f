//! Shared utilities for use cases.
//!
//! Cancellation checking and the timed, cancellable oracle call used by
//! every judgment stage.

use crate::ports::oracle::{OracleError, OracleRequest, ReasoningOracle};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The caller cancelled the session
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation cancelled")]
pub struct Cancelled;

/// Check if cancellation has been requested.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), Cancelled> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(Cancelled);
    }
    Ok(())
}

/// Run `fut` unless the token fires first.
pub(crate) async fn cancellable<F: Future>(
    token: &Option<CancellationToken>,
    fut: F,
) -> Result<F::Output, Cancelled> {
    match token {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(Cancelled),
            output = fut => Ok(output),
        },
        None => Ok(fut.await),
    }
}

/// Call the oracle with a timeout.
///
/// A timeout is reported as [`OracleError::Timeout`] so callers can fall
/// back; only cancellation escapes as an error of its own.
pub(crate) async fn complete_with_timeout(
    oracle: &dyn ReasoningOracle,
    request: &OracleRequest,
    timeout: Duration,
    token: &Option<CancellationToken>,
) -> Result<Result<Value, OracleError>, Cancelled> {
    check_cancelled(token)?;
    cancellable(token, async {
        match tokio::time::timeout(timeout, oracle.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout),
        }
    })
    .await
}

//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every RPC call with a deadline
//! - Map transport errors and elapsed deadlines to distinct errors

use std::fmt::Display;
use std::future::IntoFuture;
use std::time::Duration;

use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Await a single RPC call, bounded by `limit`.
pub async fn rpc_call<T, E, Fut>(operation: &'static str, limit: Duration, fut: Fut) -> BlockchainResult<T>
where
    E: Display,
    Fut: IntoFuture<Output = Result<T, E>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::debug!(operation, error = %e, "RPC error");
            Err(BlockchainError::Rpc(format!("{}: {}", operation, e)))
        }
        Err(_) => {
            tracing::debug!(operation, "RPC timeout");
            Err(BlockchainError::Timeout(limit.as_secs()))
        }
    }
}

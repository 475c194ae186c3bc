//! Chain-specific types and error definitions.

use thiserror::Error;

use crate::codec::CodecError;
use crate::resilience::RetryExhausted;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// A read kept failing or returning inconclusive values.
    #[error("chain read '{operation}' failed after {attempts} attempt(s){}", last_error_suffix(.last_error))]
    ChainReadFailure {
        operation: &'static str,
        attempts: u32,
        last_error: Option<String>,
    },

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or signing error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A quote could not be encoded for a contract call.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

impl From<RetryExhausted> for BlockchainError {
    fn from(e: RetryExhausted) -> Self {
        BlockchainError::ChainReadFailure {
            operation: e.operation,
            attempts: e.attempts,
            last_error: e.last_error,
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Account facts used by the new-account gas heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountState {
    pub code_len: usize,
    pub balance_is_zero: bool,
    pub nonce: u64,
}

impl AccountState {
    /// No code, no balance and no transactions.
    pub fn is_new(&self) -> bool {
        self.code_len == 0 && self.balance_is_zero && self.nonce == 0
    }
}

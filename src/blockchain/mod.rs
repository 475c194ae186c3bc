//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (RPC URL, LBC and bridge addresses, retry policy)
//!     → node.rs (single RPC calls with per-call timeouts)
//!     → connector.rs (retry, gas heuristic, federation snapshot, quote hashing)
//!     → quoting::protocol
//!
//! Environment variables (provider keys)
//!     → wallet.rs (hash signing, transaction signing for writes)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Writes are submitted once and never retried

pub mod connector;
pub mod contracts;
pub mod node;
pub mod types;
pub mod wallet;

pub use connector::{ChainConnector, ConnectorSettings, EmergencyBranch};
pub use node::{ChainNode, RpcNode};
pub use types::{AccountState, BlockchainError, BlockchainResult, ChainId};
pub use wallet::Wallet;

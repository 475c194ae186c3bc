//! Federation address derivation subsystem.
//!
//! # Data Flow
//! ```text
//! Quote (btc refund, lbc, lp btc addresses) + quote hash
//!     → derivation.rs (keccak256 derivation value)
//!
//! FederationInfo (read from the bridge + erp config)
//!     → script.rs (multisig / emergency redeem script)
//!     → derivation.rs (prefix with derivation value, wrap as P2SH)
//!     → per-quote deposit address
//! ```
//!
//! # Design Decisions
//! - Pure and deterministic: same inputs always yield the same address
//! - Byte order of the derivation inputs is fixed by the custody network
//! - Federation snapshots are request-scoped, never cached

pub mod derivation;
pub mod info;
pub mod script;

use thiserror::Error;

use crate::codec::CodecError;

pub use derivation::{compute_derivation_value, derive_deposit_address, DerivationValue};
pub use info::{FederationInfo, FederatorKey, KeyKind};

/// Errors raised while deriving a deposit address.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Threshold, key count or emergency key set are inconsistent.
    #[error("invalid federation config: {0}")]
    InvalidFederationConfig(String),

    /// The redeem script could not be turned into an address.
    #[error("address encoding failure: {0}")]
    AddressEncodingFailure(String),

    /// A derivation input address was malformed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

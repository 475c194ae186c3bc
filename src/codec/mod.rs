//! On-chain encoding subsystem.
//!
//! # Data Flow
//! ```text
//! Quote (display-form addresses, hex payloads)
//!     → address.rs (decode EVM / base58check BTC addresses, hex payloads)
//!     → quote.rs (descriptor-driven mapping into the LBC call struct)
//!     → blockchain connector (hashQuote / callForUser / registerPegIn)
//! ```
//!
//! # Design Decisions
//! - Pure functions, no I/O
//! - One field table drives both hashing and call submission
//! - Any malformed field aborts the whole encoding

pub mod address;
pub mod quote;

use thiserror::Error;

pub use address::{
    btc_address_hash160, decode_btc_address, decode_evm_address, encode_btc_address,
    parse_hex_payload,
};
pub use quote::{decode_quote, encode_quote, local_quote_hash, FieldSlot, SlotKind, QUOTE_LAYOUT};

/// Errors produced while converting between display and on-chain forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Address failed format, length or checksum validation.
    #[error("invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    /// Hex payload had odd length or non-hex characters.
    #[error("invalid hex '{value}': {reason}")]
    InvalidHex { value: String, reason: String },

    /// A quote field could not be encoded.
    #[error("error encoding field {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<CodecError>,
    },

    /// The field table and the call struct disagree.
    #[error("quote layout mismatch at {0}")]
    Layout(&'static str),
}

impl CodecError {
    pub(crate) fn invalid_address(value: &str, reason: impl ToString) -> Self {
        Self::InvalidAddress {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_hex(value: &str, reason: impl ToString) -> Self {
        Self::InvalidHex {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Strip field context, returning the underlying error category.
    pub fn root(&self) -> &CodecError {
        match self {
            CodecError::Field { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

//! Quote protocol subsystem.
//!
//! # Data Flow
//! ```text
//! QuoteRequest
//!     → protocol.rs (validate, estimate gas, read gas price and federation address)
//!     → providers.rs (each registered provider prices or declines)
//!     → blockchain::connector (hashQuote) → storage (put by hash)
//!
//! Quote hash
//!     → storage (get) → federation (derivation value, deposit address)
//!     → providers.rs (matching provider signs the raw hash)
//! ```

pub mod protocol;
pub mod providers;
pub mod types;

pub use protocol::{ProtocolError, ProtocolResult, QuoteProtocol};
pub use providers::{LiquidityProvider, LocalProvider, ProviderRegistry, ProviderTerms};
pub use types::{AcceptQuoteRequest, AcceptedQuote, Quote, QuoteHash, QuoteRequest};

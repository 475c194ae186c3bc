//! Two-phase quote protocol.
//!
//! # Legal orderings
//! ```text
//! getQuote(request)  → quotes stored by hash
//! acceptQuote(hash)  → signature + derived deposit address
//! acceptQuote(hash)  → same signature, same address (idempotent)
//! ```
//! Accepting a hash that was never quoted is `QuoteNotFound`. No state
//! object exists; a stored quote is the only trace of the first phase.

use std::sync::Arc;

use alloy::hex;
use alloy::primitives::Bytes;
use bitcoin::Network;
use thiserror::Error;

use crate::blockchain::{BlockchainError, ChainConnector, ChainNode};
use crate::codec::{decode_btc_address, decode_evm_address, parse_hex_payload, CodecError};
use crate::federation::{compute_derivation_value, derive_deposit_address, FederationError};
use crate::observability::metrics;
use crate::quoting::providers::ProviderRegistry;
use crate::quoting::types::{AcceptedQuote, Quote, QuoteHash, QuoteRequest};
use crate::storage::{QuoteStore, StoreError};

/// Request-level failures, one variant per error category.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid federation config: {0}")]
    InvalidFederationConfig(String),

    #[error("address encoding failure: {0}")]
    AddressEncodingFailure(String),

    #[error("chain read '{operation}' failed after {attempts} attempt(s)")]
    ChainReadFailure {
        operation: &'static str,
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("quote {0} not found")]
    QuoteNotFound(QuoteHash),

    #[error("no registered provider with address {0}")]
    ProviderNotFound(String),

    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ProtocolError {
    /// Stable category name exposed to API clients.
    pub fn category(&self) -> &'static str {
        match self {
            ProtocolError::InvalidAddress(_) => "InvalidAddress",
            ProtocolError::InvalidHex(_) => "InvalidHex",
            ProtocolError::InvalidFederationConfig(_) => "InvalidFederationConfig",
            ProtocolError::AddressEncodingFailure(_) => "AddressEncodingFailure",
            ProtocolError::ChainReadFailure { .. } => "ChainReadFailure",
            ProtocolError::QuoteNotFound(_) => "QuoteNotFound",
            ProtocolError::ProviderNotFound(_) => "ProviderNotFound",
            ProtocolError::EncodingFailure(_) => "EncodingFailure",
            ProtocolError::Storage(_) => "Storage",
        }
    }
}

impl From<CodecError> for ProtocolError {
    fn from(e: CodecError) -> Self {
        let message = e.to_string();
        match e.root() {
            CodecError::InvalidAddress { .. } => ProtocolError::InvalidAddress(message),
            CodecError::InvalidHex { .. } => ProtocolError::InvalidHex(message),
            _ => ProtocolError::EncodingFailure(message),
        }
    }
}

impl From<FederationError> for ProtocolError {
    fn from(e: FederationError) -> Self {
        match e {
            FederationError::InvalidFederationConfig(m) => ProtocolError::InvalidFederationConfig(m),
            FederationError::AddressEncodingFailure(m) => ProtocolError::AddressEncodingFailure(m),
            FederationError::Codec(e) => e.into(),
        }
    }
}

impl From<BlockchainError> for ProtocolError {
    fn from(e: BlockchainError) -> Self {
        match e {
            BlockchainError::ChainReadFailure {
                operation,
                attempts,
                last_error,
            } => ProtocolError::ChainReadFailure {
                operation,
                attempts,
                last_error,
            },
            BlockchainError::Codec(e) => e.into(),
            BlockchainError::Wallet(m) => ProtocolError::EncodingFailure(m),
            other => ProtocolError::ChainReadFailure {
                operation: "rpc",
                attempts: 1,
                last_error: Some(other.to_string()),
            },
        }
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Orchestrates quote creation and acceptance.
pub struct QuoteProtocol<N> {
    connector: ChainConnector<N>,
    registry: ProviderRegistry,
    store: Arc<dyn QuoteStore>,
    network: Network,
}

impl<N: ChainNode> QuoteProtocol<N> {
    pub fn new(
        connector: ChainConnector<N>,
        registry: ProviderRegistry,
        store: Arc<dyn QuoteStore>,
        network: Network,
    ) -> Self {
        Self {
            connector,
            registry,
            store,
            network,
        }
    }

    pub fn connector(&self) -> &ChainConnector<N> {
        &self.connector
    }

    /// Price `request` with every registered provider and store the results.
    ///
    /// Providers that decline are skipped; a quote that cannot be hashed or
    /// stored is logged and left out of the response.
    pub async fn get_quotes(&self, request: &QuoteRequest) -> ProtocolResult<Vec<Quote>> {
        let contract = decode_evm_address(&request.call_contract_address)?;
        decode_evm_address(&request.rsk_refund_address)?;
        decode_btc_address(&request.bitcoin_refund_address)?;
        let data = parse_hex_payload(&request.call_contract_arguments)?;

        let estimate = self
            .connector
            .estimate_gas(contract, request.value_to_transfer, Bytes::from(data))
            .await?;
        let gas_price = self.connector.gas_price().await?;
        let fed_address = self.connector.federation_address().await?;

        let template = Quote {
            fed_btc_addr: fed_address,
            lbc_addr: self.connector.lbc_address().to_string(),
            btc_refund_addr: request.bitcoin_refund_address.clone(),
            rsk_refund_addr: request.rsk_refund_address.clone(),
            contract_addr: request.call_contract_address.clone(),
            data: request.call_contract_arguments.clone(),
            gas_limit: request.gas_limit.max(estimate),
            value: request.value_to_transfer,
            ..Default::default()
        };

        let mut quotes = Vec::new();
        for provider in self.registry.iter() {
            let Some(quote) = provider.get_quote(&template, gas_price) else {
                tracing::debug!(provider = provider.name(), "Provider declined to quote");
                continue;
            };

            let hash = match self.connector.hash_quote(&quote).await {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::error!(
                        provider = provider.name(),
                        error = %e,
                        "Failed to hash quote, omitting it"
                    );
                    continue;
                }
            };
            if let Err(e) = self.store.put(hash, quote.clone()) {
                tracing::error!(
                    provider = provider.name(),
                    quote_hash = %hash,
                    error = %e,
                    "Failed to store quote, omitting it"
                );
                continue;
            }

            metrics::record_quote_created(provider.name());
            tracing::info!(provider = provider.name(), quote_hash = %hash, "Quote created");
            quotes.push(quote);
        }

        Ok(quotes)
    }

    /// Derive the deposit address for a stored quote and have its provider sign the hash.
    pub async fn accept_quote(&self, quote_hash: &str) -> ProtocolResult<AcceptedQuote> {
        let hash = QuoteHash::parse(quote_hash)?;
        let quote = self
            .store
            .get(&hash)?
            .ok_or(ProtocolError::QuoteNotFound(hash))?;

        let btc_refund = decode_btc_address(&quote.btc_refund_addr)?;
        let lp_btc = decode_btc_address(&quote.lp_btc_addr)?;
        let lbc = decode_evm_address(&quote.lbc_addr)?;
        let derivation = compute_derivation_value(&btc_refund, &lbc, &lp_btc, &hash)?;

        let lp_address = decode_evm_address(&quote.lp_rsk_addr)?;
        let provider = self
            .registry
            .find_by_address(&lp_address)
            .ok_or_else(|| ProtocolError::ProviderNotFound(quote.lp_rsk_addr.clone()))?;

        let federation = self.connector.federation_info().await?;
        let deposit_address = derive_deposit_address(&derivation, &federation, self.network)?;

        let signature = provider.sign_hash(&hash)?;

        metrics::record_quote_accepted();
        tracing::info!(
            quote_hash = %hash,
            provider = provider.name(),
            deposit_address = %deposit_address,
            "Quote accepted"
        );

        Ok(AcceptedQuote {
            signature: hex::encode(signature.as_bytes()),
            bitcoin_deposit_address_hash: deposit_address.to_string(),
        })
    }
}

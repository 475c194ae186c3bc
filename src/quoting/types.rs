//! Quote protocol types.

use alloy::hex;
use alloy::primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::codec::{parse_hex_payload, CodecError, CodecResult};

/// An offer to perform a contract call funded by a Bitcoin deposit.
///
/// Addresses are kept in display form; [`crate::codec::encode_quote`] turns
/// them into the fixed-width on-chain layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Federation custody address (P2SH).
    #[serde(rename = "fedBTCAddr")]
    pub fed_btc_addr: String,
    /// Liquidity bridge contract address.
    #[serde(rename = "lbcAddr")]
    pub lbc_addr: String,
    /// Provider EVM address.
    #[serde(rename = "lpRSKAddr")]
    pub lp_rsk_addr: String,
    /// User Bitcoin refund address.
    #[serde(rename = "btcRefundAddr")]
    pub btc_refund_addr: String,
    /// User EVM refund address.
    #[serde(rename = "rskRefundAddr")]
    pub rsk_refund_addr: String,
    /// Provider Bitcoin address.
    #[serde(rename = "lpBTCAddr")]
    pub lp_btc_addr: String,
    pub call_fee: U256,
    pub penalty_fee: U256,
    /// Contract the provider calls on the user's behalf.
    #[serde(rename = "contractAddr")]
    pub contract_addr: String,
    /// Hex call data.
    pub data: String,
    pub gas_limit: u64,
    pub nonce: u64,
    pub value: U256,
    /// Unix seconds when the provider issued the quote.
    pub agreement_timestamp: u64,
    /// Seconds the user has to make the deposit.
    pub time_for_deposit: u64,
    /// Seconds the provider has to perform the call.
    pub call_time: u64,
    /// Bitcoin confirmations required before the call.
    pub confirmations: u64,
}

/// Body of `POST /getQuote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteRequest {
    pub call_contract_address: String,
    /// Hex call data.
    #[serde(default)]
    pub call_contract_arguments: String,
    pub value_to_transfer: U256,
    pub gas_limit: u64,
    pub bitcoin_refund_address: String,
    pub rsk_refund_address: String,
}

/// Body of `POST /acceptQuote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AcceptQuoteRequest {
    pub quote_hash: String,
}

/// Response of `POST /acceptQuote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedQuote {
    /// Provider signature over the raw quote hash, hex.
    pub signature: String,
    /// Derived P2SH deposit address.
    pub bitcoin_deposit_address_hash: String,
}

/// 32-byte quote identifier returned by `hashQuote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QuoteHash(pub B256);

impl QuoteHash {
    /// Parse a hex hash, with or without `0x`.
    pub fn parse(value: &str) -> CodecResult<Self> {
        let bytes = parse_hex_payload(value)?;
        if bytes.len() != 32 {
            return Err(CodecError::invalid_hex(
                value,
                format!("expected 32 bytes, got {}", bytes.len()),
            ));
        }
        Ok(Self(B256::from_slice(&bytes)))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl std::fmt::Display for QuoteHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<B256> for QuoteHash {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

impl From<QuoteHash> for String {
    fn from(hash: QuoteHash) -> Self {
        hash.to_string()
    }
}

impl TryFrom<String> for QuoteHash {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

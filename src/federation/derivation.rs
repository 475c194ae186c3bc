//! Per-quote deposit address derivation.

use alloy::hex;
use alloy::primitives::{keccak256, Address as EvmAddress};
use bitcoin::{Address, Network, ScriptBuf};

use crate::codec::address::{BTC_ADDRESS_LEN, EVM_ADDRESS_LEN};
use crate::federation::script::{federation_redeem_script, flyover_redeem_script};
use crate::federation::{FederationError, FederationInfo, FederationResult};
use crate::quoting::types::QuoteHash;

/// keccak256 over the quote's custody inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivationValue(pub [u8; 32]);

impl DerivationValue {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for DerivationValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// `keccak256(btc_refund || lbc || lp_btc || quote_hash)`
///
/// Bitcoin addresses are the 21-byte version+hash160 form, the contract
/// address the raw 20 bytes.
pub fn compute_derivation_value(
    btc_refund: &[u8],
    lbc: &EvmAddress,
    lp_btc: &[u8],
    quote_hash: &QuoteHash,
) -> FederationResult<DerivationValue> {
    for (field, bytes) in [("btc refund", btc_refund), ("lp btc", lp_btc)] {
        if bytes.len() != BTC_ADDRESS_LEN {
            return Err(FederationError::AddressEncodingFailure(format!(
                "{} address must be {} bytes, got {}",
                field,
                BTC_ADDRESS_LEN,
                bytes.len()
            )));
        }
    }

    let mut preimage = Vec::with_capacity(2 * BTC_ADDRESS_LEN + EVM_ADDRESS_LEN + 32);
    preimage.extend_from_slice(btc_refund);
    preimage.extend_from_slice(lbc.as_slice());
    preimage.extend_from_slice(lp_btc);
    preimage.extend_from_slice(quote_hash.as_bytes());

    Ok(DerivationValue(keccak256(&preimage).0))
}

/// P2SH address of `<derivation> OP_DROP <federation redeem script>`.
///
/// Fails with `InvalidFederationConfig` when the address the bridge reports
/// for the federation is not the P2SH of the redeem script built from
/// `info`, since funds sent to the derived address would then be unspendable
/// by the federation.
pub fn derive_deposit_address(
    derivation: &DerivationValue,
    info: &FederationInfo,
    network: Network,
) -> FederationResult<Address> {
    let redeem = federation_redeem_script(info)?;
    verify_federation_address(&redeem, info, network)?;
    let flyover = flyover_redeem_script(derivation.as_bytes(), &redeem)?;
    Address::p2sh(&flyover, network)
        .map_err(|e| FederationError::AddressEncodingFailure(e.to_string()))
}

fn verify_federation_address(
    redeem: &ScriptBuf,
    info: &FederationInfo,
    network: Network,
) -> FederationResult<()> {
    let expected = Address::p2sh(redeem, network)
        .map_err(|e| FederationError::AddressEncodingFailure(e.to_string()))?;
    if expected.to_string() != info.address {
        return Err(FederationError::InvalidFederationConfig(format!(
            "federation address {} does not match its redeem script ({})",
            info.address, expected
        )));
    }
    Ok(())
}

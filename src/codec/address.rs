//! Conversion between display-form addresses and their on-chain bytes.

use alloy::hex;
use alloy::primitives::Address;
use bitcoin::base58;

use crate::codec::{CodecError, CodecResult};

/// Length of a legacy base58check payload: one version byte + HASH160.
pub const BTC_ADDRESS_LEN: usize = 21;

/// Length of an EVM account address.
pub const EVM_ADDRESS_LEN: usize = 20;

/// Decode a hex EVM address, with or without `0x`.
///
/// All-lowercase and all-uppercase forms are accepted as-is; mixed case
/// must carry a valid EIP-55 checksum.
pub fn decode_evm_address(value: &str) -> CodecResult<Address> {
    let digits = strip_hex_prefix(value);
    if digits.len() != EVM_ADDRESS_LEN * 2 {
        return Err(CodecError::invalid_address(
            value,
            format!("expected {} hex characters, got {}", EVM_ADDRESS_LEN * 2, digits.len()),
        ));
    }

    let address: Address = digits
        .parse()
        .map_err(|e| CodecError::invalid_address(value, e))?;

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(format!("0x{digits}"), None)
            .map_err(|e| CodecError::invalid_address(value, e))?;
    }

    Ok(address)
}

/// Decode a base58check Bitcoin address into `version || hash160`.
pub fn decode_btc_address(value: &str) -> CodecResult<Vec<u8>> {
    let bytes = base58::decode_check(value).map_err(|e| CodecError::invalid_address(value, e))?;
    if bytes.len() != BTC_ADDRESS_LEN {
        return Err(CodecError::invalid_address(
            value,
            format!("expected {} payload bytes, got {}", BTC_ADDRESS_LEN, bytes.len()),
        ));
    }
    Ok(bytes)
}

/// The 20-byte script/pubkey hash of a base58check address, version dropped.
pub fn btc_address_hash160(value: &str) -> CodecResult<[u8; 20]> {
    let bytes = decode_btc_address(value)?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&bytes[1..]);
    Ok(hash)
}

/// Re-encode `version || payload` as a base58check string.
pub fn encode_btc_address(version: u8, payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.push(version);
    bytes.extend_from_slice(payload);
    base58::encode_check(&bytes)
}

/// Parse a hex payload with an optional `0x` prefix.
pub fn parse_hex_payload(value: &str) -> CodecResult<Vec<u8>> {
    let digits = strip_hex_prefix(value);
    hex::decode(digits).map_err(|e| CodecError::invalid_hex(value, e))
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

//! Snapshot of the custody federation's configuration.

use alloy::hex;
use bitcoin::PublicKey;
use serde::{Deserialize, Serialize};

use crate::codec::{parse_hex_payload, CodecResult};
use crate::federation::{FederationError, FederationResult};

/// Role a federator key is registered for on the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Signs Bitcoin peg-outs; the only role used in redeem scripts.
    Btc,
    Rsk,
    Mst,
}

impl KeyKind {
    /// Type tag understood by `getFederatorPublicKeyOfType`.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Btc => "btc",
            KeyKind::Rsk => "rsk",
            KeyKind::Mst => "mst",
        }
    }
}

/// A type-tagged federator public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatorKey {
    pub kind: KeyKind,
    pub bytes: Vec<u8>,
}

impl FederatorKey {
    pub fn btc(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: KeyKind::Btc,
            bytes: bytes.into(),
        }
    }

    /// Parse a hex-encoded BTC-role key.
    pub fn btc_from_hex(value: &str) -> CodecResult<Self> {
        Ok(Self::btc(parse_hex_payload(value)?))
    }

    /// Interpret the key material as a secp256k1 public key.
    pub fn to_public_key(&self) -> FederationResult<PublicKey> {
        if self.kind != KeyKind::Btc {
            return Err(FederationError::InvalidFederationConfig(format!(
                "{} key {} cannot sign bitcoin scripts",
                self.kind.as_str(),
                hex::encode(&self.bytes)
            )));
        }
        PublicKey::from_slice(&self.bytes).map_err(|e| {
            FederationError::AddressEncodingFailure(format!(
                "malformed public key {}: {}",
                hex::encode(&self.bytes),
                e
            ))
        })
    }
}

/// Federation configuration at acceptance time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationInfo {
    /// Number of federators.
    pub size: usize,
    /// Signatures required to spend.
    pub threshold: usize,
    /// Federator keys in bridge order.
    pub pub_keys: Vec<FederatorKey>,
    /// The federation's own P2SH address.
    pub address: String,
    /// Block height at which the active federation was created.
    pub active_fed_block_height: u64,
    /// Height from which federations carry an emergency recovery branch.
    pub erp_activation_height: u64,
    /// Emergency recovery keys, in script order.
    pub erp_keys: Vec<FederatorKey>,
    /// Relative lock (blocks) before the emergency branch is spendable.
    pub erp_csv_value: u32,
}

impl FederationInfo {
    /// Check the invariants the redeem script depends on.
    pub fn validate(&self) -> FederationResult<()> {
        if self.size == 0 {
            return Err(FederationError::InvalidFederationConfig(
                "federation has no members".to_string(),
            ));
        }
        if self.threshold == 0 || self.threshold > self.size {
            return Err(FederationError::InvalidFederationConfig(format!(
                "threshold {} out of range for {} members",
                self.threshold, self.size
            )));
        }
        if self.pub_keys.len() != self.size {
            return Err(FederationError::InvalidFederationConfig(format!(
                "expected {} public keys, got {}",
                self.size,
                self.pub_keys.len()
            )));
        }
        if self.uses_erp_script() {
            if self.erp_keys.is_empty() {
                return Err(FederationError::InvalidFederationConfig(
                    "emergency branch active but no erp keys configured".to_string(),
                ));
            }
            if self.erp_csv_value == 0 {
                return Err(FederationError::InvalidFederationConfig(
                    "emergency branch requires a non-zero csv value".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Whether the active federation was created after the emergency fork.
    pub fn uses_erp_script(&self) -> bool {
        self.active_fed_block_height >= self.erp_activation_height
    }

    /// Signatures required on the emergency branch (simple majority).
    pub fn erp_threshold(&self) -> usize {
        self.erp_keys.len() / 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_1: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const KEY_2: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn info() -> FederationInfo {
        FederationInfo {
            size: 2,
            threshold: 2,
            pub_keys: vec![
                FederatorKey::btc_from_hex(KEY_1).unwrap(),
                FederatorKey::btc_from_hex(KEY_2).unwrap(),
            ],
            address: "2MwuwnWHKuPv74ExQ17YvwboZ5yMGwqUamA".to_string(),
            active_fed_block_height: 100,
            erp_activation_height: 1_000,
            erp_keys: Vec::new(),
            erp_csv_value: 0,
        }
    }

    #[test]
    fn test_valid_federation() {
        assert!(info().validate().is_ok());
        assert!(!info().uses_erp_script());
    }

    #[test]
    fn test_threshold_above_size() {
        let mut fed = info();
        fed.threshold = 3;
        assert!(matches!(fed.validate(), Err(FederationError::InvalidFederationConfig(_))));
    }

    #[test]
    fn test_key_count_mismatch() {
        let mut fed = info();
        fed.pub_keys.pop();
        assert!(matches!(fed.validate(), Err(FederationError::InvalidFederationConfig(_))));
    }

    #[test]
    fn test_erp_branch_requires_keys() {
        let mut fed = info();
        fed.erp_activation_height = 50;
        assert!(fed.uses_erp_script());
        assert!(matches!(fed.validate(), Err(FederationError::InvalidFederationConfig(_))));
    }

    #[test]
    fn test_malformed_key_material() {
        // 0x05 is not a public key prefix.
        let key = FederatorKey::btc(vec![0x05; 33]);
        assert!(matches!(key.to_public_key(), Err(FederationError::AddressEncodingFailure(_))));

        let full = FederatorKey::btc_from_hex(KEY_1).unwrap();
        let truncated = FederatorKey::btc(full.bytes[..32].to_vec());
        assert!(matches!(
            truncated.to_public_key(),
            Err(FederationError::AddressEncodingFailure(_))
        ));
    }

    #[test]
    fn test_erp_threshold_is_majority() {
        let mut fed = info();
        fed.erp_keys = vec![FederatorKey::btc_from_hex(KEY_1).unwrap(); 3];
        assert_eq!(fed.erp_threshold(), 2);
    }
}

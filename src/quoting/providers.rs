//! Liquidity providers and the startup-time registry.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};
use alloy::signers::Signature;

use crate::blockchain::types::BlockchainResult;
use crate::blockchain::wallet::Wallet;
use crate::config::ProviderConfig;
use crate::quoting::types::{Quote, QuoteHash};

/// A party that prices quotes and signs accepted ones.
pub trait LiquidityProvider: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// EVM address recorded in the provider's quotes.
    fn address(&self) -> Address;

    /// Fill in a quote from `template`, or decline with `None`.
    fn get_quote(&self, template: &Quote, gas_price: u128) -> Option<Quote>;

    /// Sign the raw quote hash.
    fn sign_hash(&self, hash: &QuoteHash) -> BlockchainResult<Signature>;
}

/// Pricing terms of a [`LocalProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTerms {
    pub btc_address: String,
    pub call_fee: U256,
    pub penalty_fee: U256,
    pub time_for_deposit: u64,
    pub call_time: u64,
    pub confirmations: u64,
    pub max_value: U256,
}

impl From<&ProviderConfig> for ProviderTerms {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            btc_address: config.btc_address.clone(),
            call_fee: config.call_fee_wei,
            penalty_fee: config.penalty_fee_wei,
            time_for_deposit: config.time_for_deposit_secs,
            call_time: config.call_time_secs,
            confirmations: config.confirmations,
            max_value: config.max_value_wei,
        }
    }
}

/// Provider backed by a key held in this process.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    name: String,
    wallet: Wallet,
    terms: ProviderTerms,
}

impl LocalProvider {
    pub fn new(name: impl Into<String>, wallet: Wallet, terms: ProviderTerms) -> Self {
        Self {
            name: name.into(),
            wallet,
            terms,
        }
    }

    /// Build from config, reading the key from the configured env var.
    pub fn from_config(config: &ProviderConfig, chain_id: u64) -> BlockchainResult<Self> {
        let wallet = Wallet::from_env(&config.private_key_env, chain_id)?;
        Ok(Self::new(config.name.clone(), wallet, ProviderTerms::from(config)))
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }
}

impl LiquidityProvider for LocalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Address {
        self.wallet.address()
    }

    fn get_quote(&self, template: &Quote, gas_price: u128) -> Option<Quote> {
        if template.value > self.terms.max_value {
            tracing::debug!(
                provider = %self.name,
                value = %template.value,
                max_value = %self.terms.max_value,
                "Declining quote above provider limit"
            );
            return None;
        }

        let gas_cost = U256::from(template.gas_limit).saturating_mul(U256::from(gas_price));
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Some(Quote {
            lp_rsk_addr: self.address().to_string(),
            lp_btc_addr: self.terms.btc_address.clone(),
            call_fee: self.terms.call_fee.saturating_add(gas_cost),
            penalty_fee: self.terms.penalty_fee,
            nonce: fastrand::u64(..i64::MAX as u64),
            agreement_timestamp: now,
            time_for_deposit: self.terms.time_for_deposit,
            call_time: self.terms.call_time,
            confirmations: self.terms.confirmations,
            ..template.clone()
        })
    }

    fn sign_hash(&self, hash: &QuoteHash) -> BlockchainResult<Signature> {
        self.wallet.sign_hash(&hash.0)
    }
}

/// Providers registered at startup; read-only afterwards.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LiquidityProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn LiquidityProvider>>) -> Self {
        Self { providers }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LiquidityProvider>> {
        self.providers.iter()
    }

    /// The provider whose EVM address is `address`, if registered.
    pub fn find_by_address(&self, address: &Address) -> Option<Arc<dyn LiquidityProvider>> {
        self.providers
            .iter()
            .find(|p| p.address() == *address)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| (p.name().to_string(), p.address())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil accounts #0 and #1; publicly known, never use for real funds.
    const KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn terms() -> ProviderTerms {
        ProviderTerms {
            btc_address: "midSACfDe3qAxJZZXA9gkwBZgPqJJUpy1w".to_string(),
            call_fee: U256::from(1_000u64),
            penalty_fee: U256::from(500u64),
            time_for_deposit: 3_600,
            call_time: 7_200,
            confirmations: 6,
            max_value: U256::from(10u64).pow(U256::from(18u64)),
        }
    }

    fn provider(key: &str) -> LocalProvider {
        LocalProvider::new("test", Wallet::from_private_key(key, 33).unwrap(), terms())
    }

    fn template() -> Quote {
        Quote {
            fed_btc_addr: "2MwuwnWHKuPv74ExQ17YvwboZ5yMGwqUamA".to_string(),
            gas_limit: 50_000,
            value: U256::from(5u64),
            ..Default::default()
        }
    }

    #[test]
    fn test_quote_fee_includes_gas_cost() {
        let quote = provider(KEY_0).get_quote(&template(), 60).unwrap();

        assert_eq!(quote.call_fee, U256::from(1_000u64 + 50_000 * 60));
        assert_eq!(quote.penalty_fee, U256::from(500u64));
        assert_eq!(quote.lp_rsk_addr, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(quote.lp_btc_addr, "midSACfDe3qAxJZZXA9gkwBZgPqJJUpy1w");
        assert_eq!(quote.fed_btc_addr, template().fed_btc_addr);
        assert_eq!(quote.confirmations, 6);
        assert!(quote.agreement_timestamp > 0);
    }

    #[test]
    fn test_declines_value_above_limit() {
        let mut request = template();
        request.value = U256::from(10u64).pow(U256::from(19u64));
        assert!(provider(KEY_0).get_quote(&request, 60).is_none());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(provider(KEY_0)) as Arc<dyn LiquidityProvider>,
            Arc::new(provider(KEY_1)) as Arc<dyn LiquidityProvider>,
        ]);
        let second = provider(KEY_1).address();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_by_address(&second).unwrap().address(), second);
        assert!(registry.find_by_address(&Address::ZERO).is_none());
    }

    #[test]
    fn test_signature_over_raw_hash() {
        let lp = provider(KEY_0);
        let hash = QuoteHash(alloy::primitives::B256::repeat_byte(9));
        let signature = lp.sign_hash(&hash).unwrap();
        assert_eq!(
            signature.recover_address_from_prehash(&hash.0).unwrap(),
            lp.address()
        );
    }
}

//! Resilient chain connector.
//!
//! # Responsibilities
//! - Retry every read with the shared policy and its acceptance predicate
//! - Add the new-account surcharge to gas estimates
//! - Assemble federation snapshots from individual bridge reads
//! - Hash quotes through the LBC; pass writes through exactly once
//!
//! # Retry predicates
//! A zero or empty answer is inconclusive and retried for gas estimates,
//! gas price, federation size and threshold, federator keys, the
//! federation address and quote hashes. A federation size above
//! [`MAX_FEDERATION_SIZE`] is treated the same way. The activation height
//! accepts any successful answer since genesis federations legitimately
//! report zero.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};

use crate::blockchain::node::ChainNode;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};
use crate::blockchain::wallet::Wallet;
use crate::codec::{decode_evm_address, encode_quote};
use crate::config::schema::FederationConfig;
use crate::config::RskConfig;
use crate::federation::{FederationInfo, FederatorKey, KeyKind};
use crate::observability::metrics;
use crate::quoting::types::{Quote, QuoteHash};
use crate::resilience::RetryPolicy;

/// Most keys `OP_CHECKMULTISIG` accepts.
pub const MAX_FEDERATION_SIZE: u64 = 20;

/// Emergency recovery parameters attached to every federation snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmergencyBranch {
    pub activation_height: u64,
    pub keys: Vec<FederatorKey>,
    pub csv_value: u32,
}

impl EmergencyBranch {
    pub fn from_config(config: &FederationConfig) -> BlockchainResult<Self> {
        let keys = config
            .erp_keys
            .iter()
            .map(|key| FederatorKey::btc_from_hex(key))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            activation_height: config.erp_activation_height,
            keys,
            csv_value: config.erp_csv_value,
        })
    }
}

/// Static connector settings.
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    pub chain_id: u64,
    pub lbc_address: Address,
    pub required_bridge_confirmations: u64,
    pub new_account_gas_cost: u64,
    pub retry: RetryPolicy,
    pub emergency: EmergencyBranch,
}

impl ConnectorSettings {
    pub fn from_config(config: &RskConfig, emergency: EmergencyBranch) -> BlockchainResult<Self> {
        Ok(Self {
            chain_id: config.chain_id,
            lbc_address: decode_evm_address(&config.lbc_address)?,
            required_bridge_confirmations: config.required_bridge_confirmations,
            new_account_gas_cost: config.new_account_gas_cost,
            retry: RetryPolicy {
                max_attempts: config.retry.max_attempts,
                backoff: Duration::from_millis(config.retry.backoff_ms),
                deadline: Duration::from_secs(config.rpc_timeout_secs),
            },
            emergency,
        })
    }
}

/// Retrying front for a [`ChainNode`].
#[derive(Debug)]
pub struct ChainConnector<N> {
    node: N,
    settings: ConnectorSettings,
}

impl<N: ChainNode> ChainConnector<N> {
    pub fn new(node: N, settings: ConnectorSettings) -> Self {
        Self { node, settings }
    }

    /// Check chain id and read the gas price once.
    ///
    /// Failures are logged; the connector stays usable.
    pub async fn verify_connection(&self) {
        match self.verify_chain_id().await {
            Ok(()) => tracing::info!(
                chain_id = self.settings.chain_id,
                lbc = %self.settings.lbc_address,
                "Chain connector initialized"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                "Chain connector initialized but chain verification failed"
            ),
        }
        match self.gas_price().await {
            Ok(price) => tracing::info!(gas_price = price, "Initial gas price read"),
            Err(e) => tracing::warn!(error = %e, "Initial gas price read failed"),
        }
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = ChainId(self.node.chain_id().await?);
        if chain_id.0 != self.settings.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.settings.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// True if the node answers a block-number read.
    pub async fn is_healthy(&self) -> bool {
        self.node.block_number().await.is_ok()
    }

    pub fn lbc_address(&self) -> Address {
        self.settings.lbc_address
    }

    pub fn required_bridge_confirmations(&self) -> u64 {
        self.settings.required_bridge_confirmations
    }

    async fn read<T, F, Fut, A>(&self, operation: &'static str, call: F, accept: A) -> BlockchainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BlockchainResult<T>>,
        A: Fn(&T) -> bool,
    {
        match self.settings.retry.run(operation, call, accept).await {
            Ok(value) => {
                metrics::record_chain_read(operation, true);
                Ok(value)
            }
            Err(exhausted) => {
                metrics::record_chain_read(operation, false);
                tracing::error!(
                    operation,
                    attempts = exhausted.attempts,
                    last_error = ?exhausted.last_error,
                    "Chain read exhausted retries"
                );
                Err(exhausted.into())
            }
        }
    }

    /// Gas for calling `to`, with the new-account surcharge when it applies.
    ///
    /// The account is inspected before the estimate so the surcharge reflects
    /// the destination as it was when the estimate was taken.
    pub async fn estimate_gas(&self, to: Address, value: U256, data: Bytes) -> BlockchainResult<u64> {
        let new_account = self.is_new_account(to).await;
        let estimate = self
            .read(
                "estimate_gas",
                || self.node.estimate_gas(to, value, data.clone()),
                |gas| *gas != 0,
            )
            .await?;

        if new_account {
            tracing::debug!(
                address = %to,
                surcharge = self.settings.new_account_gas_cost,
                "Destination looks new, adding surcharge"
            );
            return Ok(estimate.saturating_add(self.settings.new_account_gas_cost));
        }
        Ok(estimate)
    }

    /// Best effort: any failed read counts as a new account.
    async fn is_new_account(&self, address: Address) -> bool {
        let block = match self.node.block_number().await {
            Ok(block) => block,
            Err(e) => {
                tracing::debug!(error = %e, "Block number unavailable, assuming new account");
                return true;
            }
        };
        match self.node.account_state(address, block).await {
            Ok(state) => state.is_new(),
            Err(e) => {
                tracing::debug!(error = %e, block, "Account state unavailable, assuming new account");
                true
            }
        }
    }

    pub async fn gas_price(&self) -> BlockchainResult<u128> {
        self.read("gas_price", || self.node.gas_price(), |price| *price != 0)
            .await
    }

    pub async fn federation_address(&self) -> BlockchainResult<String> {
        self.read(
            "federation_address",
            || self.node.federation_address(),
            |address| !address.is_empty(),
        )
        .await
    }

    /// Read the full federation snapshot, emergency branch included.
    pub async fn federation_info(&self) -> BlockchainResult<FederationInfo> {
        let size = self
            .read(
                "federation_size",
                || self.node.federation_size(),
                |n| (1..=MAX_FEDERATION_SIZE).contains(n),
            )
            .await?;
        let threshold = self
            .read(
                "federation_threshold",
                || self.node.federation_threshold(),
                |n| *n != 0,
            )
            .await?;

        let mut pub_keys = Vec::with_capacity(size as usize);
        for index in 0..size {
            let key = self
                .read(
                    "federator_public_key",
                    || self.node.federator_public_key(index, KeyKind::Btc),
                    |bytes| !bytes.is_empty(),
                )
                .await?;
            pub_keys.push(FederatorKey::btc(key.to_vec()));
        }

        let address = self.federation_address().await?;
        let active_fed_block_height = self
            .read(
                "active_federation_creation_height",
                || self.node.active_federation_creation_height(),
                |_| true,
            )
            .await?;

        let emergency = &self.settings.emergency;
        Ok(FederationInfo {
            size: size as usize,
            threshold: threshold as usize,
            pub_keys,
            address,
            active_fed_block_height,
            erp_activation_height: emergency.activation_height,
            erp_keys: emergency.keys.clone(),
            erp_csv_value: emergency.csv_value,
        })
    }

    /// Encode `quote` and hash it through the LBC.
    pub async fn hash_quote(&self, quote: &Quote) -> BlockchainResult<QuoteHash> {
        let raw = encode_quote(quote)?;
        let hash = self
            .read(
                "hash_quote",
                || self.node.hash_quote(raw.clone()),
                |hash| *hash != B256::ZERO,
            )
            .await?;
        Ok(QuoteHash(hash))
    }

    /// Submit `callForUser`; never retried.
    pub async fn call_for_user(&self, wallet: &Wallet, quote: &Quote) -> BlockchainResult<TxHash> {
        let raw = encode_quote(quote)?;
        let tx_hash = self.node.call_for_user(wallet, raw).await?;
        tracing::info!(tx_hash = %tx_hash, provider = %wallet.address(), "callForUser submitted");
        Ok(tx_hash)
    }

    /// Submit `registerPegIn`; never retried.
    pub async fn register_peg_in(
        &self,
        wallet: &Wallet,
        quote: &Quote,
        signature: Bytes,
        btc_raw_tx: Bytes,
        partial_merkle_tree: Bytes,
        height: u64,
    ) -> BlockchainResult<TxHash> {
        let raw = encode_quote(quote)?;
        let tx_hash = self
            .node
            .register_peg_in(wallet, raw, signature, btc_raw_tx, partial_merkle_tree, height)
            .await?;
        tracing::info!(tx_hash = %tx_hash, height, "registerPegIn submitted");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::contracts::OnChainQuote;
    use crate::blockchain::types::AccountState;
    use crate::codec::local_quote_hash;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Node whose answers are scripted per test.
    #[derive(Default)]
    struct ScriptedNode {
        estimates: Mutex<Vec<BlockchainResult<u64>>>,
        gas_prices: Mutex<Vec<BlockchainResult<u128>>>,
        account: Option<AccountState>,
        block_fails: bool,
        sizes: Mutex<Vec<BlockchainResult<u64>>>,
        estimate_calls: AtomicU32,
        gas_price_calls: AtomicU32,
        key_calls: AtomicU32,
        write_calls: AtomicU32,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedNode {
        fn log(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn pop<T: Clone>(queue: &Mutex<Vec<BlockchainResult<T>>>, fallback: T) -> BlockchainResult<T> {
        let mut queue = queue.lock().unwrap();
        if queue.is_empty() {
            Ok(fallback)
        } else {
            queue.remove(0)
        }
    }

    impl ChainNode for ScriptedNode {
        async fn chain_id(&self) -> BlockchainResult<u64> {
            Ok(33)
        }

        async fn block_number(&self) -> BlockchainResult<u64> {
            self.log("block_number");
            if self.block_fails {
                Err(BlockchainError::Rpc("block".to_string()))
            } else {
                Ok(100)
            }
        }

        async fn gas_price(&self) -> BlockchainResult<u128> {
            self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.gas_prices, 60_000_000)
        }

        async fn estimate_gas(&self, _: Address, _: U256, _: Bytes) -> BlockchainResult<u64> {
            self.estimate_calls.fetch_add(1, Ordering::SeqCst);
            self.log("estimate_gas");
            pop(&self.estimates, 21_000)
        }

        async fn account_state(&self, _: Address, _: u64) -> BlockchainResult<AccountState> {
            self.log("account_state");
            self.account
                .ok_or_else(|| BlockchainError::Rpc("account".to_string()))
        }

        async fn federation_size(&self) -> BlockchainResult<u64> {
            pop(&self.sizes, 2)
        }

        async fn federation_threshold(&self) -> BlockchainResult<u64> {
            Ok(2)
        }

        async fn federator_public_key(&self, index: u64, _: KeyKind) -> BlockchainResult<Bytes> {
            self.key_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(vec![index as u8 + 2; 33]))
        }

        async fn federation_address(&self) -> BlockchainResult<String> {
            Ok("2MwuwnWHKuPv74ExQ17YvwboZ5yMGwqUamA".to_string())
        }

        async fn active_federation_creation_height(&self) -> BlockchainResult<u64> {
            Ok(0)
        }

        async fn hash_quote(&self, quote: OnChainQuote) -> BlockchainResult<B256> {
            Ok(local_quote_hash(&quote))
        }

        async fn call_for_user(&self, _: &Wallet, _: OnChainQuote) -> BlockchainResult<TxHash> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            Err(BlockchainError::Rpc("reverted".to_string()))
        }

        async fn register_peg_in(
            &self,
            _: &Wallet,
            _: OnChainQuote,
            _: Bytes,
            _: Bytes,
            _: Bytes,
            _: u64,
        ) -> BlockchainResult<TxHash> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            Ok(TxHash::repeat_byte(0x01))
        }
    }

    fn settings() -> ConnectorSettings {
        ConnectorSettings {
            chain_id: 33,
            lbc_address: Address::repeat_byte(0x5f),
            required_bridge_confirmations: 100,
            new_account_gas_cost: 25_000,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_secs(2),
                deadline: Duration::from_secs(30),
            },
            emergency: EmergencyBranch::default(),
        }
    }

    fn existing_account() -> AccountState {
        AccountState {
            code_len: 100,
            balance_is_zero: false,
            nonce: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_gas_estimate_for_existing_account() {
        let node = ScriptedNode {
            account: Some(existing_account()),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        let gas = connector
            .estimate_gas(Address::repeat_byte(1), U256::ZERO, Bytes::new())
            .await
            .unwrap();
        assert_eq!(gas, 21_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gas_estimate_for_new_account() {
        let node = ScriptedNode {
            account: Some(AccountState {
                code_len: 0,
                balance_is_zero: true,
                nonce: 0,
            }),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        let gas = connector
            .estimate_gas(Address::repeat_byte(1), U256::ZERO, Bytes::new())
            .await
            .unwrap();
        assert_eq!(gas, 46_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_is_inspected_before_estimate() {
        let node = ScriptedNode {
            account: Some(existing_account()),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        connector
            .estimate_gas(Address::repeat_byte(1), U256::ZERO, Bytes::new())
            .await
            .unwrap();
        assert_eq!(
            *connector.node.calls.lock().unwrap(),
            vec!["block_number", "account_state", "estimate_gas"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_account_is_assumed_new() {
        let node = ScriptedNode {
            account: Some(existing_account()),
            block_fails: true,
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        let gas = connector
            .estimate_gas(Address::repeat_byte(1), U256::ZERO, Bytes::new())
            .await
            .unwrap();
        assert_eq!(gas, 46_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_estimate_exhausts_retries() {
        let node = ScriptedNode {
            estimates: Mutex::new(vec![Ok(0), Ok(0), Ok(0)]),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        let err = connector
            .estimate_gas(Address::repeat_byte(1), U256::ZERO, Bytes::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BlockchainError::ChainReadFailure { operation: "estimate_gas", attempts: 3, .. }
        ));
        assert_eq!(connector.node.estimate_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gas_price_succeeds_on_third_attempt() {
        let node = ScriptedNode {
            gas_prices: Mutex::new(vec![
                Err(BlockchainError::Timeout(30)),
                Ok(0),
                Ok(59_000_000),
            ]),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        assert_eq!(connector.gas_price().await.unwrap(), 59_000_000);
        assert_eq!(connector.node.gas_price_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_federation_info_snapshot() {
        let mut settings = settings();
        settings.emergency = EmergencyBranch {
            activation_height: 10,
            keys: vec![FederatorKey::btc(vec![0x03; 33])],
            csv_value: 500,
        };
        let node = ScriptedNode {
            sizes: Mutex::new(vec![Ok(0), Ok(2)]),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings);
        let info = connector.federation_info().await.unwrap();

        assert_eq!(info.size, 2);
        assert_eq!(info.threshold, 2);
        assert_eq!(info.pub_keys.len(), 2);
        assert_eq!(info.pub_keys[1].bytes, vec![0x03; 33]);
        assert_eq!(info.active_fed_block_height, 0);
        assert_eq!(info.erp_activation_height, 10);
        assert_eq!(info.erp_csv_value, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_implausible_federation_size_is_rejected() {
        let node = ScriptedNode {
            sizes: Mutex::new(vec![Ok(u64::MAX), Ok(MAX_FEDERATION_SIZE + 1), Ok(u64::MAX)]),
            ..Default::default()
        };
        let connector = ChainConnector::new(node, settings());
        let err = connector.federation_info().await.unwrap_err();

        assert!(matches!(
            err,
            BlockchainError::ChainReadFailure { operation: "federation_size", attempts: 3, .. }
        ));
        assert_eq!(connector.node.key_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_writes_are_not_retried() {
        let connector = ChainConnector::new(ScriptedNode::default(), settings());
        let wallet = Wallet::from_private_key(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            33,
        )
        .unwrap();
        let quote = Quote {
            fed_btc_addr: "2MwuwnWHKuPv74ExQ17YvwboZ5yMGwqUamA".to_string(),
            lbc_addr: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            lp_rsk_addr: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            btc_refund_addr: "mh5CE8Nbj38iND267s4XnvhSmhDW7yWc6Q".to_string(),
            rsk_refund_addr: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            lp_btc_addr: "midSACfDe3qAxJZZXA9gkwBZgPqJJUpy1w".to_string(),
            contract_addr: "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC".to_string(),
            ..Default::default()
        };

        assert!(connector.call_for_user(&wallet, &quote).await.is_err());
        assert_eq!(connector.node.write_calls.load(Ordering::SeqCst), 1);

        let mut bad = quote.clone();
        bad.btc_refund_addr = "garbage".to_string();
        assert!(matches!(
            connector.call_for_user(&wallet, &bad).await,
            Err(BlockchainError::Codec(_))
        ));
        assert_eq!(connector.node.write_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chain_id_mismatch() {
        let mut settings = settings();
        settings.chain_id = 31;
        let connector = ChainConnector::new(ScriptedNode::default(), settings);
        assert!(matches!(
            connector.verify_chain_id().await,
            Err(BlockchainError::ChainMismatch { expected: 31, actual: 33 })
        ));
        assert!(connector.is_healthy().await);
    }

    #[test]
    fn test_emergency_branch_from_config() {
        let config = FederationConfig {
            erp_activation_height: 10,
            erp_keys: vec![
                "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798".to_string(),
            ],
            erp_csv_value: 500,
        };
        let branch = EmergencyBranch::from_config(&config).unwrap();
        assert_eq!(branch.activation_height, 10);
        assert_eq!(branch.keys.len(), 1);
        assert_eq!(branch.keys[0].kind, KeyKind::Btc);
        assert_eq!(branch.csv_value, 500);

        let bad = FederationConfig {
            erp_keys: vec!["zz".to_string()],
            ..config
        };
        assert!(matches!(
            EmergencyBranch::from_config(&bad),
            Err(BlockchainError::Codec(_))
        ));
    }
}
